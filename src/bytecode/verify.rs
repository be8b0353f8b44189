use crate::bytecode::ir::FrameTemplate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerifyError {
    #[error("verify error: unpatched jump at {frame}:{index}")]
    Unpatched { frame: String, index: usize },

    #[error("verify error: jump at {frame}:{index} targets {target}, outside 0..={len}")]
    OutOfRange {
        frame: String,
        index: usize,
        target: i32,
        len: usize,
    },
}

/// Checks that every jump was backpatched and lands inside the template.
///
/// A target equal to the length is allowed: it ends the frame.
pub fn verify_template(template: &FrameTemplate) -> Result<(), VerifyError> {
    let len = template.len();

    for (index, instr) in template.instrs.iter().enumerate() {
        let Some(target) = instr.op.jump_target() else {
            continue;
        };
        if target < 0 {
            return Err(VerifyError::Unpatched {
                frame: template.name.clone(),
                index,
            });
        }
        if target as usize > len {
            return Err(VerifyError::OutOfRange {
                frame: template.name.clone(),
                index,
                target,
                len,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::{Op, UNPATCHED};
    use crate::lang::value::Value;

    fn template(ops: Vec<Op>) -> FrameTemplate {
        let mut t = FrameTemplate::new("f");
        for op in ops {
            t.push(op);
        }
        t
    }

    #[test]
    fn test_straight_line_is_ok() {
        let t = template(vec![Op::Push(Value::Int(1)), Op::Pop, Op::Ret]);
        assert!(verify_template(&t).is_ok());
    }

    #[test]
    fn test_jump_to_end_is_ok() {
        let t = template(vec![Op::Push(Value::Bool(true)), Op::Jmpf(3), Op::Nop]);
        assert!(verify_template(&t).is_ok());
    }

    #[test]
    fn test_unpatched_jump() {
        let t = template(vec![Op::Jmp(UNPATCHED), Op::Ret]);
        assert_eq!(
            verify_template(&t),
            Err(VerifyError::Unpatched {
                frame: "f".to_string(),
                index: 0
            })
        );
    }

    #[test]
    fn test_out_of_range_jump() {
        let t = template(vec![Op::Nop, Op::Jmp(7)]);
        let err = verify_template(&t).unwrap_err();
        assert!(err.to_string().contains("targets 7"));
    }
}
