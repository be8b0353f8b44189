use serde::{Deserialize, Serialize};

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::{Instr, Op};

/// The compiled body of one function.
///
/// Instructions are appended and backpatched while the code generator owns
/// the template; once registered with the VM it is shared and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTemplate {
    pub name: String,
    pub instrs: Vec<Instr>,
}

impl FrameTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrs: Vec::new(),
        }
    }

    /// Appends an instruction and returns its index.
    pub fn push(&mut self, instr: impl Into<Instr>) -> usize {
        self.instrs.push(instr.into());
        self.instrs.len() - 1
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn last_op(&self) -> Option<&Op> {
        self.instrs.last().map(|i| &i.op)
    }

    /// Rewrites the target of the jump at `index`.
    pub fn patch(&mut self, index: usize, target: usize) -> Result<(), CompileError> {
        let target = i32::try_from(target)
            .map_err(|_| CompileError::internal("jump target does not fit in i32"))?;
        match self.instrs.get_mut(index).map(|i| &mut i.op) {
            Some(Op::Jmp(t)) | Some(Op::Jmpf(t)) => {
                *t = target;
                Ok(())
            }
            Some(other) => Err(CompileError::internal(format!(
                "cannot patch non-jump instruction {} at {} in '{}'",
                other.mnemonic(),
                index,
                self.name
            ))),
            None => Err(CompileError::internal(format!(
                "patch index {} out of range in '{}'",
                index, self.name
            ))),
        }
    }

    /// Sorted, deduplicated targets of every jump in the template.
    pub fn jump_targets(&self) -> Vec<i32> {
        let mut targets: Vec<i32> = self
            .instrs
            .iter()
            .filter_map(|i| i.op.jump_target())
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }
}
