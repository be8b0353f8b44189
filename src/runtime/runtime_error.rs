use crate::lang::value::Oid;

/// What went wrong while executing an instruction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("null value error: {op} cannot take null")]
    NullValue { op: &'static str },

    #[error("type error: {op} expects {expected}, found {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("division by zero error")]
    DivisionByZero,

    #[error("{op}: index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        op: &'static str,
        index: i32,
        len: usize,
    },

    #[error("invalid {heap} object id {oid}")]
    InvalidObject { heap: &'static str, oid: Oid },

    #[error("field '{0}' does not exist")]
    MissingField(String),

    #[error("not a valid array size: {0}")]
    NegativeArraySize(i32),

    #[error("array of length {len} exceeds the limit of {max}")]
    ArrayTooLarge { len: usize, max: usize },

    #[error("out of memory allocating an array of length {0}")]
    OutOfMemory(usize),

    #[error("cannot convert {value:?} to {target}")]
    BadConversion { value: String, target: &'static str },

    #[error("load of uninitialized slot {0}")]
    UninitializedSlot(usize),

    #[error("invalid jump target {0}")]
    BadJump(i32),

    #[error("no 'main' function")]
    NoMain,

    #[error("call to undefined function '{0}'")]
    UnresolvedCall(String),

    #[error("no active call frame")]
    NoActiveFrame,

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("call depth limit exceeded ({0}) - possible infinite recursion")]
    CallDepthExceeded(usize),

    #[error("stack size limit exceeded ({0})")]
    StackOverflow(usize),

    #[error("execution step limit exceeded ({0})")]
    StepLimitExceeded(usize),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RuntimeErrorKind {
    fn from(err: std::io::Error) -> Self {
        RuntimeErrorKind::Io(err.to_string())
    }
}

/// A runtime failure together with the instruction that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Name of the executing frame, if any frame was running.
    pub frame: Option<String>,
    /// Index of the faulting instruction.
    pub pc: Option<usize>,
    /// Decoded text of the faulting instruction.
    pub instr: Option<String>,
}

impl RuntimeError {
    /// An error raised outside any frame, e.g. a missing `main`.
    pub fn new(kind: RuntimeErrorKind) -> Self {
        RuntimeError {
            kind,
            frame: None,
            pc: None,
            instr: None,
        }
    }

    pub fn at(kind: RuntimeErrorKind, frame: &str, pc: usize, instr: impl ToString) -> Self {
        RuntimeError {
            kind,
            frame: Some(frame.to_string()),
            pc: Some(pc),
            instr: Some(instr.to_string()),
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(frame) = &self.frame {
            write!(f, " in {}", frame)?;
        }
        if let Some(pc) = self.pc {
            write!(f, " at {}", pc)?;
        }
        if let Some(instr) = &self.instr {
            write!(f, ": {}", instr)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_location() {
        let err = RuntimeError::at(
            RuntimeErrorKind::IndexOutOfBounds {
                op: "GETI",
                index: 5,
                len: 3,
            },
            "main",
            7,
            "GETI",
        );
        assert_eq!(
            err.to_string(),
            "GETI: index 5 out of bounds for length 3 in main at 7: GETI"
        );
    }

    #[test]
    fn test_display_without_location() {
        let err = RuntimeError::new(RuntimeErrorKind::NoMain);
        assert_eq!(err.to_string(), "no 'main' function");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let kind = RuntimeErrorKind::from(io);
        assert_eq!(kind.to_string(), "i/o error: pipe closed");
    }
}
