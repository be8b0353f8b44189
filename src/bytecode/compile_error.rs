use crate::lang::span::Span;

/// Code generation failures.
///
/// A tree that passed the checker never produces one of these; they mark
/// defects in an earlier phase or a hand-built tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// `new S(...)` or a field access on a struct that was never defined.
    #[error("compile error: unknown struct '{name}'")]
    UnknownStruct { name: String, span: Span },

    /// A variable that is not bound in any enclosing scope.
    #[error("compile error: undeclared variable '{name}'")]
    UndeclaredVariable { name: String, span: Span },

    /// A built-in called with the wrong number of arguments.
    #[error("compile error: built-in '{name}' expects {expected} argument(s), found {found}")]
    BuiltinArity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// Internal compiler error (shouldn't happen in normal use)
    #[error("compile error: internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn unknown_struct(name: &str, span: Span) -> Self {
        CompileError::UnknownStruct {
            name: name.to_string(),
            span,
        }
    }

    pub fn undeclared(name: &str, span: Span) -> Self {
        CompileError::UndeclaredVariable {
            name: name.to_string(),
            span,
        }
    }

    pub fn builtin_arity(name: &str, expected: usize, found: usize, span: Span) -> Self {
        CompileError::BuiltinArity {
            name: name.to_string(),
            expected,
            found,
            span,
        }
    }

    /// Create an internal compiler error
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::UnknownStruct { span, .. }
            | CompileError::UndeclaredVariable { span, .. }
            | CompileError::BuiltinArity { span, .. } => Some(*span),
            CompileError::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_struct_display() {
        let err = CompileError::unknown_struct("Node", Span::new(3, 9));
        assert_eq!(err.to_string(), "compile error: unknown struct 'Node'");
        assert_eq!(err.span(), Some(Span::new(3, 9)));
    }

    #[test]
    fn test_builtin_arity_display() {
        let err = CompileError::builtin_arity("get", 2, 1, Span::new(1, 1));
        let msg = err.to_string();
        assert!(msg.contains("get"));
        assert!(msg.contains("expects 2"));
        assert!(msg.contains("found 1"));
    }

    #[test]
    fn test_internal_error_display() {
        let err = CompileError::internal("something went wrong");

        let msg = err.to_string();
        assert!(msg.contains("internal"));
        assert!(msg.contains("something went wrong"));
        assert_eq!(err.span(), None);
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = CompileError::internal("test");
        let _: &dyn std::error::Error = &err;
    }
}
