use crate::{
    bytecode::{CompileError, VerifyError},
    frontend::{checker::StaticError, lexer::LexerError, parser::ParserError},
    lang::span::Span,
    runtime::RuntimeError,
};

/// The pipeline stage an [`Error`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexical,
    Syntax,
    Static,
    Runtime,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Lexical => write!(f, "Lexer error"),
            Phase::Syntax => write!(f, "Parse error"),
            Phase::Static => write!(f, "Static error"),
            Phase::Runtime => write!(f, "Runtime error"),
        }
    }
}

/// Any failure from source text to the end of a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Static(#[from] StaticError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// Code generation and verification failures are reported as static
    /// errors: they happen before anything runs.
    pub fn phase(&self) -> Phase {
        match self {
            Error::Lexer(_) => Phase::Lexical,
            Error::Parser(_) => Phase::Syntax,
            Error::Static(_) | Error::Compile(_) | Error::Verify(_) => Phase::Static,
            Error::Runtime(_) => Phase::Runtime,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lexer(e) => Some(e.span()),
            Error::Parser(e) => Some(e.span()),
            Error::Static(e) => e.span,
            Error::Compile(e) => e.span(),
            Error::Verify(_) | Error::Runtime(_) => None,
        }
    }
}
