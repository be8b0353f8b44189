//! Source text to checked syntax tree: tokens, parsing and static checks.

pub mod checker;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod token_dumper;
