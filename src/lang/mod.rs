//! # Cinder language model
//!
//! Types shared by every phase of the pipeline:
//!
//! - [`ast`] is the syntax tree built by the parser, validated by the
//!   checker, rewritten by the optimizer and consumed by the code generator.
//! - [`value`] holds the runtime values manipulated by the VM (and embedded in
//!   `PUSH` instructions).
//! - [`span`] is the source position attached to tree nodes.
//! - [`printer`] writes a tree back out as source text.

pub mod ast;
pub mod printer;
pub mod span;
pub mod value;
