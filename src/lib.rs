//! # Cinder
//!
//! A small statically typed language with structs and arrays, compiled to a
//! stack bytecode and run on a purpose-built VM.
//!
//! The pipeline is:
//!
//! 1. [`frontend::lexer`] turns source text into tokens.
//! 2. [`frontend::parser`] builds the [`lang::ast`] tree.
//! 3. [`frontend::checker`] rejects ill-typed programs.
//! 4. [`optimize`] folds constants and reduces strength.
//! 5. [`bytecode::compile`] emits one [`bytecode::FrameTemplate`] per function.
//! 6. [`runtime::vm`] executes the templates.
//!
//! [`compile_source`] and [`run_source`] drive the whole pipeline.

pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod optimize;
pub mod runtime;

use std::io::{BufRead, Write};

pub use error::{Error, Phase};

use crate::{
    bytecode::{CodeGenerator, FrameTemplate},
    frontend::{checker::check, lexer::Lexer, parser::parse},
    lang::ast::Program,
    optimize::optimize_program,
    runtime::Vm,
};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Run constant folding and strength reduction before code generation.
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { optimize: true }
    }
}

/// Lex, parse, check and (optionally) optimize.
pub fn analyze_source(source: &str, options: &CompileOptions) -> Result<Program, Error> {
    let tokens = Lexer::new(source).tokenize()?;
    let program = parse(tokens)?;
    check(&program)?;

    if options.optimize {
        Ok(optimize_program(program))
    } else {
        Ok(program)
    }
}

pub fn compile_source(
    source: &str,
    options: &CompileOptions,
) -> Result<Vec<FrameTemplate>, Error> {
    let program = analyze_source(source, options)?;
    Ok(CodeGenerator::new().compile(&program)?)
}

/// Compile `source`, register every template on `vm` and run `main`.
pub fn run_source<R: BufRead, W: Write>(
    source: &str,
    options: &CompileOptions,
    vm: &mut Vm<R, W>,
) -> Result<(), Error> {
    for template in compile_source(source, options)? {
        vm.register(template)?;
    }
    vm.run()?;
    Ok(())
}
