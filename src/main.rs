use std::{fs, path::Path, path::PathBuf, process};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cinder::{
    CompileOptions, Error, analyze_source,
    bytecode::disasm::{print_templates, templates_to_json},
    compile_source,
    frontend::{lexer::Lexer, token_dumper::TokenDumper},
    runtime::{Vm, VmConfig},
};

#[derive(Parser)]
#[command(
    name = "cinder",
    about = "Compile and run Cinder programs on the bytecode VM",
    version
)]
struct Cli {
    /// Source file to run (.cdr)
    file: PathBuf,

    /// Dump the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Disable colors in the token dump
    #[arg(long)]
    no_color: bool,

    /// Show token text instead of token kinds in the dump
    #[arg(long)]
    pretty: bool,

    /// Print the checked (and optimized) program as source and exit
    #[arg(long)]
    ast: bool,

    /// Print the bytecode before running
    #[arg(long = "bc", alias = "bytecode")]
    bytecode: bool,

    /// Print the bytecode as JSON and exit
    #[arg(long)]
    json: bool,

    /// Skip constant folding and strength reduction
    #[arg(long)]
    no_opt: bool,

    /// Trace every executed instruction
    #[arg(long)]
    debug: bool,

    /// Abort after this many executed instructions
    #[arg(long)]
    max_steps: Option<usize>,

    /// Maximum nesting of function calls
    #[arg(long)]
    max_call_depth: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG controls library logging; warnings only by default.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    ensure_extension(&cli.file);

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", cli.file.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&cli, &source) {
        eprintln!("{}: {}", e.phase(), e);
        process::exit(1);
    }
}

fn ensure_extension(path: &Path) {
    if path.extension().and_then(|e| e.to_str()) != Some("cdr") {
        eprintln!("Error: expected a .cdr file, got {}", path.display());
        process::exit(1);
    }
}

fn run(cli: &Cli, source: &str) -> Result<(), Error> {
    if cli.tokens {
        return dump_tokens(source, cli.no_color, cli.pretty);
    }

    let options = CompileOptions {
        optimize: !cli.no_opt,
    };

    if cli.ast {
        let program = analyze_source(source, &options)?;
        print!("{}", program);
        return Ok(());
    }

    let templates = compile_source(source, &options)?;

    if cli.json {
        match templates_to_json(&templates) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize bytecode: {}", e);
                process::exit(1);
            }
        }
        return Ok(());
    }

    if cli.bytecode {
        print_templates(&templates);
    }

    let defaults = VmConfig::default();
    let config = VmConfig {
        max_call_depth: cli.max_call_depth.unwrap_or(defaults.max_call_depth),
        max_steps: cli.max_steps.or(defaults.max_steps),
        ..defaults
    };

    let mut vm = Vm::with_config(config);
    vm.set_debug(cli.debug);
    for template in templates {
        vm.register(template)?;
    }
    vm.run()?;
    Ok(())
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) -> Result<(), Error> {
    let tokens = Lexer::new(source).tokenize()?;

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }

    dumper.dump(&tokens);
    Ok(())
}
