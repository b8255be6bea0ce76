use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stackvm_types::{builtins, namespace, Callable, Value};
use stackvm_vm::{disassemble, UnitFile, VM};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// stackvm - stack-based bytecode interpreter
#[derive(Parser)]
#[command(name = "stackvm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and inspect compiled stack-machine units")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a compiled unit and print its result
    Run {
        /// Path to the unit (JSON)
        file: PathBuf,
        /// Log every executed instruction to stderr
        #[arg(long)]
        trace: bool,
        /// Start with empty globals instead of the standard natives
        #[arg(long)]
        no_builtins: bool,
        /// Show disassembled bytecode before running
        #[arg(long)]
        debug_bytecode: bool,
    },
    /// Disassemble a compiled unit and its functions
    Disassemble {
        /// Path to the unit (JSON)
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            trace,
            no_builtins,
            debug_bytecode,
        } => {
            init_tracing(trace);
            run_file(&file, !no_builtins, debug_bytecode)
        }
        Commands::Disassemble { file } => {
            init_tracing(false);
            disassemble_command(&file)
        }
    }
}

/// `RUST_LOG` wins over `--trace`
fn init_tracing(trace: bool) {
    let default = if trace { "warn,stackvm_vm=trace" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_unit(path: &Path) -> Result<UnitFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Error reading file '{}'", path.display()))?;
    UnitFile::from_json(&contents)
        .with_context(|| format!("Invalid unit file '{}'", path.display()))
}

fn run_file(path: &Path, with_builtins: bool, debug_bytecode: bool) -> Result<()> {
    let unit_file = read_unit(path)?;

    let globals = namespace();
    let code = unit_file.load(&globals);
    if with_builtins {
        builtins::install(&globals);
    }
    debug!(unit = %code.name, globals = globals.read().len(), "loaded");

    if debug_bytecode {
        eprint!("{}", disassemble(&code));
    }

    let result = VM::new()
        .execute(code, globals)
        .with_context(|| format!("Runtime error in '{}'", path.display()))?;

    if !matches!(result, Value::None) {
        println!("{}", result.repr());
    }
    Ok(())
}

fn disassemble_command(path: &Path) -> Result<()> {
    let unit_file = read_unit(path)?;

    let globals = namespace();
    let code = unit_file.load(&globals);

    println!("Disassembly of '{}':", path.display());
    println!();
    print!("{}", disassemble(&code));

    let globals = globals.read();
    let mut functions: Vec<_> = globals
        .iter()
        .filter_map(|(name, value)| match value {
            Value::Callable(Callable::Interpreted(function)) => Some((name, function)),
            _ => None,
        })
        .collect();
    functions.sort_by(|a, b| a.0.cmp(b.0));

    for (_, function) in functions {
        println!();
        print!("{}", disassemble(&function.code));
    }
    Ok(())
}
