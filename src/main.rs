/// CLI entry point: parses arguments, reads the source file, and drives
/// either the simulator or the compiler. The actual work runs on a
/// dedicated worker thread with a larger stack, wrapped in
/// `catch_unwind`, so a panic anywhere downstream is reported as a
/// diagnostic line instead of an opaque backtrace.
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::{miette, IntoDiagnostic};

use staq::codegen;
use staq::config::StaqConfig;
use staq::crossref::crossreference;
use staq::diagnostics::DiagnosticEngine;
use staq::errors::StaqError;
use staq::lexer::lex_source;
use staq::sim;
use staq::toolchain;

/// Worker-thread stack size. This language has no user-level recursion
/// (only iterative `while`), so there's no deep-call-chain risk the way
/// a recursive-descent interpreter would have; this only needs enough
/// headroom for the crossreferencer/codegen's own bookkeeping.
const STACK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "staq",
    about = "Lexer, crossreferencer, simulator and x86-64 codegen for a tiny stack language",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print usage information.
    Help,
    /// Simulate a source file directly.
    #[command(name = "s")]
    Simulate { path: PathBuf },
    /// Compile a source file to a native executable.
    #[command(name = "c")]
    Compile { path: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    // Spawning the worker thread is the one failure mode that isn't a
    // source-level diagnostic (it means the OS refused us a thread at
    // all) -- reported through miette's richer renderer instead of the
    // spec's flat per-line format, which only covers source diagnostics.
    let handle = match std::thread::Builder::new()
        .name("staq-worker".into())
        .stack_size(STACK_SIZE)
        .spawn(move || run(cli))
        .into_diagnostic()
        .map_err(|e| e.wrap_err(miette!("could not start worker thread")))
    {
        Ok(handle) => handle,
        Err(report) => {
            eprintln!("{:?}", report);
            return ExitCode::FAILURE;
        }
    };

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handle.join())) {
        Ok(Ok(Ok(()))) => ExitCode::SUCCESS,
        Ok(Ok(Err(diagnostic_line))) => {
            eprintln!("{}", diagnostic_line);
            ExitCode::FAILURE
        }
        Ok(Err(panic_payload)) => {
            let message = panic_payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker thread panicked".to_string());
            eprintln!("ERROR: internal error: {}", message);
            ExitCode::FAILURE
        }
        Err(_) => {
            eprintln!("ERROR: worker thread panicked");
            ExitCode::FAILURE
        }
    }
}

/// Runs the requested subcommand. Returns `Ok(())` on success, or an
/// already-formatted diagnostic line (the spec's one-line wire format) on
/// the first fatal error — `main` only needs to print it.
fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Help => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
        Command::Simulate { path } => run_simulate(&path).map_err(|line| line),
        Command::Compile { path } => run_compile(&path).map_err(|line| line),
    }
}

fn read_source(path: &PathBuf, engine: &DiagnosticEngine) -> Result<String, String> {
    fs::read_to_string(path).map_err(|source| {
        engine.format(&StaqError::Io {
            path: path.display().to_string(),
            source,
        })
    })
}

fn run_simulate(path: &PathBuf) -> Result<(), String> {
    let file_name = path.display().to_string();
    let engine = DiagnosticEngine::new(file_name);
    let source = read_source(path, &engine)?;

    let ops = lex_source(&source).map_err(|errors| {
        errors
            .iter()
            .map(|e| engine.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    })?;

    let program = crossreference(ops).map_err(|e| engine.format(&e))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    sim::run(&program, &mut out).map_err(|e| engine.format(&e))
}

fn run_compile(path: &PathBuf) -> Result<(), String> {
    let file_name = path.display().to_string();
    let engine = DiagnosticEngine::new(file_name);
    let source = read_source(path, &engine)?;

    let ops = lex_source(&source).map_err(|errors| {
        errors
            .iter()
            .map(|e| engine.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    })?;

    let program = crossreference(ops).map_err(|e| engine.format(&e))?;
    let asm = codegen::generate(&program).map_err(|e| engine.format(&e))?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let config = match dir {
        Some(dir) => StaqConfig::load(dir).map_err(|e| engine.format(&e))?,
        None => StaqConfig::load(std::path::Path::new(".")).map_err(|e| engine.format(&e))?,
    };

    fs::write(&config.asm_path, asm).map_err(|source| {
        engine.format(&StaqError::IoWrite {
            path: config.asm_path.clone(),
            source,
        })
    })?;

    toolchain::assemble_and_link(&config.asm_path, &config).map_err(|e| engine.format(&e))
}
