//! BOOSE CLI

use boose::config::Config;
use boose::error::{BooseError, report_error, report_line_error};
use boose::interp::{BlockMap, Interpreter, Scope, evaluate};
use boose::repl::Repl;
use boose::RecordingCanvas;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boose", version, about = "BOOSE drawing language interpreter")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). BOOSE_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ./boose.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a BOOSE program and print what it drew
    Run {
        /// Program file
        file: PathBuf,
        /// Print canvas operations as JSON
        #[arg(long)]
        json: bool,
        /// Stop at the first failing line
        #[arg(long)]
        strict: bool,
    },
    /// Check that every block in a program is closed
    Check {
        /// Program file
        file: PathBuf,
    },
    /// Evaluate a single expression
    Eval {
        expression: String,
    },
    /// Start an interactive session
    Repl,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Run { file, json, strict } => run_file(&file, &config, json, strict),
        Command::Check { file } => check_file(&file),
        Command::Eval { expression } => eval_expression(&expression),
        Command::Repl => run_repl(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("BOOSE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_source(path: &Path) -> Result<String, BooseError> {
    std::fs::read_to_string(path).map_err(|e| BooseError::io_error(format!("{}: {e}", path.display())))
}

fn run_file(path: &Path, config: &Config, json: bool, strict: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = read_source(path)?;
    let filename = path.display().to_string();

    let mut options = config.run.clone();
    options.strict |= strict;
    let mut interpreter = Interpreter::with_options(RecordingCanvas::new(), options);
    let result = interpreter.run_source(&source);

    if json {
        println!("{}", serde_json::to_string_pretty(interpreter.canvas().ops())?);
    } else {
        let trace = interpreter.canvas().trace();
        if !trace.is_empty() {
            println!("{trace}");
        }
    }

    for error in interpreter.errors() {
        report_line_error(&filename, &source, error);
    }

    match result {
        // strict-mode aborts are already among the recorded errors
        Err(e) if e.is_fatal() => {
            report_error(&filename, &source, &e, None);
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
        Ok(()) if interpreter.errors().is_empty() => Ok(ExitCode::SUCCESS),
        Ok(()) => Ok(ExitCode::from(2)),
    }
}

fn check_file(path: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = read_source(path)?;
    let filename = path.display().to_string();
    let lines: Vec<&str> = source.lines().collect();

    match BlockMap::build(&lines, 1) {
        Ok(_) => {
            println!("✓ {filename}: all blocks are closed");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_error(&filename, &source, &e, None);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn eval_expression(expression: &str) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let value = evaluate(expression, &Scope::new())?;
    println!("{value}");
    Ok(ExitCode::SUCCESS)
}

fn run_repl(config: &Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut repl = Repl::new(config.run.clone(), &config.repl)?;
    repl.run()?;
    Ok(ExitCode::SUCCESS)
}
