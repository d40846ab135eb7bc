//! Command-line interface for the cricket model checker.

use clap::Parser;
use cricket_cegar::{prove, CegarConfig, CegarError, Outcome};
use cricket_ir::{init::add_initializers, validate::validate_program, PredicateList, Program};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("parse error in {path} at {span}: {message}")]
    Parse {
        path: String,
        span: cricket_syntax::Span,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(#[from] cricket_ir::ValidationError),

    #[error("analysis error: {0}")]
    Analysis(#[from] CegarError),
}

/// Decide whether any assertion in a small imperative program can fail,
/// via counterexample-guided abstraction refinement.
#[derive(Parser)]
#[command(name = "cricket", version)]
struct Cli {
    /// Source file to analyse
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Seed predicates (`scope: expr;` per line, scope `global` or a
    /// function name)
    #[arg(long, value_name = "FILE")]
    predicates: Option<PathBuf>,

    /// Maximum number of refinement iterations
    #[arg(long, default_value = "20")]
    max_iterations: usize,

    /// Print the parsed program before the analysis
    #[arg(long)]
    print_program: bool,

    /// Print the witnessing trace when an assertion can fail
    #[arg(long)]
    print_trace: bool,
}

fn read(path: &PathBuf) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn load_program(path: &PathBuf) -> Result<Program, CliError> {
    let source = read(path)?;
    let mut prog = cricket_syntax::parse_program(&source).map_err(|e| CliError::Parse {
        path: path.display().to_string(),
        span: e.span(),
        message: e.to_string(),
    })?;
    add_initializers(&mut prog);
    validate_program(&mut prog)?;
    Ok(prog)
}

fn load_predicates(path: &PathBuf, prog: &Program) -> Result<PredicateList, CliError> {
    let source = read(path)?;
    let pairs = cricket_syntax::parse_predicates(&source).map_err(|e| CliError::Parse {
        path: path.display().to_string(),
        span: e.span(),
        message: e.to_string(),
    })?;
    let mut list = PredicateList::from_pairs(pairs);
    list.validate(prog)?;
    Ok(list)
}

fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let prog = load_program(&cli.file)?;
    if cli.print_program {
        println!("{}", prog);
    }

    let predicates = match &cli.predicates {
        Some(path) => load_predicates(path, &prog)?,
        None => PredicateList::new(),
    };

    let config = CegarConfig {
        max_iterations: cli.max_iterations,
    };
    info!(file = %cli.file.display(), max_iterations = config.max_iterations, "analysing");
    Ok(prove(&prog, predicates, &config)?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome::Correct) => {
            println!("correct: no assertion can fail");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Buggy { trace }) => {
            println!("buggy: an assertion can fail");
            if cli.print_trace {
                for stmt in &trace {
                    println!("    {}", stmt);
                }
            }
            ExitCode::from(1)
        }
        Ok(Outcome::Failed) => {
            println!("failed: analysis could not decide the program");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}
