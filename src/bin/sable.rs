use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sable::{
    Diagnostic, ErrorCollector, Repl, RuntimeOptions, SableError, analyze, lexer, run_source,
};

#[derive(Parser)]
#[command(author, version, about = "Sable language interpreter")]
struct Args {
    /// Log filter directive, e.g. `debug` or `sable=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Stop at the first evaluation error instead of continuing with the next statement
    #[arg(long, global = true)]
    halt_on_error: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Sable script file
    Run { script: PathBuf },
    /// Evaluate a snippet of Sable code
    Eval { source: String },
    /// Analyse a script and report diagnostics without running it
    Check { script: PathBuf },
    /// Print the token stream of every line of a script
    Tokens { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
}

fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(args.log_level.as_deref());
    let options = RuntimeOptions {
        halt_on_error: args.halt_on_error,
    };
    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => {
            read_script(&script).and_then(|source| execute(&source, options))
        }
        Command::Eval { source } => execute(&source, options),
        Command::Check { script } => read_script(&script).map(|source| check(&source)),
        Command::Tokens { script } => read_script(&script).map(|source| dump_tokens(&source)),
        Command::Repl => Repl::new(options).run().map(|()| true),
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn install_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_script(path: &Path) -> Result<String, SableError> {
    Ok(fs::read_to_string(path)?)
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn execute(source: &str, options: RuntimeOptions) -> Result<bool, SableError> {
    let diagnostics = run_source(source, options)?;
    report(&diagnostics);
    Ok(diagnostics.is_empty())
}

fn check(source: &str) -> bool {
    let analysis = analyze(source);
    report(&analysis.diagnostics);
    if analysis.is_ok() {
        println!("ok: {} statement(s)", analysis.program.nodes.len());
    }
    analysis.is_ok()
}

fn dump_tokens(source: &str) -> bool {
    let mut errors = ErrorCollector::new();
    let lines: Vec<&str> = source.lines().collect();
    for (idx, tokens) in lexer::tokenize(source, &mut errors).iter().enumerate() {
        let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        println!("{}: [{}]", idx + 1, rendered.join(", "));
    }
    let mut diagnostics = errors.drain();
    for diagnostic in &mut diagnostics {
        diagnostic.attach_source(&lines);
    }
    report(&diagnostics);
    diagnostics.is_empty()
}
