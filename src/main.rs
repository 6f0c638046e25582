// src/main.rs

// lambda_rewrite
// An untyped lambda calculus interpreter with named aliases, operators and
// recursion closed through a fixed-point combinator.

use clap::Parser as ClapParser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::Level;

use lambda_rewrite::{
    session::DEFAULT_STEP_LIMIT,
    DisplayOptions, EvalError, Outcome, Session, SessionConfig, Term,
};

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The script file to run. If not provided, launches the REPL.
    file: Option<PathBuf>,

    /// Print every parenthesis.
    #[arg(long)]
    show_parens: bool,

    /// Print abstractions with `λ` instead of `\`.
    #[arg(long)]
    greek: bool,

    /// Do not decode numerals, booleans, strings, pairs and lists.
    #[arg(long)]
    raw: bool,

    /// Reduction steps allowed per evaluation; 0 for no limit.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_STEP_LIMIT)]
    max_steps: usize,

    /// Start without the standard definitions.
    #[arg(long)]
    no_prelude: bool,

    /// Print every intermediate term.
    #[arg(long)]
    trace: bool,

    /// Debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            display: DisplayOptions {
                show_parens: self.show_parens,
                greek_lambda: self.greek,
                readable: !self.raw,
            },
            step_limit: (self.max_steps > 0).then_some(self.max_steps),
            load_prelude: !self.no_prelude,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .init();

    let mut session = match Session::new(cli.session_config()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Fatal error loading prelude: {}", e);
            return ExitCode::from(2);
        }
    };

    let result = match &cli.file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(content) => run_script(&mut session, &content, cli.trace),
            Err(e) => {
                eprintln!("Failed to read file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => repl(&mut session, cli.trace),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_fatal() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

// Runs one statement, printing whatever it produced.
fn process_input(session: &mut Session, input: &str, trace: bool) -> Result<(), EvalError> {
    let outcome = if trace {
        let display = session.config().display;
        session.execute_traced(input, |step, term: &Term| {
            println!("{:>6}: {}", step, term.render(&display));
        })?
    } else {
        session.execute(input)?
    };

    match outcome {
        Outcome::Empty => {}
        Outcome::Defined { name, recursive } => {
            if recursive.is_empty() {
                println!("{} defined", name);
            } else {
                println!("{} defined (recursion closed in {})", name, recursive.join(", "));
            }
        }
        Outcome::OperatorDeclared { token, operator } => {
            println!("operator {} declared (precedence {}, {:?})", token, operator.precedence, operator.assoc);
        }
        Outcome::Normalized { term, steps } => {
            println!("{} ({} reductions)", session.render(&term), steps);
        }
    }
    Ok(())
}

/// Runs a script statement by statement, stopping at the first error.
fn run_script(session: &mut Session, content: &str, trace: bool) -> Result<(), EvalError> {
    for (index, line) in content.lines().enumerate() {
        process_input(session, line, trace).map_err(|e| match e {
            EvalError::Parse(mut error) => {
                error.line += index;
                EvalError::Parse(error)
            }
            other => other,
        })?;
    }
    Ok(())
}

// Simple REPL. Errors other than internal ones are reported and the loop goes on.
fn repl(session: &mut Session, trace: bool) -> Result<(), EvalError> {
    println!("lambda_rewrite REPL ({} declarations loaded)", session.declarations().len());
    println!("Enter terms, definitions (Name = term), ':op TOKEN PREC left|right|none', or 'quit'");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            break;
        }
        let Some(Ok(input)) = lines.next() else {
            break;
        };
        let input = input.trim();

        if input == "quit" || input == "exit" {
            break;
        }

        match process_input(session, input, trace) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}
