mod args;
mod force;
mod glbfloor;
mod legalfloor;
mod load;

use std::cell::Cell;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::LazyLock;

use clap::Parser;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};
use dieplan::diag::StrResult;
use tracing_subscriber::filter::EnvFilter;

use crate::args::{CliArguments, Command};

thread_local! {
    /// The CLI's exit code.
    static EXIT: Cell<ExitCode> = const { Cell::new(ExitCode::SUCCESS) };
}

/// The parsed command line arguments.
static ARGS: LazyLock<CliArguments> = LazyLock::new(CliArguments::parse);

/// Entry point.
fn main() -> ExitCode {
    let filter = if ARGS.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let result = dispatch();

    if let Err(msg) = result {
        set_failed();
        print_error(&msg).expect("failed to print error");
    }

    EXIT.with(|cell| cell.get())
}

/// Execute the requested command.
fn dispatch() -> StrResult<()> {
    match &ARGS.command {
        Command::Glbfloor(command) => crate::glbfloor::glbfloor(command),
        Command::Legalfloor(command) => crate::legalfloor::legalfloor(command),
        Command::Force(command) => crate::force::force(command),
    }
}

/// Ensure a failure exit code.
fn set_failed() {
    EXIT.with(|cell| cell.set(ExitCode::FAILURE));
}

/// Print an application-level error.
fn print_error(msg: &str) -> io::Result<()> {
    let styles = term::Styles::default();

    let mut output = StandardStream::stderr(ColorChoice::Auto);
    output.set_color(&styles.header_error)?;
    write!(output, "error")?;

    output.reset()?;
    writeln!(output, ": {msg}")
}
