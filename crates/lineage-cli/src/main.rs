//! CLI entrypoint for the code lineage tool.
//!
//! The binary delegates to [`lineage_cli::run`], which parses arguments,
//! starts the language server and prints one lineage line per function.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    lineage_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
