//! Command-line runtime for the code lineage tool.
//!
//! [`run`] parses arguments, spawns and initialises the language server,
//! resolves the lineage of every function in the requested files and prints
//! one line per function. Graphs can be written as Graphviz files. The
//! runtime takes its output streams as parameters so tests can capture them.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use lineage_config::Config;
use lineage_graph::{CancellationToken, LineageEngine, VisitedCache};
use tracing::{debug, error, info};

mod cli;
mod errors;
mod report;
mod session;
mod telemetry;

use cli::Cli;
use errors::AppError;
use report::{report_documents, write_graphs};
use session::LanguageServer;

const CLI_TARGET: &str = "lineage_cli";

/// Exit status for invalid arguments.
const USAGE_EXIT: u8 = 2;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(usage) => {
            // Help and version requests are not errors.
            if usage.use_stderr() {
                write!(stderr, "{usage}").ok();
                return ExitCode::from(USAGE_EXIT);
            }
            write!(stdout, "{usage}").ok();
            return ExitCode::SUCCESS;
        }
    };

    match execute(&cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(target: CLI_TARGET, error = %failure, "lineage run failed");
            writeln!(stderr, "lineage: {failure}").ok();
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<(), AppError> {
    let working_dir = working_dir()?;
    let mut config = Config::default();
    cli.apply(&mut config, &working_dir);
    telemetry::initialise(&config)?;

    let root = config
        .project_root
        .clone()
        .unwrap_or_else(|| working_dir.clone());
    let server = LanguageServer::start(&config, &root)?;
    let outcome = resolve(cli, &config, &server, &working_dir, stdout);
    server.stop();
    outcome
}

fn resolve<W: Write>(
    cli: &Cli,
    config: &Config,
    server: &LanguageServer,
    working_dir: &Utf8Path,
    stdout: &mut W,
) -> Result<(), AppError> {
    let engine = LineageEngine::from_config(server.client(), Arc::new(VisitedCache::new()), config);
    let cancel = CancellationToken::new();
    if let Some(limit) = cli.time_limit {
        arm_deadline(&cancel, Duration::from_secs(limit));
    }

    let totals = report_documents(&engine, &cli.documents(working_dir), &cancel, stdout)?;
    stdout.flush().map_err(AppError::Output)?;
    info!(
        target: CLI_TARGET,
        functions = totals.symbols,
        uncalled = totals.uncalled,
        cancelled = totals.cancelled,
        "lineages resolved"
    );

    if let Some(dir) = &cli.dot_dir {
        let target_dir = working_dir.join(dir);
        let written = write_graphs(engine.graphs(), engine.project_root(), &target_dir)?;
        info!(target: CLI_TARGET, graphs = written, dir = %target_dir, "graphs written");
    }
    Ok(())
}

/// Cancels `token` once `limit` has elapsed.
fn arm_deadline(token: &CancellationToken, limit: Duration) {
    let watched = token.clone();
    let watchdog = thread::spawn(move || {
        thread::sleep(limit);
        debug!(target: CLI_TARGET, ?limit, "time limit reached");
        watched.cancel();
    });
    // The watchdog dies with the process.
    drop(watchdog);
}

fn working_dir() -> Result<Utf8PathBuf, AppError> {
    let current = std::env::current_dir().map_err(AppError::WorkingDirectory)?;
    Utf8PathBuf::try_from(current).map_err(|error| AppError::NonUtf8Path(error.into_path_buf()))
}

#[cfg(test)]
mod tests;
