//! Language server child process.

use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::error::RpcError;

/// Log target for process management.
const PROCESS_TARGET: &str = "lineage_rpc::process";

/// How long a server gets to exit on its own before it is killed.
const EXIT_GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Command line used to start a language server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    /// Executable to run.
    pub command: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory; inherits the current one when `None`.
    pub working_dir: Option<PathBuf>,
}

impl ServerCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Replaces the argument list.
    #[must_use]
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// A running language server.
///
/// The child is terminated when this value is dropped.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    /// Spawns the server with piped stdio and connects an endpoint to it.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Spawn`] when the process cannot be started and
    /// [`RpcError::Io`] when the endpoint's reader thread cannot be spawned.
    pub fn spawn(command: &ServerCommand) -> Result<(Self, Endpoint), RpcError> {
        let shown = command.command.display().to_string();
        debug!(
            target: PROCESS_TARGET,
            command = %shown,
            args = ?command.args,
            "spawning language server"
        );

        let mut builder = Command::new(&command.command);
        builder
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &command.working_dir {
            builder.current_dir(dir);
        }

        let mut child = builder.spawn().map_err(|source| RpcError::Spawn {
            command: shown.clone(),
            source,
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            drop(Self { child });
            return Err(RpcError::Spawn {
                command: shown,
                source: io::Error::other("child stdio was not captured"),
            });
        };

        let process = Self { child };
        let endpoint = Endpoint::new(stdout, stdin)?;
        debug!(target: PROCESS_TARGET, pid = process.id(), "language server spawned");
        Ok((process, endpoint))
    }

    /// Operating system process id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Waits briefly for the server to exit, then kills it.
    pub fn terminate(&mut self) {
        if self.has_exited() {
            return;
        }
        thread::sleep(EXIT_GRACE_PERIOD);
        if self.has_exited() {
            return;
        }

        warn!(
            target: PROCESS_TARGET,
            pid = self.child.id(),
            "language server did not exit in time, killing it"
        );
        if let Err(error) = self.child.kill() {
            debug!(target: PROCESS_TARGET, %error, "kill failed");
        }
        if let Err(error) = self.child.wait() {
            debug!(target: PROCESS_TARGET, %error, "reaping language server failed");
        }
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: PROCESS_TARGET, ?status, "language server exited");
                true
            }
            Ok(None) => false,
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "failed to check language server status");
                false
            }
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
