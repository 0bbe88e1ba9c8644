//! Language server session lifecycle.

use std::time::Duration;

use camino::Utf8Path;
use lineage_config::Config;
use lineage_graph::path_to_uri;
use lineage_rpc::{LspClient, ServerCommand, ServerProcess};
use tracing::{info, warn};

use crate::errors::AppError;

const SESSION_TARGET: &str = "lineage_cli::session";

/// A spawned and initialised language server.
///
/// Dropping the session kills the server; [`LanguageServer::stop`] asks it
/// to exit first.
pub(crate) struct LanguageServer {
    process: ServerProcess,
    client: LspClient,
}

impl LanguageServer {
    /// Spawns the configured server rooted at `root` and runs the
    /// `initialize` handshake.
    pub(crate) fn start(config: &Config, root: &Utf8Path) -> Result<Self, AppError> {
        let root_uri = path_to_uri(root).map_err(|source| AppError::document(root, source))?;
        let command = ServerCommand::new(&config.server_command)
            .with_args(config.server_args.iter().cloned())
            .with_working_dir(root.as_std_path());
        let (process, endpoint) = ServerProcess::spawn(&command).map_err(AppError::Start)?;

        let mut client = LspClient::new(endpoint);
        if let Some(secs) = config.request_timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        let server = Self { process, client };

        let initialised = server
            .client
            .initialize(Some(root_uri))
            .map_err(AppError::Handshake)?;
        server.client.initialized().map_err(AppError::Handshake)?;
        info!(
            target: SESSION_TARGET,
            pid = server.process.id(),
            server = initialised
                .server_info
                .as_ref()
                .map_or("unknown", |info| info.name.as_str()),
            root = %root,
            "language server ready"
        );
        Ok(server)
    }

    /// Client for the running server.
    pub(crate) const fn client(&self) -> &LspClient {
        &self.client
    }

    /// Shuts the server down politely, then makes sure the process is gone.
    pub(crate) fn stop(mut self) {
        if let Err(error) = self.client.shutdown() {
            warn!(target: SESSION_TARGET, %error, "language server shutdown failed");
        }
        self.process.terminate();
    }
}
