//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use lineage_graph::GraphError;
use lineage_rpc::RpcError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to configure logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("cannot determine the working directory: {0}")]
    WorkingDirectory(io::Error),
    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("failed to start the language server: {0}")]
    Start(RpcError),
    #[error("language server handshake failed: {0}")]
    Handshake(RpcError),
    #[error("cannot resolve lineages in {path}: {source}")]
    Document {
        path: Utf8PathBuf,
        source: GraphError,
    },
    #[error("failed to write output: {0}")]
    Output(io::Error),
    #[error("failed to write graph {path}: {source}")]
    WriteGraph {
        path: Utf8PathBuf,
        source: io::Error,
    },
}

impl AppError {
    pub(crate) fn document(path: &Utf8Path, source: GraphError) -> Self {
        Self::Document {
            path: path.to_owned(),
            source,
        }
    }
}
