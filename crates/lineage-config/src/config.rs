//! The configuration values consumed by the lineage engine and the CLI.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_MAX_DISPLAY_WIDTH, default_bare_roots, default_excluded_fragments,
    default_excluded_suffixes, default_log_filter, default_server_command,
};
use crate::logging::LogFormat;

/// Configuration shared by the lineage engine and its front ends.
///
/// Every field carries a serde default so partial documents (for example an
/// editor settings fragment) deserialize into a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Maximum offset segments kept per rendered path; `0` keeps all of them.
    pub max_path_segments: usize,
    /// Maximum display width of a rendered summary.
    pub max_display_width: Option<usize>,
    /// Root names rendered without offsets.
    pub bare_roots: Vec<String>,
    /// Caller URIs ending with any of these suffixes are skipped.
    pub excluded_suffixes: Vec<String>,
    /// Caller URIs containing any of these fragments are skipped.
    pub excluded_fragments: Vec<String>,
    /// Caller names that are always skipped.
    pub excluded_names: Vec<String>,
    /// Directory that graph labels are made relative to.
    pub project_root: Option<Utf8PathBuf>,
    /// Language server executable.
    pub server_command: String,
    /// Arguments passed to the language server.
    pub server_args: Vec<String>,
    /// Per-request timeout in seconds; unset waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_path_segments: 0,
            max_display_width: None,
            bare_roots: default_bare_roots(),
            excluded_suffixes: default_excluded_suffixes(),
            excluded_fragments: default_excluded_fragments(),
            excluded_names: Vec::new(),
            project_root: None,
            server_command: default_server_command(),
            server_args: Vec::new(),
            request_timeout_secs: None,
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Effective summary width.
    ///
    /// Falls back to [`DEFAULT_MAX_DISPLAY_WIDTH`] when the configured value is
    /// missing or zero.
    #[must_use]
    pub fn display_width(&self) -> usize {
        match self.max_display_width {
            Some(width) if width > 0 => width,
            _ => DEFAULT_MAX_DISPLAY_WIDTH,
        }
    }

    /// Segment limit, `None` when unlimited.
    #[must_use]
    pub const fn segment_limit(&self) -> Option<usize> {
        match self.max_path_segments {
            0 => None,
            limit => Some(limit),
        }
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
