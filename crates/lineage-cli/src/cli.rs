//! Command-line argument definitions for the `lineage` binary.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use lineage_config::{Config, LogFormat};

/// Prints, for every function in the given files, where it is called from.
#[derive(Parser, Debug)]
#[command(name = "lineage", version)]
pub(crate) struct Cli {
    /// Source files whose functions are resolved.
    #[arg(value_name = "FILE", required = true)]
    pub(crate) files: Vec<Utf8PathBuf>,
    /// Workspace root handed to the language server; defaults to the current
    /// directory.
    #[arg(long, value_name = "DIR")]
    pub(crate) project_root: Option<Utf8PathBuf>,
    /// Language server executable.
    #[arg(long, value_name = "COMMAND")]
    pub(crate) server: Option<String>,
    /// Argument passed to the language server (repeatable).
    #[arg(long = "server-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub(crate) server_args: Vec<String>,
    /// Offsets kept per path; 0 keeps all.
    #[arg(long, value_name = "N")]
    pub(crate) max_segments: Option<usize>,
    /// Width a summary line should fit in.
    #[arg(long, value_name = "COLUMNS")]
    pub(crate) max_width: Option<usize>,
    /// Skip callers whose URI ends with this suffix (repeatable).
    #[arg(long, value_name = "SUFFIX")]
    pub(crate) exclude_suffix: Vec<String>,
    /// Skip callers whose URI contains this text (repeatable).
    #[arg(long, value_name = "TEXT")]
    pub(crate) exclude_fragment: Vec<String>,
    /// Skip callers with this name (repeatable).
    #[arg(long, value_name = "NAME")]
    pub(crate) exclude_name: Vec<String>,
    /// Drop the built-in test-file exclusions.
    #[arg(long)]
    pub(crate) no_default_excludes: bool,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,
    /// Stop resolving after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) time_limit: Option<u64>,
    /// Write one Graphviz file per resolved function into this directory.
    #[arg(long, value_name = "DIR")]
    pub(crate) dot_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression for diagnostics on stderr.
    #[arg(long, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Diagnostic format: `compact` or `json`.
    #[arg(long, value_name = "FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
}

impl Cli {
    /// Overlays the flags onto `config`. Relative paths are resolved against
    /// `working_dir`.
    pub(crate) fn apply(&self, config: &mut Config, working_dir: &Utf8Path) {
        let root = self
            .project_root
            .as_ref()
            .map_or_else(|| working_dir.to_owned(), |root| working_dir.join(root));
        config.project_root = Some(root);

        if let Some(server) = &self.server {
            config.server_command.clone_from(server);
        }
        if !self.server_args.is_empty() {
            config.server_args.clone_from(&self.server_args);
        }
        if let Some(segments) = self.max_segments {
            config.max_path_segments = segments;
        }
        if self.max_width.is_some() {
            config.max_display_width = self.max_width;
        }

        if self.no_default_excludes {
            config.excluded_suffixes.clear();
            config.excluded_fragments.clear();
        }
        config.excluded_suffixes.extend(self.exclude_suffix.iter().cloned());
        config.excluded_fragments.extend(self.exclude_fragment.iter().cloned());
        config.excluded_names.extend(self.exclude_name.iter().cloned());

        if self.timeout.is_some() {
            config.request_timeout_secs = self.timeout;
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter.clone_from(filter);
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }

    /// Absolute paths of the requested files.
    pub(crate) fn documents(&self, working_dir: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.files.iter().map(|file| working_dir.join(file)).collect()
    }
}
