//! Default values shared by the configuration and its consumers.

/// Display width used when no usable maximum width is configured.
pub const DEFAULT_MAX_DISPLAY_WIDTH: usize = 80;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default language server command.
pub const DEFAULT_SERVER_COMMAND: &str = "gopls";

/// Caller URIs ending with these suffixes are treated as test code.
pub const DEFAULT_EXCLUDED_SUFFIXES: &[&str] = &["_test.go"];

/// Caller URIs containing these fragments are treated as test code.
pub const DEFAULT_EXCLUDED_FRAGMENTS: &[&str] = &["component_test"];

/// Root names rendered without offsets (implicit package initialisers).
pub const DEFAULT_BARE_ROOTS: &[&str] = &["init"];

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Owned server command used by serde defaults.
pub fn default_server_command() -> String {
    DEFAULT_SERVER_COMMAND.to_owned()
}

/// Default exclusion suffixes as owned strings.
pub fn default_excluded_suffixes() -> Vec<String> {
    to_owned_list(DEFAULT_EXCLUDED_SUFFIXES)
}

/// Default exclusion fragments as owned strings.
pub fn default_excluded_fragments() -> Vec<String> {
    to_owned_list(DEFAULT_EXCLUDED_FRAGMENTS)
}

/// Default bare root names as owned strings.
pub fn default_bare_roots() -> Vec<String> {
    to_owned_list(DEFAULT_BARE_ROOTS)
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}
