//! URI and path conversion utilities.
//!
//! Uses the `url` crate for percent-decoding and platform path rules.

use camino::{Utf8Path, Utf8PathBuf};
use lsp_types::Uri;
use url::Url;

use crate::error::GraphError;

/// Converts a `file://` URI to a path, or `None` for other schemes.
#[must_use]
pub fn uri_to_path(uri: &str) -> Option<Utf8PathBuf> {
    let url = Url::parse(uri).ok()?;
    let path = url.to_file_path().ok()?;
    Utf8PathBuf::try_from(path).ok()
}

/// Converts an absolute path to a `file://` URI.
///
/// # Errors
///
/// Returns [`GraphError::Uri`] for relative paths.
pub fn path_to_uri(path: &Utf8Path) -> Result<Uri, GraphError> {
    let url = Url::from_file_path(path.as_std_path()).map_err(|()| GraphError::uri(path.as_str()))?;
    url.as_str()
        .parse()
        .map_err(|_| GraphError::uri(path.as_str()))
}

/// Path of a document relative to `project_root`, for graph labels.
///
/// Documents outside the root keep their absolute path; URIs that are not
/// file URIs are returned unchanged.
#[must_use]
pub fn relative_path(uri: &str, project_root: Option<&Utf8Path>) -> String {
    let Some(path) = uri_to_path(uri) else {
        return uri.to_owned();
    };
    project_root
        .and_then(|root| path.strip_prefix(root).ok())
        .map_or_else(|| path.to_string(), ToString::to_string)
}
