//! Caller exclusion.

use lineage_config::Config;
use lsp_types::CallHierarchyItem;

/// Decides which callers are left out of a lineage (tests, fixtures).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerFilter {
    suffixes: Vec<String>,
    fragments: Vec<String>,
    names: Vec<String>,
}

impl CallerFilter {
    /// A filter that keeps every caller.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Builds the filter from the configured exclusion lists.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            suffixes: config.excluded_suffixes.clone(),
            fragments: config.excluded_fragments.clone(),
            names: config.excluded_names.clone(),
        }
    }

    /// Excludes callers whose URI ends with `suffix`.
    #[must_use]
    pub fn exclude_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    /// Excludes callers whose URI contains `fragment`.
    #[must_use]
    pub fn exclude_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Excludes callers with exactly this name.
    #[must_use]
    pub fn exclude_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Whether `caller` should be skipped.
    #[must_use]
    pub fn excludes(&self, caller: &CallHierarchyItem) -> bool {
        let uri = caller.uri.as_str();
        self.suffixes.iter().any(|suffix| uri.ends_with(suffix.as_str()))
            || self
                .fragments
                .iter()
                .any(|fragment| uri.contains(fragment.as_str()))
            || self.names.iter().any(|name| *name == caller.name)
    }
}
