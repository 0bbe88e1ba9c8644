//! Shared configuration for the code lineage tools.
//!
//! The crate only describes values and their defaults; how they are loaded is
//! left to the front end (the `lineage` binary maps command-line flags onto
//! [`Config`], editor integrations deserialize their settings into it).

mod config;
mod defaults;
mod logging;

pub use config::Config;
pub use defaults::{
    DEFAULT_BARE_ROOTS, DEFAULT_EXCLUDED_FRAGMENTS, DEFAULT_EXCLUDED_SUFFIXES, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_DISPLAY_WIDTH, DEFAULT_SERVER_COMMAND,
};
pub use logging::{LogFormat, LogFormatParseError};

#[cfg(test)]
mod tests;
