//! Unit tests for configuration defaults.

use std::str::FromStr;

use rstest::rstest;

use crate::{Config, DEFAULT_MAX_DISPLAY_WIDTH, LogFormat};

#[rstest]
#[case(None, DEFAULT_MAX_DISPLAY_WIDTH)]
#[case(Some(0), DEFAULT_MAX_DISPLAY_WIDTH)]
#[case(Some(40), 40)]
fn display_width_falls_back_to_default(#[case] configured: Option<usize>, #[case] expected: usize) {
    let config = Config {
        max_display_width: configured,
        ..Config::default()
    };

    assert_eq!(config.display_width(), expected);
}

#[rstest]
#[case(0, None)]
#[case(3, Some(3))]
fn zero_segments_means_unlimited(#[case] configured: usize, #[case] expected: Option<usize>) {
    let config = Config {
        max_path_segments: configured,
        ..Config::default()
    };

    assert_eq!(config.segment_limit(), expected);
}

#[rstest]
fn defaults_exclude_go_test_files() {
    let config = Config::default();

    assert_eq!(config.excluded_suffixes, vec!["_test.go".to_owned()]);
    assert_eq!(config.excluded_fragments, vec!["component_test".to_owned()]);
    assert_eq!(config.bare_roots, vec!["init".to_owned()]);
    assert_eq!(config.server_command, "gopls");
}

#[rstest]
fn partial_documents_keep_defaults() {
    let config: Config = serde_json::from_str(r#"{"max_path_segments": 4, "log_format": "json"}"#)
        .expect("config should deserialize");

    assert_eq!(config.max_path_segments, 4);
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.display_width(), DEFAULT_MAX_DISPLAY_WIDTH);
    assert_eq!(config.log_filter(), "warn");
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(LogFormat::from_str(text).expect("valid format"), expected);
}
