// tests/config.rs
//! Loading analyzer settings from a TOML file.

use std::io::Write;

use ek9_sema::{AnalyzerConfig, ConfigError};

#[test]
fn partial_file_overrides_only_named_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_instantiation_depth = 8").unwrap();
    writeln!(file, "warn_unreferenced = false").unwrap();

    let config = AnalyzerConfig::load(file.path()).unwrap();

    assert_eq!(config.max_instantiation_depth, 8);
    assert!(!config.warn_unreferenced);
    assert_eq!(config.max_hierarchy_depth, AnalyzerConfig::default().max_hierarchy_depth);
    assert!(config.synthesize_default_constructors);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AnalyzerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_instantiation_depth = \"deep\"").unwrap();

    let err = AnalyzerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
