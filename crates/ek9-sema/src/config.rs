//! Analyzer configuration.
//!
//! All fields have defaults, so a TOML file only needs to name the values that
//! differ. Loading uses `#[serde(default)]` the same way for every section.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Recursion ceiling for nested generic parameterization.
    pub max_instantiation_depth: usize,
    /// Ceiling for supertype/trait walks.
    pub max_hierarchy_depth: usize,
    /// Warn about locals that are never referenced when their block closes.
    pub warn_unreferenced: bool,
    /// Give aggregates without a declared constructor an implicit no-arg one.
    pub synthesize_default_constructors: bool,
    /// Two overload weights closer than this are a tie.
    pub ambiguity_epsilon: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_instantiation_depth: 256,
            max_hierarchy_depth: 128,
            warn_unreferenced: true,
            synthesize_default_constructors: true,
            ambiguity_epsilon: 0.001,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration")]
    Parse(#[from] toml::de::Error),
}

impl AnalyzerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = AnalyzerConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config =
            AnalyzerConfig::from_toml_str("max_instantiation_depth = 8\nwarn_unreferenced = false")
                .unwrap();
        assert_eq!(config.max_instantiation_depth, 8);
        assert!(!config.warn_unreferenced);
        assert_eq!(config.max_hierarchy_depth, 128);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = AnalyzerConfig::from_toml_str("max_instantiation_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
