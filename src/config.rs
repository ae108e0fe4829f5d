//! Engine configuration
//!
//! Loaded from YAML; every field has a default so partial documents work.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Query engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate federation members on the rayon pool
    pub parallel_federation: bool,
    /// Largest intermediate table allowed, in rows
    pub max_rows: Option<usize>,
    /// Remove property path intermediates from results
    pub strip_synthetic: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_federation: false,
            max_rows: None,
            strip_synthetic: true,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.parallel_federation);
        assert!(config.strip_synthetic);
        assert_eq!(config.max_rows, None);
    }

    #[test]
    fn test_partial_yaml() {
        let config = EngineConfig::from_yaml_str("max_rows: 1000\n").unwrap();
        assert_eq!(config.max_rows, Some(1000));
        assert!(config.strip_synthetic);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            EngineConfig::from_yaml_str("max_rows: [oops"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "parallel_federation: true").unwrap();
        writeln!(file, "strip_synthetic: false").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.parallel_federation);
        assert!(!config.strip_synthetic);

        assert!(matches!(
            EngineConfig::load("/nonexistent/rdfkit.yaml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip_of_custom_config() {
        let config = EngineConfig {
            parallel_federation: true,
            max_rows: Some(5),
            strip_synthetic: true,
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(EngineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
