//! Engine tuning knobs.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Evaluate the location-type groups of one partial expression in parallel.
    pub parallel_location_types: bool,
    /// Evaluate the locations of one group in parallel. They share the group's cache.
    pub parallel_locations: bool,
    /// Load each referenced entity's values once per group instead of once per point.
    pub batch_cache: bool,
    /// Explore (location type, period) combinations of the cycle check in parallel.
    pub parallel_cycle_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_location_types: false,
            parallel_locations: false,
            batch_cache: true,
            parallel_cycle_check: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { path: path.display().to_string(), msg: e.to_string() })?;
        Self::from_json_str(&text)
    }

    /// Everything on the rayon pool.
    pub fn parallel() -> Self {
        Self {
            parallel_location_types: true,
            parallel_locations: true,
            parallel_cycle_check: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "parallel_locations": true }"#).unwrap();
        assert!(config.parallel_locations);
        assert!(config.batch_cache);
        assert!(!config.parallel_location_types);
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "batch_cahce": false }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("batch_cahce")));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "batch_cache": false, "parallel_cycle_check": true }}"#).unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert!(!config.batch_cache);
        assert!(config.parallel_cycle_check);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { path, .. } if path.ends_with("absent.json")));
    }
}
