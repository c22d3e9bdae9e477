//! CLI configuration, loaded from an optional JSON file.

use anyhow::Context;
use geofence_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILTER: &str = "info,geofence=debug";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    pub database_path: PathBuf,
    /// Used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub tracker: TrackerConfig,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl GeofenceConfig {
    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geofence")
        .join("state.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GeofenceConfig::load(None).unwrap();
        assert_eq!(config, GeofenceConfig::default());
        assert!(config.database_path.ends_with("geofence/state.db"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"database_path": "/tmp/g.db", "tracker": {{"loitering_delay_ms": 1000}}}}"#
        )
        .unwrap();

        let config = GeofenceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/g.db"));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.tracker.loitering_delay_ms, 1000);
        assert_eq!(config.tracker.request_id, "GEOFENCE_ID");
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(GeofenceConfig::load(Some(file.path())).is_err());
    }
}
