//! Session configuration
//!
//! Loaded from `feartracker.json` in the data directory when present. Every
//! field has a default, so a partial file only overrides what it names.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FearError, FearResult};

/// File name looked up inside the data directory
pub const CONFIG_FILE: &str = "feartracker.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Delay before re-rendering after the viewport stops resizing
    pub resize_debounce_ms: u64,
    /// Dim the tracker after this long without activity; off when `None`
    pub auto_hide_after_ms: Option<u64>,
    /// Viewport width used for layout until the host reports one
    pub viewport_width: f64,
    /// Capacity of the session event channel
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 200,
            auto_hide_after_ms: None,
            viewport_width: 1920.0,
            event_capacity: 256,
        }
    }
}

impl TrackerConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn auto_hide_after(&self) -> Option<Duration> {
        self.auto_hide_after_ms.map(Duration::from_millis)
    }

    /// Parse and validate a JSON config
    pub fn from_json(text: &str) -> FearResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `feartracker.json` from `data_dir`, or defaults if it is absent
    pub fn load(data_dir: impl AsRef<Path>) -> FearResult<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> FearResult<()> {
        if !(self.viewport_width.is_finite() && self.viewport_width > 0.0) {
            return Err(FearError::Config(format!(
                "viewport_width must be positive, got {}",
                self.viewport_width
            )));
        }
        if self.event_capacity == 0 {
            return Err(FearError::Config("event_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.resize_debounce(), Duration::from_millis(200));
        assert_eq!(config.auto_hide_after(), None);
    }

    #[test]
    fn test_partial_file_overrides() {
        let config = TrackerConfig::from_json(r#"{ "auto_hide_after_ms": 5000 }"#).unwrap();
        assert_eq!(config.auto_hide_after(), Some(Duration::from_secs(5)));
        assert_eq!(config.viewport_width, 1920.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = TrackerConfig::from_json(r#"{ "viewport_width": -1 }"#).unwrap_err();
        assert!(matches!(err, FearError::Config(_)));
        let err = TrackerConfig::from_json(r#"{ "event_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, FearError::Config(_)));
        let err = TrackerConfig::from_json("{").unwrap_err();
        assert!(matches!(err, FearError::Serialization(_)));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = TrackerConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            r#"{ "viewport_width": 1280 }"#,
        )
        .unwrap();
        let config = TrackerConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.viewport_width, 1280.0);
    }
}
