use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deck::DeckConfig;
use crate::detector::DetectorConfig;
use crate::Result;

/// Top-level configuration structure for the application.
///
/// Every field has a reference default, and partial JSON files are accepted:
/// a deployment only overrides what its hardware needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub deck: DeckConfig,
    /// Control loop poll interval.
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            deck: DeckConfig::default(),
            poll_interval_ms: 100,
        }
    }
}

impl AppConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Renders the effective configuration for display.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_calibration() {
        let config = AppConfig::default();
        assert_eq!(config.detector.beam.threshold, 100);
        assert_eq!(config.detector.beam.debounce_samples, 10);
        assert_eq!(config.detector.internote_timeout_secs, 30);
        assert_eq!(config.deck.pulse_width_ms, 200);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"deck": {"max_attempts": 5}}"#).expect("valid config");
        assert_eq!(config.deck.max_attempts, 5);
        assert_eq!(config.deck.pulse_width_ms, 200);
        assert_eq!(config.detector.beam.threshold, 100);
    }
}
