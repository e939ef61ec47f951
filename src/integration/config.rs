//! Configuration for the studio
//!
//! Every section has defaults; a TOML file may override any subset of them.

use crate::notifications::DEFAULT_CAPACITY;
use crate::workflow::validation::{
    LYRICS_MAX_CHARS, LYRICS_MIN_CHARS, SONG_MAX_BYTES, VOICE_MAX_BYTES,
};
use crate::{CoverError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Processing timer settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Multiplier applied to every stage sub-step (1.0 = real time)
    pub time_scale: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { time_scale: 1.0 }
    }
}

/// Query polling cadence
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub library_interval_ms: u64,
    /// Used only while a lyrics request is pending or processing
    pub lyrics_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            library_interval_ms: 5000,
            lyrics_interval_ms: 2000,
        }
    }
}

impl PollingConfig {
    pub fn library_interval(&self) -> Duration {
        Duration::from_millis(self.library_interval_ms)
    }

    pub fn lyrics_interval(&self) -> Duration {
        Duration::from_millis(self.lyrics_interval_ms)
    }
}

/// Upload and input limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub voice_max_bytes: u64,
    pub song_max_bytes: u64,
    pub lyrics_min_chars: usize,
    pub lyrics_max_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            voice_max_bytes: VOICE_MAX_BYTES,
            song_max_bytes: SONG_MAX_BYTES,
            lyrics_min_chars: LYRICS_MIN_CHARS,
            lyrics_max_chars: LYRICS_MAX_CHARS,
        }
    }
}

/// Configuration for the complete studio
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Owner of uploads, personas and library queries
    pub user_id: String,

    pub timing: TimingConfig,

    pub polling: PollingConfig,

    pub limits: LimitsConfig,

    /// Notifications kept before the oldest is dropped
    pub notification_capacity: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            user_id: "user".to_string(),
            timing: TimingConfig::default(),
            polling: PollingConfig::default(),
            limits: LimitsConfig::default(),
            notification_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StudioConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CoverError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| CoverError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: StudioConfig = toml::from_str(content)
            .map_err(|e| CoverError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the owning user
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Speed up or slow down processing
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.timing.time_scale = time_scale;
        self
    }

    pub fn with_polling(mut self, library: Duration, lyrics: Duration) -> Self {
        self.polling.library_interval_ms = library.as_millis() as u64;
        self.polling.lyrics_interval_ms = lyrics.as_millis() as u64;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(CoverError::ConfigError("user_id must not be empty".to_string()));
        }

        let scale = self.timing.time_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(CoverError::ConfigError(format!(
                "time_scale must be a non-negative number, got {}",
                scale
            )));
        }

        if self.polling.library_interval_ms == 0 || self.polling.lyrics_interval_ms == 0 {
            return Err(CoverError::ConfigError(
                "Polling intervals must be greater than zero".to_string(),
            ));
        }

        if self.limits.lyrics_min_chars > self.limits.lyrics_max_chars {
            return Err(CoverError::ConfigError(format!(
                "lyrics_min_chars ({}) exceeds lyrics_max_chars ({})",
                self.limits.lyrics_min_chars, self.limits.lyrics_max_chars
            )));
        }

        if self.notification_capacity == 0 {
            return Err(CoverError::ConfigError(
                "notification_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StudioConfig::default();
        assert_eq!(config.user_id, "user");
        assert_eq!(config.timing.time_scale, 1.0);
        assert_eq!(config.polling.library_interval(), Duration::from_secs(5));
        assert_eq!(config.limits.voice_max_bytes, 50 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StudioConfig::default()
            .with_user("alice")
            .with_time_scale(0.01)
            .with_polling(Duration::from_millis(100), Duration::from_millis(50));

        assert_eq!(config.user_id, "alice");
        assert_eq!(config.timing.time_scale, 0.01);
        assert_eq!(config.polling.lyrics_interval_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(StudioConfig::default().with_time_scale(-1.0).validate().is_err());
        assert!(StudioConfig::default().with_user("  ").validate().is_err());

        let mut config = StudioConfig::default();
        config.limits.lyrics_min_chars = 3000;
        assert!(matches!(config.validate(), Err(CoverError::ConfigError(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
user_id = "bob"

[timing]
time_scale = 0.5

[polling]
library_interval_ms = 1000
"#
        )
        .unwrap();

        let config = StudioConfig::load(file.path()).unwrap();
        assert_eq!(config.user_id, "bob");
        assert_eq!(config.timing.time_scale, 0.5);
        assert_eq!(config.polling.library_interval_ms, 1000);
        assert_eq!(config.polling.lyrics_interval_ms, 2000);
        assert_eq!(config.limits, LimitsConfig::default());
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            StudioConfig::load("/nonexistent/voicecover.toml"),
            Err(CoverError::ConfigError(_))
        ));
        assert!(StudioConfig::from_toml("user_id = 5").is_err());
    }
}
