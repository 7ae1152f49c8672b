use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CorrigeError, Result};

/// Top-level configuration for the Corrige application.
///
/// Loaded from `~/.corrige/config.toml` by default. Every section falls back
/// to its defaults when missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrigeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub writing: WritingConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl CorrigeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CorrigeConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.correction.acceptance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CorrigeError::Config(format!(
                "acceptance_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.correction.max_suggestions == 0 {
            return Err(CorrigeError::Config(
                "max_suggestions must be at least 1".to_string(),
            ));
        }
        if self.display.channel_capacity == 0 {
            return Err(CorrigeError::Config(
                "display channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Newline-separated word list. The built-in list is used when unset.
    pub dictionary_path: Option<String>,
    /// When false, misspellings are only reported, never rewritten.
    pub auto_correct: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            dictionary_path: None,
            auto_correct: true,
        }
    }
}

/// Writing buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WritingConfig {
    /// Idle gap after which the whole buffer is discarded.
    pub word_timeout_ms: u64,
}

impl WritingConfig {
    pub fn word_timeout(&self) -> Duration {
        Duration::from_millis(self.word_timeout_ms)
    }
}

impl Default for WritingConfig {
    fn default() -> Self {
        Self {
            word_timeout_ms: 5_000,
        }
    }
}

/// Automatic correction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Minimum top-suggestion score required to rewrite a word.
    pub acceptance_threshold: f64,
    /// Suggestions requested from the dictionary per completed word.
    pub max_suggestions: usize,
    /// Delay between the end of a replace sequence and re-accepting input.
    pub settle_delay_ms: u64,
}

impl CorrectionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.8,
            max_suggestions: 3,
            settle_delay_ms: 200,
        }
    }
}

/// Display channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Updates buffered before new ones are dropped.
    pub channel_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
        }
    }
}
