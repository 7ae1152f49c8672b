//! CLI argument definitions for the corrige binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use corrige_core::config::CorrigeConfig;

/// Corrige - watches what you type and fixes misspelled words in place.
#[derive(Parser, Debug)]
#[command(name = "corrige", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Newline-separated word list to check against.
    #[arg(short = 'd', long = "dictionary")]
    pub dictionary: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Idle time in milliseconds after which the typed buffer is discarded.
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Minimum suggestion score (0.0 to 1.0) that triggers a correction.
    #[arg(long = "threshold")]
    pub threshold: Option<f64>,

    /// Show suggestions without ever typing into other applications.
    #[arg(long = "detect-only")]
    pub detect_only: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long = "init-config")]
    pub init_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CORRIGE_CONFIG env var > platform default
    /// (~/.corrige/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CORRIGE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut CorrigeConfig) {
        if let Some(ref path) = self.dictionary {
            config.general.dictionary_path = Some(path.to_string_lossy().to_string());
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.writing.word_timeout_ms = ms;
        }
        if let Some(threshold) = self.threshold {
            config.correction.acceptance_threshold = threshold;
        }
        if self.detect_only {
            config.general.auto_correct = false;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".corrige").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".corrige").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_changes_nothing() {
        let args = CliArgs::try_parse_from(["corrige"]).unwrap();
        let mut config = CorrigeConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.general.log_level, "info");
        assert!(config.general.auto_correct);
        assert_eq!(config.writing.word_timeout_ms, 5000);
        assert_eq!(config.correction.acceptance_threshold, 0.8);
    }

    #[test]
    fn test_overrides_applied() {
        let args = CliArgs::try_parse_from([
            "corrige",
            "--dictionary",
            "/tmp/words.txt",
            "-l",
            "debug",
            "--timeout-ms",
            "2500",
            "--threshold",
            "0.9",
            "--detect-only",
        ])
        .unwrap();
        let mut config = CorrigeConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.general.dictionary_path.as_deref(), Some("/tmp/words.txt"));
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.writing.word_timeout_ms, 2500);
        assert_eq!(config.correction.acceptance_threshold, 0.9);
        assert!(!config.general.auto_correct);
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = CliArgs::try_parse_from(["corrige", "-c", "/etc/corrige.toml"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/corrige.toml"));
    }

    #[test]
    fn test_default_config_path_file_name() {
        let path = default_config_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_invalid_threshold_type_rejected() {
        assert!(CliArgs::try_parse_from(["corrige", "--threshold", "high"]).is_err());
    }
}
