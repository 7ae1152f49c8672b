//! Corrige application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Load the dictionary (word list file or built-in list)
//! 3. Decide whether corrections may be typed (permissions, --detect-only)
//! 4. Build the typing engine and print display updates as JSON lines
//! 5. Hook the keyboard and run until Ctrl-C

mod cli;
mod output;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use corrige_checker::Dictionary;
use corrige_core::config::CorrigeConfig;
use corrige_core::error::CorrigeError;
use corrige_typing::{
    spawn_forwarder, EngineSettings, InputInjector, RdevKeySource, SystemInjector, TypingEngine,
};

use cli::CliArgs;
use output::JsonLines;

/// How long a correction in flight may hold up exit.
const DISPATCHER_GRACE: Duration = Duration::from_secs(2);

/// Load the configuration, remembering a failure so it can be logged once tracing is up.
fn load_config(path: &Path) -> (CorrigeConfig, Option<CorrigeError>) {
    if !path.exists() {
        return (CorrigeConfig::default(), None);
    }
    match CorrigeConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (CorrigeConfig::default(), Some(e)),
    }
}

fn load_dictionary(config: &CorrigeConfig) -> Result<Dictionary, CorrigeError> {
    match config.general.dictionary_path {
        Some(ref path) => Dictionary::load(Path::new(path)),
        None => {
            let dictionary = Dictionary::builtin();
            tracing::info!(words = dictionary.word_count(), "Using built-in word list");
            Ok(dictionary)
        }
    }
}

/// The injector handed to the engine, or `None` for detect-only operation.
///
/// The built-in list lacks most inflections, so it only ever drives suggestions.
fn build_injector(config: &CorrigeConfig) -> Option<Arc<dyn InputInjector>> {
    if !config.general.auto_correct {
        tracing::info!("Auto-correction disabled, suggestions only");
        return None;
    }
    if config.general.dictionary_path.is_none() {
        tracing::info!("No word list configured, built-in list runs suggestions only");
        return None;
    }
    let injector = SystemInjector::new();
    if injector.capabilities().needs_accessibility_permission && !injector.request_permissions() {
        tracing::warn!("Input permission not granted, running in detect-only mode");
        return None;
    }
    Some(Arc::new(injector))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_path = args.resolve_config_path();
    let (mut config, load_error) = load_config(&config_path);
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Corrige v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_path.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::debug!(path = %config_path.display(), "Configuration resolved"),
    }
    config.validate()?;

    if args.init_config {
        config.save(&config_path)?;
        return Ok(());
    }

    let dictionary = load_dictionary(&config)?;
    let injector = build_injector(&config);

    let (engine, display_rx) = TypingEngine::new(
        EngineSettings::from(&config),
        Arc::new(dictionary),
        injector,
        Handle::current(),
    );
    let forwarder = spawn_forwarder(display_rx, JsonLines::stdout());
    engine.start();

    let (key_tx, key_rx) = mpsc::unbounded_channel();
    let key_source = RdevKeySource::new();
    key_source.start(key_tx)?;
    let mut dispatcher = engine.spawn_dispatcher(key_rx);

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            tracing::info!("Shutdown requested");
        }
        result = &mut dispatcher => {
            match result {
                Ok(handled) => tracing::info!(handled, "Key event queue closed"),
                Err(e) => tracing::error!(error = %e, "Dispatcher worker failed"),
            }
        }
    }

    key_source.stop();
    engine.shutdown();
    if !dispatcher.is_finished() {
        match tokio::time::timeout(DISPATCHER_GRACE, &mut dispatcher).await {
            Ok(Ok(handled)) => tracing::debug!(handled, "Dispatcher stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Dispatcher worker failed"),
            Err(_) => tracing::warn!("Dispatcher did not stop in time"),
        }
    }
    if let Err(e) = forwarder.await {
        tracing::warn!(error = %e, "Display forwarder ended abnormally");
    }

    tracing::info!(words = engine.word_count(), "Corrige stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corrige_core::types::SpellLookup;
    use std::io::Write;

    #[test]
    fn test_missing_config_is_silent_default() {
        let dir = tempfile::tempdir().unwrap();
        let (config, error) = load_config(&dir.path().join("absent.toml"));
        assert!(error.is_none());
        assert_eq!(config.writing.word_timeout_ms, 5000);
    }

    #[test]
    fn test_broken_config_reports_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[correction]\nacceptance_threshold = \"lots\"").unwrap();
        let (config, error) = load_config(file.path());
        assert!(matches!(error, Some(CorrigeError::Config(_))));
        assert_eq!(config.correction.acceptance_threshold, 0.8);
    }

    #[test]
    fn test_dictionary_from_config_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bonjour\nmonde").unwrap();
        let mut config = CorrigeConfig::default();
        config.general.dictionary_path = Some(file.path().to_string_lossy().to_string());
        assert_eq!(load_dictionary(&config).unwrap().word_count(), 2);

        config.general.dictionary_path = Some("/nonexistent/words.txt".to_string());
        assert!(load_dictionary(&config).is_err());
    }

    #[test]
    fn test_detect_only_has_no_injector() {
        let mut config = CorrigeConfig::default();
        config.general.auto_correct = false;
        assert!(build_injector(&config).is_none());
    }

    #[test]
    fn test_builtin_list_never_rewrites_inflections() {
        let config = CorrigeConfig::default();
        let dictionary = load_dictionary(&config).unwrap();
        let lookup = dictionary.check("things", 5);
        assert!(!lookup.is_correct);
        assert!(lookup.best().is_some_and(|s| s.value == "thing"));

        // Default setup has no injector, so "things" stays as typed.
        assert!(build_injector(&config).is_none());
    }
}
