use thiserror::Error;

/// Top-level error type for the Corrige system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for CorrigeError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CorrigeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dictionary error: {0}")]
    Dictionary(String),

    #[error("Injection error: {0}")]
    Injection(String),

    #[error("Key source error: {0}")]
    KeySource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CorrigeError {
    fn from(err: toml::de::Error) -> Self {
        CorrigeError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CorrigeError {
    fn from(err: toml::ser::Error) -> Self {
        CorrigeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CorrigeError {
    fn from(err: serde_json::Error) -> Self {
        CorrigeError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Corrige operations.
pub type Result<T> = std::result::Result<T, CorrigeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CorrigeError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(CorrigeError, &str)> = vec![
            (
                CorrigeError::Dictionary("empty word list".to_string()),
                "Dictionary error: empty word list",
            ),
            (
                CorrigeError::Injection("combo failed".to_string()),
                "Injection error: combo failed",
            ),
            (
                CorrigeError::KeySource("hook refused".to_string()),
                "Key source error: hook refused",
            ),
            (
                CorrigeError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CorrigeError = io_err.into();
        assert!(matches!(err, CorrigeError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: CorrigeError = err.unwrap_err().into();
        assert!(matches!(err, CorrigeError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: CorrigeError = err.unwrap_err().into();
        assert!(matches!(err, CorrigeError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
