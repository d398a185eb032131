use thiserror::Error;

/// Top-level error type for the digest system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for DigestError` so that `?` works at the
/// application boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DigestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upstream service error ({service}): {message}")]
    Upstream { service: String, message: String },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Run timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DigestError {
    /// Shorthand for an upstream failure attributed to `service`.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        DigestError::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for DigestError {
    fn from(err: toml::de::Error) -> Self {
        DigestError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DigestError {
    fn from(err: toml::ser::Error) -> Self {
        DigestError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DigestError {
    fn from(err: serde_json::Error) -> Self {
        DigestError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for digest operations.
pub type Result<T> = std::result::Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(DigestError, &str)> = vec![
            (
                DigestError::Config("missing key".to_string()),
                "Configuration error: missing key",
            ),
            (
                DigestError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                DigestError::upstream("openai", "429 too many requests"),
                "Upstream service error (openai): 429 too many requests",
            ),
            (
                DigestError::DegenerateInput("zero-norm vector".to_string()),
                "Degenerate input: zero-norm vector",
            ),
            (DigestError::Timeout { secs: 600 }, "Run timed out after 600s"),
            (
                DigestError::Pipeline("stage aborted".to_string()),
                "Pipeline error: stage aborted",
            ),
            (
                DigestError::Serialization("invalid json".to_string()),
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
        let err: DigestError = io_err.into();
        assert!(matches!(err, DigestError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let digest_err: DigestError = err.unwrap_err().into();
        assert!(matches!(digest_err, DigestError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let digest_err: DigestError = err.unwrap_err().into();
        assert!(matches!(digest_err, DigestError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(format!("got {}", value))
        }

        assert_eq!(inner().unwrap(), "got 42");
    }
}
