//! Error types for the OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAiError>;

#[derive(Debug, Error)]
pub enum OpenAiError {
    /// Missing API key or invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response or an empty result.
    #[error("API error: {0}")]
    Api(String),

    /// Unexpected response body.
    #[error("Parse error: {0}")]
    Parse(String),
}
