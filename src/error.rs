//! Error types for eai-agent

use thiserror::Error;

/// Result type alias using eai-agent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for eai-agent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model provider error (the "Configuration" row of the error taxonomy:
    /// API key missing, billing exhausted, etc.)
    #[error("Model provider error: {0}")]
    Model(String),

    /// Tool-call parsing failed after exhausting every tactic
    #[error("Parse error: {0}")]
    Parse(String),

    /// A tool call was denied by the permission gate
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Tool execution error (distinct from a synthetic failed ToolResult,
    /// which is the normal "tool unknown" / "filter rejected" outcome)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Path resolution / containment error
    #[error("Path error: {0}")]
    PathResolution(String),

    /// Coordination store error
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Transient errors are worth retrying with backoff (the "Transient
    /// model" row of the error taxonomy); config/permission/parse errors
    /// are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout(_) | Error::Database(_) | Error::Model(_)
        )
    }

    /// Client errors are the caller's fault and never worth retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::NotFound(_) | Error::Permission(_)
        )
    }

    /// True for the "Configuration" row of the model-error taxonomy:
    /// terminal, not retryable regardless of `is_retryable()`.
    pub fn is_model_config_error(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("api key is required")
            || lower.contains("insufficient balance")
            || lower.contains("no resource package")
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
