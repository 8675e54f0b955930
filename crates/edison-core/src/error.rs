use thiserror::Error;

/// Top-level error type for Edison.
#[derive(Debug, Error)]
pub enum EdisonError {
    /// Error from the external protocol session.
    #[error("session error: {0}")]
    Session(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Caller supplied malformed input.
    #[error("{0}")]
    Validation(String),

    /// Request conflicts with the current connection phase.
    #[error("{0}")]
    Conflict(String),

    /// A bounded wait expired.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Audit sink delivery failure.
    #[error("audit error: {0}")]
    Audit(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
