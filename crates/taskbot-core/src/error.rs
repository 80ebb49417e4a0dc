//! Error types for taskbot-core

use thiserror::Error;

/// Main error type for taskbot-core
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected task input (empty content, priority out of range)
    #[error("{0}")]
    Validation(String),

    /// Upstream task service failure, message passed through
    #[error("{0}")]
    Task(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors caused by bad user input rather than the upstream service
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for taskbot-core
pub type Result<T> = std::result::Result<T, Error>;
