//! Error types for taskbot-telegram

use thiserror::Error;

/// taskbot-telegram error type
#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook error: {0}")]
    Webhook(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TelegramError>;
