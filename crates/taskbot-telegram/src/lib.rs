//! taskbot-telegram: Telegram front-end for the task bot
//!
//! Serves the Telegram webhook, interprets commands and inline-button
//! callbacks, and replies through the Bot API.

pub mod api;
pub mod bot;
pub mod commands;
pub mod error;
pub mod handler;
pub mod session;
pub mod types;
pub mod webhook;

pub use api::{Messenger, TelegramApiClient};
pub use bot::TelegramBot;
pub use error::{Result, TelegramError};
pub use handler::{HandlerConfig, Outcome, UpdateHandler};
pub use session::{ChatState, ChatStateStore};
