//! taskbot-core: shared configuration and the Todoist task client
//!
//! Provides the configuration loader used by the gateway binary and the
//! task-service client that the Telegram dispatcher talks to.

pub mod config;
pub mod error;
pub mod todoist;

pub use config::{Config, ServerConfig, TelegramConfig, TodoistConfig};
pub use error::{Error, Result};
pub use todoist::{
    DueHint, NewTask, ParsedTask, Task, TaskDue, TaskService, TodoistClient, filter_due_on,
    parse_task_input,
};
