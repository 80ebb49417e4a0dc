//! Todoist REST API types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Lowest Todoist priority (p4 in the apps)
pub const PRIORITY_LOW: u8 = 1;
/// Highest Todoist priority (p1 in the apps)
pub const PRIORITY_URGENT: u8 = 4;

/// Priority used when the caller does not pick one
pub const DEFAULT_PRIORITY: u8 = PRIORITY_URGENT;

/// Natural-language due directive sent as `due_string`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DueHint {
    #[default]
    Today,
    Tomorrow,
}

/// Request body for `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTask {
    pub content: String,
    #[serde(rename = "due_string")]
    pub due_hint: DueHint,
    pub priority: u8,
}

/// Due information attached to a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDue {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub string: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

/// A task as returned by Todoist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(default = "default_task_priority")]
    pub priority: u8,
    #[serde(default)]
    pub due: Option<TaskDue>,
}

fn default_task_priority() -> u8 {
    PRIORITY_LOW
}

impl Task {
    /// Due date string, if the task has one
    pub fn due_date(&self) -> Option<&str> {
        self.due.as_ref().map(|d| d.date.as_str())
    }
}

/// Normalize a task listing into a flat list.
///
/// Accepts a bare array or an object with a `results` array (the paginated
/// shape). Anything else yields an empty list. Items that do not decode as a
/// task are skipped.
pub fn normalize_task_list(body: Value) -> Vec<Task> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                warn!("Task listing has no results array, treating as empty");
                return Vec::new();
            }
        },
        other => {
            warn!("Unexpected task listing shape: {}", other);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Task>(item) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("Skipping undecodable task: {}", e);
                None
            }
        })
        .collect()
}
