//! Todoist REST client and task types
//!
//! Natural-language due hints are parsed locally; everything else is
//! delegated to the Todoist REST API.

mod client;
mod parse;
mod types;

pub use client::{TaskService, TodoistClient, filter_due_on};
pub use parse::{ParsedTask, parse_task_input};
pub use types::*;
