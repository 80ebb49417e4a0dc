//! Command interpreter
//!
//! Maps the text of a regular message to a reply. The only side effect is
//! task creation for `/add`.

use tracing::{error, info};

use taskbot_core::todoist::DEFAULT_PRIORITY;
use taskbot_core::TaskService;

use crate::types::{InlineKeyboardButton, InlineKeyboardMarkup, OutgoingMessage};

pub const CMD_ADD: &str = "/add";
pub const CMD_MENU: &str = "/menu";
pub const CMD_START: &str = "/start";

pub const CALLBACK_CREATE_TASK: &str = "crear_tarea";
pub const CALLBACK_VIEW_TASKS: &str = "ver_tareas";
pub const CALLBACK_TODAY_TASKS: &str = "ver_tareas_hoy";

pub const NO_TEXT_REPLY: &str = "No se proporcionó texto";
pub const HELP_REPLY: &str = "Usa /add <tarea> para agregar una tarea o /menu para ver opciones.";
pub const ADD_USAGE_REPLY: &str = "Por favor, proporciona una tarea para agregar.";
pub const MENU_PROMPT: &str = "¿Qué deseas hacer?";

/// A parsed regular message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/add <content>`, content already trimmed (may be empty)
    Add(&'a str),
    /// `/menu` or `/start`
    Menu,
    /// Any other text
    Help,
    /// No text at all
    Empty,
}

/// Classify message text
pub fn parse_command(text: Option<&str>) -> Command<'_> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return Command::Empty,
    };

    if let Some(rest) = text.strip_prefix(CMD_ADD) {
        return Command::Add(rest.trim());
    }

    match text {
        CMD_MENU | CMD_START => Command::Menu,
        _ => Command::Help,
    }
}

/// Inline-button action selected by callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CreateTask,
    ViewTasks,
    TodayTasks,
    Unknown,
}

impl CallbackAction {
    pub fn from_data(data: Option<&str>) -> Self {
        match data {
            Some(CALLBACK_CREATE_TASK) => Self::CreateTask,
            Some(CALLBACK_VIEW_TASKS) => Self::ViewTasks,
            Some(CALLBACK_TODAY_TASKS) => Self::TodayTasks,
            _ => Self::Unknown,
        }
    }
}

/// The main menu with its three inline buttons
pub fn menu_message() -> OutgoingMessage {
    OutgoingMessage {
        text: MENU_PROMPT.to_string(),
        reply_markup: Some(InlineKeyboardMarkup {
            inline_keyboard: vec![
                vec![InlineKeyboardButton::callback("📝 Crear tarea", CALLBACK_CREATE_TASK)],
                vec![InlineKeyboardButton::callback("📋 Ver tareas", CALLBACK_VIEW_TASKS)],
                vec![InlineKeyboardButton::callback(
                    "📋 Ver tareas de hoy",
                    CALLBACK_TODAY_TASKS,
                )],
            ],
        }),
    }
}

/// Reply produced for a regular message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Menu(OutgoingMessage),
}

impl Reply {
    pub fn into_message(self) -> OutgoingMessage {
        match self {
            Reply::Text(text) => OutgoingMessage::text(text),
            Reply::Menu(message) => message,
        }
    }
}

/// Interpret a regular message and build the reply
pub async fn handle_message(text: Option<&str>, tasks: &dyn TaskService) -> Reply {
    match parse_command(text) {
        Command::Empty => Reply::Text(NO_TEXT_REPLY.to_string()),
        Command::Menu => Reply::Menu(menu_message()),
        Command::Help => Reply::Text(HELP_REPLY.to_string()),
        Command::Add(content) => Reply::Text(handle_add(content, tasks).await),
    }
}

async fn handle_add(content: &str, tasks: &dyn TaskService) -> String {
    if content.is_empty() {
        return ADD_USAGE_REPLY.to_string();
    }

    match tasks.create_task(content, DEFAULT_PRIORITY).await {
        Ok(task) => {
            info!("Task added via /add: {}", task.content);
            format!("¡Tarea \"{}\" agregada con éxito!", content)
        }
        Err(e) => {
            error!("Error adding task: {}", e);
            e.to_string()
        }
    }
}
