//! Update dispatcher
//!
//! Routes webhook updates to the command interpreter or the task service and
//! sends the replies. Messaging failures are logged and swallowed.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use taskbot_core::todoist::DEFAULT_PRIORITY;
use taskbot_core::{Task, TaskService};

use crate::api::Messenger;
use crate::commands::{self, CallbackAction};
use crate::error::{Result, TelegramError};
use crate::session::ChatStateStore;
use crate::types::{CallbackQuery, IncomingMessage, OutgoingMessage, Update};

const CREATE_TASK_PROMPT: &str = "📝 Por favor, proporciona el contenido de la tarea.";
const INVALID_OPTION: &str = "❌ Opción no válida.";
const ALL_TASKS_HEADER: &str = "📋 Tus tareas:";
const NO_TASKS: &str = "🎉 No tienes tareas pendientes.";
const TODAY_TASKS_HEADER: &str = "📋 Tus tareas para hoy:";
const NO_TASKS_TODAY: &str = "🎉 No tienes tareas para hoy.";

/// Configuration for the update handler
#[derive(Clone, Debug, Default)]
pub struct HandlerConfig {
    /// Chats allowed to use the bot
    pub allowed_chat_ids: Vec<i64>,
    /// Delete the previous bot reply before answering a regular message
    pub replace_last_message: bool,
}

/// How an update was disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Forbidden,
}

/// Render tasks as a numbered list under `header`, or `empty_text` when there are none
pub fn render_task_list(header: &str, empty_text: &str, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return empty_text.to_string();
    }

    let lines = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("🔹 {}. {}", i + 1, t.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\n{}", header, lines)
}

/// Update handler for the Telegram webhook
pub struct UpdateHandler {
    tasks: Arc<dyn TaskService>,
    messenger: Arc<dyn Messenger>,
    store: Arc<ChatStateStore>,
    config: HandlerConfig,
}

impl UpdateHandler {
    /// Create a new update handler
    pub fn new(
        tasks: Arc<dyn TaskService>,
        messenger: Arc<dyn Messenger>,
        store: Arc<ChatStateStore>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            tasks,
            messenger,
            store,
            config,
        }
    }

    /// Process one webhook update
    pub async fn handle_update(&self, update: &Update) -> Result<Outcome> {
        if let Some(callback) = &update.callback_query {
            return self.handle_callback_query(callback).await;
        }

        if let Some(message) = &update.message {
            let chat_id = message.chat.id;

            if !self.is_chat_allowed(chat_id) {
                warn!("Rejecting message from chat {}", chat_id);
                return Ok(Outcome::Forbidden);
            }

            if self.store.is_awaiting_task_text(chat_id) {
                self.handle_task_creation(chat_id, message.text.as_deref())
                    .await;
            } else {
                self.handle_regular_message(message).await;
            }
            return Ok(Outcome::Handled);
        }

        debug!("Ignoring update {:?} without message or callback", update.update_id);
        Ok(Outcome::Handled)
    }

    fn is_chat_allowed(&self, chat_id: i64) -> bool {
        self.config.allowed_chat_ids.contains(&chat_id)
    }

    /// Send a message, logging instead of failing
    async fn notify(&self, chat_id: i64, message: &OutgoingMessage) -> Option<i64> {
        match self.messenger.send_message(chat_id, message).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                error!("Failed to send message to chat {}: {}", chat_id, e);
                None
            }
        }
    }

    async fn notify_text(&self, chat_id: i64, text: &str) -> Option<i64> {
        self.notify(chat_id, &OutgoingMessage::text(text)).await
    }

    /// Handle an inline-button press
    async fn handle_callback_query(&self, callback: &CallbackQuery) -> Result<Outcome> {
        let chat_id = callback
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .ok_or_else(|| {
                TelegramError::MalformedUpdate(format!(
                    "callback query {} has no message",
                    callback.id
                ))
            })?;

        // Other chats get an acknowledgement and nothing else
        if !self.is_chat_allowed(chat_id) {
            warn!("Ignoring callback {} from chat {}", callback.id, chat_id);
            self.answer_callback(&callback.id).await;
            return Ok(Outcome::Handled);
        }

        let action = CallbackAction::from_data(callback.data.as_deref());
        info!("Callback {:?} from chat {}", action, chat_id);

        match action {
            CallbackAction::CreateTask => {
                self.store.set_awaiting_task_text(chat_id, true);
                self.notify_text(chat_id, CREATE_TASK_PROMPT).await;
            }
            CallbackAction::ViewTasks => {
                let result = self.tasks.get_all_tasks().await;
                self.display_tasks(chat_id, result, ALL_TASKS_HEADER, NO_TASKS)
                    .await;
            }
            CallbackAction::TodayTasks => {
                let result = self.tasks.get_today_tasks().await;
                self.display_tasks(chat_id, result, TODAY_TASKS_HEADER, NO_TASKS_TODAY)
                    .await;
            }
            CallbackAction::Unknown => {
                self.notify_text(chat_id, INVALID_OPTION).await;
            }
        }

        self.answer_callback(&callback.id).await;
        Ok(Outcome::Handled)
    }

    async fn answer_callback(&self, callback_query_id: &str) {
        if let Err(e) = self.messenger.answer_callback_query(callback_query_id).await {
            error!("Failed to answer callback query {}: {}", callback_query_id, e);
        }
    }

    async fn display_tasks(
        &self,
        chat_id: i64,
        result: taskbot_core::Result<Vec<Task>>,
        header: &str,
        empty_text: &str,
    ) {
        let text = match result {
            Ok(tasks) => {
                debug!("Rendering {} tasks for chat {}", tasks.len(), chat_id);
                render_task_list(header, empty_text, &tasks)
            }
            Err(e) => {
                error!("Failed to fetch tasks: {}", e);
                format!("❌ No se pudieron obtener las tareas: {}", e)
            }
        };

        self.notify_text(chat_id, &text).await;
    }

    /// Treat the message as the content of the task the chat was asked for
    async fn handle_task_creation(&self, chat_id: i64, text: Option<&str>) {
        let content = text.unwrap_or_default();

        let reply = match self.tasks.create_task(content, DEFAULT_PRIORITY).await {
            Ok(_) => format!("✅ Tarea \"{}\" añadida correctamente.", content),
            Err(e) => {
                error!("Error creating task: {}", e);
                format!("❌ Error al añadir la tarea: {}", e)
            }
        };
        self.notify_text(chat_id, &reply).await;

        self.store.set_awaiting_task_text(chat_id, false);
        self.notify(chat_id, &commands::menu_message()).await;
    }

    /// Run a regular message through the command interpreter
    async fn handle_regular_message(&self, message: &IncomingMessage) {
        let chat_id = message.chat.id;

        if self.config.replace_last_message {
            if let Some(previous) = self.store.take_last_message_id(chat_id) {
                if let Err(e) = self.messenger.delete_message(chat_id, previous).await {
                    warn!("Failed to delete message {} in chat {}: {}", previous, chat_id, e);
                }
            }
        }

        let reply = commands::handle_message(message.text.as_deref(), self.tasks.as_ref()).await;
        let sent = self.notify(chat_id, &reply.into_message()).await;

        if self.config.replace_last_message {
            if let Some(message_id) = sent {
                self.store.set_last_message_id(chat_id, message_id);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use taskbot_core::{Error, TaskDue};

    pub const ALLOWED: i64 = 7657527810;
    pub const STRANGER: i64 = 1;

    /// Calls made against the messaging API
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Message(i64, OutgoingMessage),
        Answer(String),
        Delete(i64, i64),
    }

    #[derive(Default)]
    pub struct FakeMessenger {
        pub calls: Mutex<Vec<Sent>>,
        next_id: AtomicI64,
        pub fail_deletes: bool,
    }

    impl FakeMessenger {
        pub fn calls(&self) -> Vec<Sent> {
            self.calls.lock().unwrap().clone()
        }

        pub fn texts(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Sent::Message(_, m) => Some(m.text),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> Result<i64> {
            self.calls
                .lock()
                .unwrap()
                .push(Sent::Message(chat_id, message.clone()));
            Ok(100 + self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Sent::Answer(callback_query_id.to_string()));
            Ok(())
        }

        async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Sent::Delete(chat_id, message_id));
            if self.fail_deletes {
                return Err(TelegramError::ApiError("message to delete not found".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeTasks {
        pub tasks: Vec<Task>,
        pub today: Vec<Task>,
        pub created: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    #[async_trait]
    impl TaskService for FakeTasks {
        async fn create_task(&self, raw_text: &str, _priority: u8) -> taskbot_core::Result<Task> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if raw_text.trim().is_empty() {
                return Err(Error::Validation(
                    "El contenido de la tarea no puede estar vacío".to_string(),
                ));
            }
            if self.fail {
                return Err(Error::Task("Error al crear la tarea: 503".to_string()));
            }
            self.created.lock().unwrap().push(raw_text.to_string());
            Ok(task(raw_text, None))
        }

        async fn get_all_tasks(&self) -> taskbot_core::Result<Vec<Task>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Task("Error al recuperar tareas: 503".to_string()));
            }
            Ok(self.tasks.clone())
        }

        async fn get_today_tasks(&self) -> taskbot_core::Result<Vec<Task>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Task("Error al recuperar tareas para hoy: 503".to_string()));
            }
            Ok(self.today.clone())
        }
    }

    pub fn task(content: &str, due: Option<&str>) -> Task {
        Task {
            id: content.to_string(),
            content: content.to_string(),
            priority: 4,
            due: due.map(|d| TaskDue {
                date: d.to_string(),
                string: None,
                datetime: None,
                is_recurring: false,
            }),
        }
    }

    pub fn handler_with(
        tasks: Arc<FakeTasks>,
        messenger: Arc<FakeMessenger>,
        replace_last_message: bool,
    ) -> UpdateHandler {
        UpdateHandler::new(
            tasks,
            messenger,
            Arc::new(ChatStateStore::new()),
            HandlerConfig {
                allowed_chat_ids: vec![ALLOWED],
                replace_last_message,
            },
        )
    }

    pub fn message_update(chat_id: i64, text: Option<&str>) -> Update {
        Update {
            update_id: Some(1),
            message: Some(IncomingMessage {
                message_id: 1,
                chat: crate::types::Chat { id: chat_id },
                text: text.map(str::to_string),
            }),
            callback_query: None,
        }
    }

    pub fn callback_update(chat_id: i64, data: &str) -> Update {
        Update {
            update_id: Some(2),
            message: None,
            callback_query: Some(CallbackQuery {
                id: "cb-1".to_string(),
                data: Some(data.to_string()),
                message: Some(IncomingMessage {
                    message_id: 50,
                    chat: crate::types::Chat { id: chat_id },
                    text: None,
                }),
            }),
        }
    }

    #[test]
    fn test_render_task_list() {
        let tasks = vec![task("buy milk", None), task("call mom", None)];
        assert_eq!(
            render_task_list("📋 Tus tareas:", "none", &tasks),
            "📋 Tus tareas:\n\n🔹 1. buy milk\n🔹 2. call mom"
        );
        assert_eq!(render_task_list("📋 Tus tareas:", "none", &[]), "none");
    }

    #[tokio::test]
    async fn test_disallowed_chat_is_forbidden_without_side_effects() {
        let tasks = Arc::new(FakeTasks::default());
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks.clone(), messenger.clone(), true);

        for update in [
            message_update(STRANGER, Some("/add buy milk")),
            message_update(STRANGER, Some("/menu")),
        ] {
            let outcome = handler.handle_update(&update).await.unwrap();
            assert_eq!(outcome, Outcome::Forbidden);
        }

        assert!(messenger.calls().is_empty());
        assert_eq!(tasks.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disallowed_callback_is_only_acknowledged() {
        let tasks = Arc::new(FakeTasks::default());
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks.clone(), messenger.clone(), true);

        for data in ["ver_tareas", "crear_tarea"] {
            let outcome = handler
                .handle_update(&callback_update(STRANGER, data))
                .await
                .unwrap();
            assert_eq!(outcome, Outcome::Handled);
        }

        assert_eq!(
            messenger.calls(),
            vec![Sent::Answer("cb-1".to_string()), Sent::Answer("cb-1".to_string())]
        );
        assert_eq!(tasks.calls.load(Ordering::SeqCst), 0);
        assert!(!handler.store.is_awaiting_task_text(STRANGER));
    }

    #[tokio::test]
    async fn test_menu_message() {
        let tasks = Arc::new(FakeTasks::default());
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks, messenger.clone(), false);

        let outcome = handler
            .handle_update(&message_update(ALLOWED, Some("/start")))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(
            messenger.calls(),
            vec![Sent::Message(ALLOWED, commands::menu_message())]
        );
    }

    #[tokio::test]
    async fn test_view_tasks_empty() {
        let tasks = Arc::new(FakeTasks::default());
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks, messenger.clone(), false);

        let outcome = handler
            .handle_update(&callback_update(ALLOWED, "ver_tareas"))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(
            messenger.calls(),
            vec![
                Sent::Message(ALLOWED, OutgoingMessage::text("🎉 No tienes tareas pendientes.")),
                Sent::Answer("cb-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_view_tasks_lists_all() {
        let tasks = Arc::new(FakeTasks {
            tasks: vec![task("a", Some("2024-01-01")), task("b", None)],
            ..Default::default()
        });
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks, messenger.clone(), false);

        handler
            .handle_update(&callback_update(ALLOWED, "ver_tareas"))
            .await
            .unwrap();

        assert_eq!(messenger.texts(), vec!["📋 Tus tareas:\n\n🔹 1. a\n🔹 2. b"]);
    }

    #[tokio::test]
    async fn test_today_tasks() {
        let tasks = Arc::new(FakeTasks {
            today: vec![task("today's task", Some("2024-01-01"))],
            ..Default::default()
        });
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks, messenger.clone(), false);

        handler
            .handle_update(&callback_update(ALLOWED, "ver_tareas_hoy"))
            .await
            .unwrap();

        assert_eq!(
            messenger.texts(),
            vec!["📋 Tus tareas para hoy:\n\n🔹 1. today's task"]
        );

        let empty = Arc::new(FakeMessenger::default());
        let handler = handler_with(Arc::new(FakeTasks::default()), empty.clone(), false);
        handler
            .handle_update(&callback_update(ALLOWED, "ver_tareas_hoy"))
            .await
            .unwrap();
        assert_eq!(empty.texts(), vec!["🎉 No tienes tareas para hoy."]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_to_chat() {
        let tasks = Arc::new(FakeTasks {
            fail: true,
            ..Default::default()
        });
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks, messenger.clone(), false);

        let outcome = handler
            .handle_update(&callback_update(ALLOWED, "ver_tareas"))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(
            messenger.texts(),
            vec!["❌ No se pudieron obtener las tareas: Error al recuperar tareas: 503"]
        );
        assert!(messenger.calls().contains(&Sent::Answer("cb-1".to_string())));
    }

    #[tokio::test]
    async fn test_unknown_callback() {
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(Arc::new(FakeTasks::default()), messenger.clone(), false);

        let outcome = handler
            .handle_update(&callback_update(ALLOWED, "borrar_todo"))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(
            messenger.calls(),
            vec![
                Sent::Message(ALLOWED, OutgoingMessage::text("❌ Opción no válida.")),
                Sent::Answer("cb-1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_task_flow() {
        let tasks = Arc::new(FakeTasks::default());
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks.clone(), messenger.clone(), false);

        handler
            .handle_update(&callback_update(ALLOWED, "crear_tarea"))
            .await
            .unwrap();
        assert!(handler.store.is_awaiting_task_text(ALLOWED));

        handler
            .handle_update(&message_update(ALLOWED, Some("/menu is not a command here")))
            .await
            .unwrap();

        assert!(!handler.store.is_awaiting_task_text(ALLOWED));
        assert_eq!(
            tasks.created.lock().unwrap().as_slice(),
            &["/menu is not a command here".to_string()]
        );
        assert_eq!(
            messenger.calls(),
            vec![
                Sent::Message(
                    ALLOWED,
                    OutgoingMessage::text("📝 Por favor, proporciona el contenido de la tarea.")
                ),
                Sent::Answer("cb-1".to_string()),
                Sent::Message(
                    ALLOWED,
                    OutgoingMessage::text("✅ Tarea \"/menu is not a command here\" añadida correctamente.")
                ),
                Sent::Message(ALLOWED, commands::menu_message()),
            ]
        );

        // Flag cleared: the next message goes to the interpreter
        handler
            .handle_update(&message_update(ALLOWED, Some("hola")))
            .await
            .unwrap();
        assert_eq!(
            messenger.texts().last().map(String::as_str),
            Some(commands::HELP_REPLY)
        );
    }

    #[tokio::test]
    async fn test_create_task_failure_still_clears_flag() {
        let tasks = Arc::new(FakeTasks::default());
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(tasks, messenger.clone(), false);
        handler.store.set_awaiting_task_text(ALLOWED, true);

        handler
            .handle_update(&message_update(ALLOWED, None))
            .await
            .unwrap();

        assert!(!handler.store.is_awaiting_task_text(ALLOWED));
        let texts = messenger.texts();
        assert_eq!(
            texts[0],
            "❌ Error al añadir la tarea: El contenido de la tarea no puede estar vacío"
        );
        assert_eq!(texts[1], commands::MENU_PROMPT);
    }

    #[tokio::test]
    async fn test_replace_last_message() {
        let messenger = Arc::new(FakeMessenger {
            fail_deletes: true,
            ..Default::default()
        });
        let handler = handler_with(Arc::new(FakeTasks::default()), messenger.clone(), true);

        handler
            .handle_update(&message_update(ALLOWED, Some("hola")))
            .await
            .unwrap();
        handler
            .handle_update(&message_update(ALLOWED, Some("/menu")))
            .await
            .unwrap();

        let calls = messenger.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], Sent::Message(ALLOWED, _)));
        // Failed delete is swallowed and the reply still goes out
        assert_eq!(calls[1], Sent::Delete(ALLOWED, 100));
        assert_eq!(calls[2], Sent::Message(ALLOWED, commands::menu_message()));
        assert_eq!(handler.store.take_last_message_id(ALLOWED), Some(101));
    }

    #[tokio::test]
    async fn test_no_delete_when_replacement_disabled() {
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(Arc::new(FakeTasks::default()), messenger.clone(), false);

        for _ in 0..2 {
            handler
                .handle_update(&message_update(ALLOWED, Some("hola")))
                .await
                .unwrap();
        }

        assert!(
            messenger
                .calls()
                .iter()
                .all(|c| matches!(c, Sent::Message(..)))
        );
        assert_eq!(handler.store.take_last_message_id(ALLOWED), None);
    }

    #[tokio::test]
    async fn test_callback_without_message_is_an_error() {
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(Arc::new(FakeTasks::default()), messenger.clone(), false);
        let mut update = callback_update(ALLOWED, "ver_tareas");
        if let Some(cb) = update.callback_query.as_mut() {
            cb.message = None;
        }

        let result = handler.handle_update(&update).await;
        assert!(matches!(result, Err(TelegramError::MalformedUpdate(_))));
        assert!(messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_update_is_handled() {
        let messenger = Arc::new(FakeMessenger::default());
        let handler = handler_with(Arc::new(FakeTasks::default()), messenger.clone(), false);

        let outcome = handler.handle_update(&Update::default()).await.unwrap();
        assert_eq!(outcome, Outcome::Handled);
        assert!(messenger.calls().is_empty());
    }
}
