//! Per-chat conversation state
//!
//! Held in memory for the life of the process. Entries are never evicted,
//! and there is no per-chat ordering between overlapping requests.

use dashmap::DashMap;

/// State tracked for one chat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    /// The next message from this chat is the content of a new task
    pub awaiting_task_text: bool,
    /// Id of the last message the bot sent to this chat
    pub last_message_id: Option<i64>,
}

/// In-memory chat state store keyed by chat id
#[derive(Debug, Default)]
pub struct ChatStateStore {
    chats: DashMap<i64, ChatState>,
}

impl ChatStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_task_text(&self, chat_id: i64) -> bool {
        self.chats
            .get(&chat_id)
            .map(|s| s.awaiting_task_text)
            .unwrap_or(false)
    }

    pub fn set_awaiting_task_text(&self, chat_id: i64, awaiting: bool) {
        self.chats.entry(chat_id).or_default().awaiting_task_text = awaiting;
    }

    /// Remove and return the last recorded bot message id
    pub fn take_last_message_id(&self, chat_id: i64) -> Option<i64> {
        self.chats
            .get_mut(&chat_id)
            .and_then(|mut s| s.last_message_id.take())
    }

    pub fn set_last_message_id(&self, chat_id: i64, message_id: i64) {
        self.chats.entry(chat_id).or_default().last_message_id = Some(message_id);
    }
}
