//! Telegram Bot API client
//!
//! Communicates with the Bot API over plain HTTPS; only the calls the bot
//! needs are wrapped.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::error::{Result, TelegramError};
use crate::types::*;

/// Outbound messaging operations used by the dispatcher
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a message, returning the id Telegram assigned to it
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> Result<i64>;

    /// Acknowledge a callback query so the client stops its loading indicator
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()>;

    /// Delete a message previously sent by the bot
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;
}

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramApiClient {
    client: Client,
    base_url: String,
}

impl TelegramApiClient {
    /// Create a new client for `token` against `api_base` (e.g. `https://api.telegram.org`)
    pub fn new(token: &str, api_base: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(TelegramError::Config("Bot token not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(TelegramError::HttpError)?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope
    async fn call<B, T>(&self, api_method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, api_method);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(TelegramError::HttpError)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("{} failed: {} - {}", api_method, status, error_text);
            return Err(TelegramError::ApiError(format!("{}: {}", status, error_text)));
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::ParseError(e.to_string()))?;

        if !envelope.ok {
            let description = envelope.description.unwrap_or_default();
            error!("{} rejected: {}", api_method, description);
            return Err(TelegramError::ApiError(description));
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::ParseError(format!("{} returned no result", api_method)))
    }

    /// Register the webhook URL with Telegram
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        debug!("Registering webhook: {}", url);
        let _: bool = self.call("setWebhook", &SetWebhookRequest { url }).await?;
        info!("Webhook registered: {}", url);
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramApiClient {
    async fn send_message(&self, chat_id: i64, message: &OutgoingMessage) -> Result<i64> {
        debug!("Sending message to chat {}", chat_id);
        let sent: SentMessage = self
            .call("sendMessage", &SendMessageRequest { chat_id, message })
            .await?;
        Ok(sent.message_id)
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        debug!("Answering callback query {}", callback_query_id);
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQueryRequest { callback_query_id },
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        debug!("Deleting message {} in chat {}", message_id, chat_id);
        let _: bool = self
            .call("deleteMessage", &DeleteMessageRequest { chat_id, message_id })
            .await?;
        Ok(())
    }
}
