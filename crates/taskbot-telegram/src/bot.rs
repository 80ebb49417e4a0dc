//! Telegram bot implementation
//!
//! Wires the API client, chat state and dispatcher together and serves the
//! webhook.

use std::sync::Arc;

use tracing::{info, warn};

use taskbot_core::{TaskService, TelegramConfig};

use crate::api::TelegramApiClient;
use crate::error::{Result, TelegramError};
use crate::handler::{HandlerConfig, UpdateHandler};
use crate::session::ChatStateStore;
use crate::webhook::{WebhookState, create_webhook_router};

/// Telegram bot backed by a task service
pub struct TelegramBot {
    config: TelegramConfig,
    api_client: TelegramApiClient,
    tasks: Arc<dyn TaskService>,
    store: Arc<ChatStateStore>,
}

impl TelegramBot {
    /// Create a new Telegram bot
    pub fn new(config: TelegramConfig, tasks: Arc<dyn TaskService>) -> Result<Self> {
        if config.allowed_chat_ids.is_empty() {
            return Err(TelegramError::Config("No allowed chat ids configured".to_string()));
        }

        let api_client = TelegramApiClient::new(&config.token, &config.api_base)?;

        Ok(Self {
            config,
            api_client,
            tasks,
            store: Arc::new(ChatStateStore::new()),
        })
    }

    fn handler(&self) -> Arc<UpdateHandler> {
        Arc::new(UpdateHandler::new(
            self.tasks.clone(),
            Arc::new(self.api_client.clone()),
            self.store.clone(),
            HandlerConfig {
                allowed_chat_ids: self.config.allowed_chat_ids.clone(),
                replace_last_message: self.config.replace_last_message,
            },
        ))
    }

    /// Build the webhook router without binding a socket
    pub fn router(&self) -> axum::Router {
        create_webhook_router(WebhookState {
            handler: self.handler(),
        })
    }

    /// Register `<webhook_url>/webhook` with Telegram if a public URL is configured
    pub async fn register_webhook(&self) -> Result<()> {
        let Some(base) = &self.config.webhook_url else {
            info!("WEBHOOK_URL not set; assuming the webhook is registered externally");
            return Ok(());
        };

        let url = format!("{}/webhook", base.trim_end_matches('/'));
        self.api_client.set_webhook(&url).await
    }

    /// Serve the webhook until `shutdown` fires
    pub async fn run(&self, port: u16, mut shutdown: tokio::sync::broadcast::Receiver<()>) -> Result<()> {
        if let Err(e) = self.register_webhook().await {
            warn!("Webhook registration failed: {}", e);
        }

        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TelegramError::Webhook(e.to_string()))?;

        info!("Telegram webhook server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("Telegram bot shutting down");
            })
            .await
            .map_err(|e| TelegramError::Webhook(e.to_string()))?;

        Ok(())
    }
}
