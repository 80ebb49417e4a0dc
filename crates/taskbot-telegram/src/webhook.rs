//! Webhook server for the Telegram bot
//!
//! Receives updates pushed by Telegram and hands them to the dispatcher.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::TelegramError;
use crate::handler::{Outcome, UpdateHandler};
use crate::types::Update;

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub handler: Arc<UpdateHandler>,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn health() -> &'static str {
    "OK"
}

/// Handle incoming webhook
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook body: {:?}", e);
        StatusCode::BAD_REQUEST
    })?;

    // Valid JSON that is not an update is a handler failure, not a bad request
    let result = match serde_json::from_value::<Update>(value) {
        Ok(update) => state.handler.handle_update(&update).await,
        Err(e) => Err(TelegramError::MalformedUpdate(e.to_string())),
    };

    match result {
        Ok(Outcome::Handled) => Ok(StatusCode::OK),
        Ok(Outcome::Forbidden) => Err(StatusCode::FORBIDDEN),
        Err(e) => {
            error!("Error handling update: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
