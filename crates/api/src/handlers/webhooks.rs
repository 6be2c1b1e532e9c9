//! Webhook event catalogue and subscriptions.

use addonlog_core::error::CoreError;
use addonlog_core::level::LogLevel;
use addonlog_db::models::webhook::CreateWebhook;
use addonlog_db::repositories::webhook_repo::WILDCARD_EVENT;
use addonlog_db::repositories::WebhookRepo;
use addonlog_logger::webhook_events;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/webhooks/events
///
/// The `addon_log.<level>` events a webhook can subscribe to.
pub async fn list_events() -> impl IntoResponse {
    Json(DataResponse {
        data: webhook_events(),
    })
}

/// POST /admin/webhooks
///
/// Subscribe a URL to add-on log events. `addon_log.*` matches every level.
pub async fn create_webhook(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateWebhook>,
) -> AppResult<impl IntoResponse> {
    validate_webhook(&input)?;

    let webhook = WebhookRepo::create(&state.pool, &input).await?;
    tracing::info!(
        webhook_id = webhook.id,
        user_id = admin.user_id,
        events = ?webhook.event_types,
        "Webhook subscribed",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: webhook })))
}

fn validate_webhook(input: &CreateWebhook) -> AppResult<()> {
    let url = input.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::Core(CoreError::Validation(
            "Webhook url must be an http(s) URL".to_string(),
        )));
    }
    if input.event_types.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one event type is required".to_string(),
        )));
    }

    let known: Vec<String> = LogLevel::ALL.iter().map(|l| l.event_name()).collect();
    if let Some(unknown) = input
        .event_types
        .iter()
        .find(|e| e.as_str() != WILDCARD_EVENT && !known.contains(e))
    {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown event type '{unknown}'"
        ))));
    }
    Ok(())
}
