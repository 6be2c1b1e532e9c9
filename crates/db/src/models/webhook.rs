//! Outbound webhook subscriptions.

use addonlog_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `webhooks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Webhook {
    pub id: DbId,
    pub url: String,
    pub event_types: Vec<String>,
    pub is_enabled: bool,
    pub created_at: Timestamp,
}

/// DTO for subscribing a URL to events.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebhook {
    pub url: String,
    pub event_types: Vec<String>,
    pub is_enabled: Option<bool>,
}
