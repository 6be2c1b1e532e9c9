//! Repository for the `webhooks` table.

use sqlx::PgPool;

use crate::models::webhook::{CreateWebhook, Webhook};

/// Column list for `webhooks` queries.
const COLUMNS: &str = "id, url, event_types, is_enabled, created_at";

/// Wildcard subscription matching every add-on log event.
pub const WILDCARD_EVENT: &str = "addon_log.*";

/// Provides subscription lookups for webhook dispatch.
pub struct WebhookRepo;

impl WebhookRepo {
    /// Create a new webhook subscription.
    pub async fn create(pool: &PgPool, input: &CreateWebhook) -> Result<Webhook, sqlx::Error> {
        let query = format!(
            "INSERT INTO webhooks (url, event_types, is_enabled) \
             VALUES ($1, $2, COALESCE($3, TRUE)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Webhook>(&query)
            .bind(&input.url)
            .bind(&input.event_types)
            .bind(input.is_enabled)
            .fetch_one(pool)
            .await
    }

    /// Enabled webhooks subscribed to `event_name` or the wildcard.
    pub async fn list_for_event(
        pool: &PgPool,
        event_name: &str,
    ) -> Result<Vec<Webhook>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhooks \
             WHERE is_enabled = TRUE AND ($1 = ANY(event_types) OR $2 = ANY(event_types)) \
             ORDER BY id"
        );
        sqlx::query_as::<_, Webhook>(&query)
            .bind(event_name)
            .bind(WILDCARD_EVENT)
            .fetch_all(pool)
            .await
    }
}
