pub mod addon_logs;
pub mod health;
pub mod jobs;
pub mod user_fields;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// The admin route tree, mounted at `/api/v1/admin` behind the admin role
/// check.
///
/// ```text
/// /addon-logs                         add-on summaries
/// /addon-logs/alerts                  high-priority counts
/// /addon-logs/view?addon_id=          one add-on's logs, filtered and paged
/// /addon-logs/logs/{id}               single entry
/// /addon-logs/logs/{id}/delete        confirm (GET), delete (POST)
/// /addon-logs/clear?addon_id=         confirm (GET), clear (POST)
///
/// /user-fields                        create (POST)
/// /user-fields/{field_id}             remove (DELETE)
/// /user-fields/{field_id}/choices     replace choices (PUT)
///
/// /jobs                               list background jobs
/// /jobs/{id}/cancel                   cancel (POST)
///
/// /webhooks                           subscribe (POST)
/// /webhooks/events                    subscribable event types
/// ```
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .nest("/addon-logs", addon_logs::router())
        .nest("/user-fields", user_fields::router())
        .nest("/jobs", jobs::router())
        .nest("/webhooks", webhooks::router())
}
