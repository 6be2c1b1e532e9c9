use axum::routing::{get, post};
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/admin/webhooks`.
///
/// ```text
/// POST   /          -> create_webhook
/// GET    /events    -> list_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(webhooks::create_webhook))
        .route("/events", get(webhooks::list_events))
}
