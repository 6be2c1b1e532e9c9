use axum::routing::{delete, post, put};
use axum::Router;

use crate::handlers::user_fields;
use crate::state::AppState;

/// Routes mounted at `/admin/user-fields`.
///
/// ```text
/// POST   /                       -> create_field
/// DELETE /{field_id}             -> remove_field
/// PUT    /{field_id}/choices     -> update_choices
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(user_fields::create_field))
        .route("/{field_id}", delete(user_fields::remove_field))
        .route("/{field_id}/choices", put(user_fields::update_choices))
}
