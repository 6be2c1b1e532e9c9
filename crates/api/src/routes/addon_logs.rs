//! Route definitions for the add-on log browser.
//!
//! All endpoints require the admin role; per-add-on endpoints also check the
//! add-on's log permission.

use axum::routing::get;
use axum::Router;

use crate::handlers::addon_logs;
use crate::state::AppState;

/// Routes mounted at `/admin/addon-logs`.
///
/// ```text
/// GET    /                    -> list_addons
/// GET    /alerts              -> alerts
/// GET    /view                -> view_addon
/// GET    /logs/{id}           -> show_log
/// GET    /logs/{id}/delete    -> confirm_delete_log
/// POST   /logs/{id}/delete    -> delete_log
/// GET    /clear               -> confirm_clear
/// POST   /clear               -> clear
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(addon_logs::list_addons))
        .route("/alerts", get(addon_logs::alerts))
        .route("/view", get(addon_logs::view_addon))
        .route("/logs/{id}", get(addon_logs::show_log))
        .route(
            "/logs/{id}/delete",
            get(addon_logs::confirm_delete_log).post(addon_logs::delete_log),
        )
        .route(
            "/clear",
            get(addon_logs::confirm_clear).post(addon_logs::clear),
        )
}
