use addonlog_core::addon::HOST_PLATFORM_ADDON_ID;
use addonlog_db::repositories::AddonRepo;
use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when either check below fails.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// The host platform add-on is registered. Log writes fall back to it,
    /// so without it entries from unknown add-ons are lost.
    pub host_addon_installed: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = addonlog_db::health_check(&state.pool).await.is_ok();
    let host_addon_installed = db_healthy
        && match AddonRepo::find(&state.pool, HOST_PLATFORM_ADDON_ID).await {
            Ok(addon) => addon.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Health check could not load the host add-on");
                false
            }
        };

    let status = if db_healthy && host_addon_installed {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        host_addon_installed,
    })
}

/// Health check at the root, outside `/api/v1`, with no authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
