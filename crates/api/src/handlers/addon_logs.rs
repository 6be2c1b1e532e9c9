//! Handlers for the add-on log browser.
//!
//! Every endpoint requires the admin role. Per-add-on endpoints additionally
//! check the add-on's log permission and answer 403 when it is missing.

use addonlog_core::error::CoreError;
use addonlog_core::log_filter::{clamp_per_page, parse_date_bound, split_tokens, LogFilter};
use addonlog_core::types::DbId;
use addonlog_db::models::addon::Addon;
use addonlog_db::models::addon_log::{AddonLog, AddonLogSummary, HighPriorityCounts, LogFilterBits};
use addonlog_db::repositories::{AddonLogRepo, AddonRepo};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::permissions::AdminViewer;
use crate::query::AddonIdParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Base path of the log browser, used to build redirect targets.
const BASE_PATH: &str = "/api/v1/admin/addon-logs";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters of the per-add-on log view. `type` and `user_id` are
/// comma-separated lists.
#[derive(Debug, Deserialize)]
pub struct ViewLogsParams {
    pub addon_id: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertSummary {
    pub has_alerts: bool,
    pub counts: Option<HighPriorityCounts>,
}

#[derive(Debug, Serialize)]
pub struct AddonLogPage {
    pub addon_id: String,
    /// `None` when the add-on is no longer installed.
    pub addon: Option<Addon>,
    pub logs: Vec<AddonLog>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub filter_bits: LogFilterBits,
    pub filters_applied: bool,
}

#[derive(Debug, Serialize)]
pub struct LogDetail {
    pub log: AddonLog,
    /// Details as indented JSON, empty when the entry has none.
    pub formatted_details: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteConfirmation {
    pub log: AddonLog,
    pub formatted_details: String,
    pub confirm_url: String,
}

#[derive(Debug, Serialize)]
pub struct ClearConfirmation {
    pub addon_id: String,
    pub addon: Option<Addon>,
    pub log_count: i64,
    pub confirm_url: String,
}

/// Result of a destructive action and where the client should go next.
#[derive(Debug, Serialize)]
pub struct RemovalResult {
    pub deleted: u64,
    pub redirect: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn view_url(addon_id: &str) -> String {
    format!("{BASE_PATH}/view?addon_id={}", encode_query_value(addon_id))
}

/// Percent-encode the characters add-on ids may contain that are not safe
/// in a query value.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn required_addon_id(raw: Option<String>) -> AppResult<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(AppError::NoAddonSelected)
}

fn format_details(log: &AddonLog) -> AppResult<String> {
    match &log.details {
        Some(details) => serde_json::to_string_pretty(details)
            .map_err(AppError::encode("log details")),
        None => Ok(String::new()),
    }
}

async fn find_log(state: &AppState, id: DbId) -> AppResult<AddonLog> {
    AddonLogRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("AddonLog", id)))
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// GET /admin/addon-logs
///
/// One card per add-on with logs, restricted to add-ons the viewer may see.
pub async fn list_addons(
    State(state): State<AppState>,
    viewer: AdminViewer,
) -> AppResult<impl IntoResponse> {
    let summaries: Vec<AddonLogSummary> = AddonLogRepo::addon_summaries(&state.pool)
        .await?
        .into_iter()
        .filter(|s| viewer.permissions.can_view_addon_logs(&s.addon_id))
        .collect();

    Ok(Json(DataResponse { data: summaries }))
}

/// GET /admin/addon-logs/alerts
///
/// High-priority counts for the dashboard indicator.
pub async fn alerts(
    State(state): State<AppState>,
    viewer: AdminViewer,
) -> AppResult<impl IntoResponse> {
    viewer.require_view_logs()?;

    let counts = AddonLogRepo::high_priority_counts(&state.pool).await?;

    Ok(Json(DataResponse {
        data: AlertSummary {
            has_alerts: counts.is_some(),
            counts,
        },
    }))
}

// ---------------------------------------------------------------------------
// Per-add-on view
// ---------------------------------------------------------------------------

/// GET /admin/addon-logs/view
///
/// One page of an add-on's logs, newest first, with the filter options.
pub async fn view_addon(
    State(state): State<AppState>,
    viewer: AdminViewer,
    Query(params): Query<ViewLogsParams>,
) -> AppResult<impl IntoResponse> {
    let addon_id = required_addon_id(params.addon_id)?;
    viewer.require_addon(&addon_id)?;

    let filter = LogFilter {
        start_date: parse_date_bound(params.start_date.as_deref())?,
        end_date: parse_date_bound(params.end_date.as_deref())?,
        types: split_tokens(params.log_type.as_deref()),
        user_ids: split_tokens(params.user_id.as_deref()),
    };
    let page = params.page.unwrap_or(1).max(1);
    let per_page = clamp_per_page(params.per_page);

    let logs = AddonLogRepo::list_for_addon(&state.pool, &addon_id, &filter, page, per_page).await?;
    let total = AddonLogRepo::count_for_addon(&state.pool, &addon_id, &filter).await?;
    let filter_bits = AddonLogRepo::filter_bits(&state.pool, &addon_id).await?;
    let addon = AddonRepo::find(&state.pool, &addon_id).await?;

    tracing::debug!(
        addon_id = %addon_id,
        page,
        per_page,
        total,
        filters_applied = filter.has_filters(),
        user_id = viewer.user.user_id,
        "Add-on log filtering results"
    );

    Ok(Json(DataResponse {
        data: AddonLogPage {
            addon_id,
            addon,
            logs,
            total,
            page,
            per_page,
            filter_bits,
            filters_applied: filter.has_filters(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Single entry
// ---------------------------------------------------------------------------

/// GET /admin/addon-logs/logs/{id}
pub async fn show_log(
    State(state): State<AppState>,
    viewer: AdminViewer,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let log = find_log(&state, id).await?;
    viewer.require_addon(&log.addon_id)?;

    let formatted_details = format_details(&log)?;
    Ok(Json(DataResponse {
        data: LogDetail {
            log,
            formatted_details,
        },
    }))
}

/// GET /admin/addon-logs/logs/{id}/delete
///
/// What would be deleted, for the confirmation prompt.
pub async fn confirm_delete_log(
    State(state): State<AppState>,
    viewer: AdminViewer,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let log = find_log(&state, id).await?;
    viewer.require_addon(&log.addon_id)?;

    let formatted_details = format_details(&log)?;
    Ok(Json(DataResponse {
        data: DeleteConfirmation {
            confirm_url: format!("{BASE_PATH}/logs/{id}/delete"),
            log,
            formatted_details,
        },
    }))
}

/// POST /admin/addon-logs/logs/{id}/delete
pub async fn delete_log(
    State(state): State<AppState>,
    viewer: AdminViewer,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let log = find_log(&state, id).await?;
    viewer.require_addon(&log.addon_id)?;

    let deleted = AddonLogRepo::delete(&state.pool, id).await?;
    tracing::info!(
        log_id = id,
        addon_id = %log.addon_id,
        user_id = viewer.user.user_id,
        "Add-on log deleted"
    );

    Ok(Json(DataResponse {
        data: RemovalResult {
            deleted: u64::from(deleted),
            redirect: view_url(&log.addon_id),
        },
    }))
}

// ---------------------------------------------------------------------------
// Clear
// ---------------------------------------------------------------------------

/// GET /admin/addon-logs/clear?addon_id=
pub async fn confirm_clear(
    State(state): State<AppState>,
    viewer: AdminViewer,
    Query(params): Query<AddonIdParams>,
) -> AppResult<impl IntoResponse> {
    let addon_id = required_addon_id(params.addon_id)?;
    viewer.require_addon(&addon_id)?;

    let addon = AddonRepo::find(&state.pool, &addon_id).await?;
    let log_count =
        AddonLogRepo::count_for_addon(&state.pool, &addon_id, &LogFilter::default()).await?;

    Ok(Json(DataResponse {
        data: ClearConfirmation {
            confirm_url: format!("{BASE_PATH}/clear?addon_id={}", encode_query_value(&addon_id)),
            addon_id,
            addon,
            log_count,
        },
    }))
}

/// POST /admin/addon-logs/clear?addon_id=
pub async fn clear(
    State(state): State<AppState>,
    viewer: AdminViewer,
    Query(params): Query<AddonIdParams>,
) -> AppResult<impl IntoResponse> {
    let addon_id = required_addon_id(params.addon_id)?;
    viewer.require_addon(&addon_id)?;

    let deleted = AddonLogRepo::clear_for_addon(&state.pool, &addon_id).await?;
    tracing::info!(
        addon_id = %addon_id,
        deleted,
        user_id = viewer.user.user_id,
        "Add-on logs cleared"
    );

    Ok(Json(DataResponse {
        data: RemovalResult {
            deleted,
            redirect: view_url(&addon_id),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_targets_encode_the_addon_id() {
        assert_eq!(
            view_url("Vendor/Addon"),
            "/api/v1/admin/addon-logs/view?addon_id=Vendor%2FAddon"
        );
        assert_eq!(view_url("XF"), "/api/v1/admin/addon-logs/view?addon_id=XF");
    }

    #[test]
    fn blank_addon_id_is_not_selected() {
        assert!(matches!(required_addon_id(None), Err(AppError::NoAddonSelected)));
        assert!(matches!(
            required_addon_id(Some("  ".into())),
            Err(AppError::NoAddonSelected)
        ));
        assert_eq!(required_addon_id(Some(" XF ".into())).unwrap(), "XF");
    }
}
