//! Handlers for custom user field administration.
//!
//! All endpoints require the admin role.

use addonlog_core::addon::LIBRARY_ADDON_ID;
use addonlog_core::choices::Choices;
use addonlog_core::error::CoreError;
use addonlog_db::models::user_field::CreateUserField;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::user_fields::{create_user_field, remove_user_field, update_choices_if_changed};

#[derive(Debug, Deserialize)]
pub struct UpdateChoicesRequest {
    pub choices: Choices,
}

#[derive(Debug, Serialize)]
pub struct RemoveFieldResponse {
    pub field_id: String,
    /// `false` when there was nothing to remove.
    pub removed: bool,
}

/// PUT /admin/user-fields/{field_id}/choices
///
/// Replace the field's choices and queue a rebuild of stored values when
/// they actually changed.
pub async fn update_choices(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(field_id): Path<String>,
    Json(body): Json<UpdateChoicesRequest>,
) -> AppResult<impl IntoResponse> {
    let logger = state
        .logger(Some(admin.user_id))
        .with_default_addon(LIBRARY_ADDON_ID);

    let outcome = update_choices_if_changed(&state.pool, &logger, &field_id, body.choices).await?;
    if outcome.missing_field {
        return Err(AppError::Core(CoreError::not_found("UserField", &field_id)));
    }

    Ok(Json(DataResponse { data: outcome }))
}

/// POST /admin/user-fields
pub async fn create_field(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserField>,
) -> AppResult<impl IntoResponse> {
    let logger = state
        .logger(Some(admin.user_id))
        .with_default_addon(LIBRARY_ADDON_ID);

    let field = create_user_field(&state.pool, &logger, input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: field })))
}

/// DELETE /admin/user-fields/{field_id}
///
/// Succeeds whether or not the field existed.
pub async fn remove_field(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let removed = remove_user_field(&state.pool, &field_id).await?;

    Ok(Json(DataResponse {
        data: RemoveFieldResponse { field_id, removed },
    }))
}
