//! Errors returned by the admin API handlers.
//!
//! Every error renders as `{ "error": ..., "code": ... }`. A missing add-on
//! permission also names the permission id and the add-on, so the admin
//! screens can tell the user what to ask for.

use addonlog_core::error::CoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The token is valid but its role is not `admin`.
    #[error("Admin role required")]
    AdminRequired,

    /// An admin without `permission`. `addon_id` is set when the check
    /// guarded one add-on's logs.
    #[error("Missing permission '{permission}'")]
    PermissionDenied {
        permission: String,
        addon_id: Option<String>,
    },

    /// A log view was requested without an `addon_id`.
    #[error("No add-on selected")]
    NoAddonSelected,

    /// Log details or job state could not be turned into JSON.
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn encode(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| AppError::Encode { what, source }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    addon_id: Option<String>,
}

impl ErrorBody {
    fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            permission: None,
            addon_id: None,
        }
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", "An internal error occurred")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Core(core) => core_error_body(core),
            AppError::Database(err) => classify_sqlx_error(&err),
            AppError::AdminRequired => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("ADMIN_REQUIRED", "Admin role required"),
            ),
            AppError::PermissionDenied {
                permission,
                addon_id,
            } => {
                let message = match &addon_id {
                    Some(addon_id) => format!("No permission to view logs of '{addon_id}'"),
                    None => format!("The '{permission}' permission is required"),
                };
                let body = ErrorBody {
                    permission: Some(permission),
                    addon_id,
                    ..ErrorBody::new("PERMISSION_DENIED", message)
                };
                (StatusCode::FORBIDDEN, body)
            }
            AppError::NoAddonSelected => (
                StatusCode::NOT_FOUND,
                ErrorBody::new("ADDON_NOT_SELECTED", "No add-on selected"),
            ),
            AppError::Encode { what, source } => {
                tracing::error!(error = %source, what, "Failed to encode JSON");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
            }
        };

        (status, Json(body)).into_response()
    }
}

fn core_error_body(err: CoreError) -> (StatusCode, ErrorBody) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", format!("{entity} with id {id} not found")),
        ),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("VALIDATION_ERROR", msg),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
        CoreError::Unauthorized(msg) => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("UNAUTHORIZED", msg),
        ),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorBody::new("FORBIDDEN", msg)),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
        }
    }
}

/// Unique constraints an admin can trip, with the message shown for each.
const CONFLICT_MESSAGES: &[(&str, &str)] = &[
    ("user_fields_pkey", "User field already exists"),
    ("uq_users_username", "Username is already taken"),
    (
        "uq_background_jobs_unique_key",
        "A background job with this key already exists",
    ),
];

/// `RowNotFound` is a 404 and a known unique violation a 409. Anything else
/// is logged and hidden behind a 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    if let sqlx::Error::RowNotFound = err {
        return (
            StatusCode::NOT_FOUND,
            ErrorBody::new("NOT_FOUND", "Resource not found"),
        );
    }

    let conflict = match err {
        // 23505: unique_violation
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => db_err
            .constraint()
            .and_then(|c| CONFLICT_MESSAGES.iter().find(|(name, _)| *name == c)),
        _ => None,
    };
    if let Some((_, message)) = conflict {
        return (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", *message));
    }

    tracing::error!(error = %err, "Database error");
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
}
