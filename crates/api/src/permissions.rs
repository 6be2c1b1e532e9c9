//! Admin permission loading and the log-viewing checks built on it.

use addonlog_core::permission::{permission_id_for_addon, AdminPermissions, VIEW_LOGS_PERMISSION};
use addonlog_core::types::DbId;
use addonlog_db::repositories::{AdminPermissionRepo, UserRepo};
use addonlog_db::DbPool;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, RequireAdmin};
use crate::state::AppState;

/// Load the permission set of `user_id`.
///
/// A token whose user no longer exists gets no grants and no super admin
/// flag; unregistered add-on permissions still fail open for it.
pub async fn load_admin_permissions(
    pool: &DbPool,
    user_id: DbId,
) -> Result<AdminPermissions, sqlx::Error> {
    let is_super_admin = UserRepo::find_by_id(pool, user_id)
        .await?
        .is_some_and(|user| user.is_super_admin);
    let registered = AdminPermissionRepo::registered_ids(pool).await?;
    let granted = AdminPermissionRepo::granted_ids(pool, user_id).await?;

    Ok(AdminPermissions {
        is_super_admin,
        registered,
        granted,
    })
}

/// An admin together with their loaded permissions.
pub struct AdminViewer {
    pub user: AuthUser,
    pub permissions: AdminPermissions,
}

impl AdminViewer {
    /// Reject unless this admin may view `addon_id`'s logs.
    pub fn require_addon(&self, addon_id: &str) -> AppResult<()> {
        if self.permissions.can_view_addon_logs(addon_id) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied {
                permission: permission_id_for_addon(addon_id),
                addon_id: Some(addon_id.to_string()),
            })
        }
    }

    /// Reject unless this admin holds `viewLogs` or is a super admin.
    pub fn require_view_logs(&self) -> AppResult<()> {
        if self.permissions.has(VIEW_LOGS_PERMISSION) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied {
                permission: VIEW_LOGS_PERMISSION.to_string(),
                addon_id: None,
            })
        }
    }
}

impl FromRequestParts<AppState> for AdminViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAdmin(user) = RequireAdmin::from_request_parts(parts, state).await?;
        let permissions = load_admin_permissions(&state.pool, user.user_id).await?;
        Ok(AdminViewer { user, permissions })
    }
}
