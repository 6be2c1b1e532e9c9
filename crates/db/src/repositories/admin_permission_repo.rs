//! Repository for `admin_permissions` and `user_admin_permissions`.

use std::collections::HashSet;

use addonlog_core::types::DbId;
use sqlx::PgPool;

/// Provides registry and grant lookups for admin permissions.
pub struct AdminPermissionRepo;

impl AdminPermissionRepo {
    /// Register a permission. Registering twice is a no-op.
    pub async fn register(
        pool: &PgPool,
        permission_id: &str,
        title: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO admin_permissions (admin_permission_id, title) VALUES ($1, $2) \
             ON CONFLICT (admin_permission_id) DO NOTHING",
        )
        .bind(permission_id)
        .bind(title)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Every registered permission ID.
    pub async fn registered_ids(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
        let ids =
            sqlx::query_scalar::<_, String>("SELECT admin_permission_id FROM admin_permissions")
                .fetch_all(pool)
                .await?;
        Ok(ids.into_iter().collect())
    }

    /// Grant a permission to a user. Granting twice is a no-op.
    pub async fn grant(
        pool: &PgPool,
        user_id: DbId,
        permission_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_admin_permissions (user_id, admin_permission_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(permission_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Permission IDs granted to a user.
    pub async fn granted_ids(pool: &PgPool, user_id: DbId) -> Result<HashSet<String>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT admin_permission_id FROM user_admin_permissions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(ids.into_iter().collect())
    }
}
