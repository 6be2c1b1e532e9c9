//! Repository for the `addons` registry.

use sqlx::PgPool;

use crate::models::addon::{Addon, CreateAddon};

/// Column list for `addons` queries.
const COLUMNS: &str = "addon_id, title, version_string, is_active, created_at";

/// Provides lookups against the installed add-on registry.
pub struct AddonRepo;

impl AddonRepo {
    /// Register an add-on.
    pub async fn create(pool: &PgPool, input: &CreateAddon) -> Result<Addon, sqlx::Error> {
        let query = format!(
            "INSERT INTO addons (addon_id, title, version_string) \
             VALUES ($1, $2, COALESCE($3, '1.0.0')) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Addon>(&query)
            .bind(&input.addon_id)
            .bind(&input.title)
            .bind(&input.version_string)
            .fetch_one(pool)
            .await
    }

    /// Find an add-on by ID.
    pub async fn find(pool: &PgPool, addon_id: &str) -> Result<Option<Addon>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM addons WHERE addon_id = $1");
        sqlx::query_as::<_, Addon>(&query)
            .bind(addon_id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of every installed add-on.
    pub async fn list_ids(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT addon_id FROM addons ORDER BY addon_id")
            .fetch_all(pool)
            .await
    }
}
