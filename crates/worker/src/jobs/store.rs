//! Postgres-backed [`FieldValueStore`].

use std::collections::HashSet;

use addonlog_core::rebuild::{FieldValueStore, StoredValue};
use addonlog_core::types::DbId;
use addonlog_db::repositories::UserFieldRepo;
use addonlog_db::DbPool;
use async_trait::async_trait;

/// Reads and rewrites `user_field_values` rows through [`UserFieldRepo`].
pub struct PgFieldValueStore {
    pool: DbPool,
}

impl PgFieldValueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FieldValueStore for PgFieldValueStore {
    type Error = sqlx::Error;

    async fn allowed_choices(
        &self,
        field_id: &str,
    ) -> Result<Option<HashSet<String>>, sqlx::Error> {
        let field = UserFieldRepo::find(&self.pool, field_id).await?;
        Ok(field.map(|f| f.choices().into_keys().collect()))
    }

    async fn count_values(&self, field_id: &str) -> Result<i64, sqlx::Error> {
        UserFieldRepo::count_values(&self.pool, field_id).await
    }

    async fn fetch_after(
        &self,
        field_id: &str,
        after_user_id: DbId,
        limit: i64,
    ) -> Result<Vec<StoredValue>, sqlx::Error> {
        let rows =
            UserFieldRepo::fetch_values_after(&self.pool, field_id, after_user_id, limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| StoredValue {
                user_id: row.user_id,
                field_value: row.field_value,
            })
            .collect())
    }

    async fn write_value(
        &self,
        field_id: &str,
        user_id: DbId,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        UserFieldRepo::update_value(&self.pool, user_id, field_id, value).await?;
        Ok(())
    }
}
