//! Repository for the `user_fields` and `user_field_values` tables.

use addonlog_core::choices::{choices_to_json, Choices};
use addonlog_core::types::DbId;
use addonlog_core::user_field::UserFieldOptions;
use sqlx::PgPool;

use crate::models::user_field::{UserField, UserFieldValue};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `user_fields` SELECT queries.
const COLUMNS: &str = "\
    field_id, title, description, field_type, display_group, display_order, \
    required, user_editable, moderator_editable, show_registration, \
    viewable_profile, viewable_message, max_length, field_choices, \
    created_at, updated_at";

/// Column list for `user_field_values` SELECT queries.
const VALUE_COLUMNS: &str = "user_id, field_id, field_value";

// ---------------------------------------------------------------------------
// UserFieldRepo
// ---------------------------------------------------------------------------

/// Provides CRUD operations for custom user fields and their values.
pub struct UserFieldRepo;

impl UserFieldRepo {
    /// Insert a field with fully resolved options.
    pub async fn create(
        pool: &PgPool,
        field_id: &str,
        title: &str,
        description: &str,
        options: &UserFieldOptions,
    ) -> Result<UserField, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_fields (field_id, title, description, field_type, display_group, \
                 display_order, required, user_editable, moderator_editable, show_registration, \
                 viewable_profile, viewable_message, max_length, field_choices) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserField>(&query)
            .bind(field_id)
            .bind(title)
            .bind(description)
            .bind(&options.field_type)
            .bind(&options.display_group)
            .bind(options.display_order)
            .bind(options.required)
            .bind(&options.user_editable)
            .bind(options.moderator_editable)
            .bind(options.show_registration)
            .bind(options.viewable_profile)
            .bind(options.viewable_message)
            .bind(options.max_length)
            .bind(choices_to_json(&options.field_choices))
            .fetch_one(pool)
            .await
    }

    /// Find a field by ID.
    pub async fn find(pool: &PgPool, field_id: &str) -> Result<Option<UserField>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_fields WHERE field_id = $1");
        sqlx::query_as::<_, UserField>(&query)
            .bind(field_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace a field's choice set. Returns `None` if the field is gone.
    pub async fn update_choices(
        pool: &PgPool,
        field_id: &str,
        choices: &Choices,
    ) -> Result<Option<UserField>, sqlx::Error> {
        let query = format!(
            "UPDATE user_fields SET field_choices = $2, updated_at = NOW() \
             WHERE field_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserField>(&query)
            .bind(field_id)
            .bind(choices_to_json(choices))
            .fetch_optional(pool)
            .await
    }

    /// Delete a field and, by cascade, its values. Returns `true` if a row
    /// was removed.
    pub async fn delete(pool: &PgPool, field_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_fields WHERE field_id = $1")
            .bind(field_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Insert or overwrite one user's value.
    pub async fn set_value(
        pool: &PgPool,
        user_id: DbId,
        field_id: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_field_values (user_id, field_id, field_value) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, field_id) DO UPDATE SET field_value = EXCLUDED.field_value",
        )
        .bind(user_id)
        .bind(field_id)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Overwrite an existing value. Single-row statement.
    pub async fn update_value(
        pool: &PgPool,
        user_id: DbId,
        field_id: &str,
        value: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_field_values SET field_value = $3 WHERE user_id = $1 AND field_id = $2",
        )
        .bind(user_id)
        .bind(field_id)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One user's stored value.
    pub async fn find_value(
        pool: &PgPool,
        user_id: DbId,
        field_id: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT field_value FROM user_field_values WHERE user_id = $1 AND field_id = $2",
        )
        .bind(user_id)
        .bind(field_id)
        .fetch_optional(pool)
        .await
    }

    /// Number of stored values for a field.
    pub async fn count_values(pool: &PgPool, field_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM user_field_values WHERE field_id = $1",
        )
        .bind(field_id)
        .fetch_one(pool)
        .await
    }

    /// Up to `limit` values with `user_id > after_user_id`, ascending.
    pub async fn fetch_values_after(
        pool: &PgPool,
        field_id: &str,
        after_user_id: DbId,
        limit: i64,
    ) -> Result<Vec<UserFieldValue>, sqlx::Error> {
        let query = format!(
            "SELECT {VALUE_COLUMNS} FROM user_field_values \
             WHERE field_id = $1 AND user_id > $2 \
             ORDER BY user_id ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, UserFieldValue>(&query)
            .bind(field_id)
            .bind(after_user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
