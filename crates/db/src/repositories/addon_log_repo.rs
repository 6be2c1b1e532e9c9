//! Repository for the `addon_logs` table.

use addonlog_core::level::LogLevel;
use addonlog_core::log_filter::{page_offset, LogFilter};
use addonlog_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::addon_log::{
    AddonLog, AddonLogSummary, CreateAddonLog, HighPriorityCounts, LogActor, LogFilterBits,
};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `addon_logs` SELECT queries.
const COLUMNS: &str = "id, addon_id, created_at, level, message, user_id, details";

/// Display name of the system actor in filter bits.
const SYSTEM_ACTOR: &str = "System";

// ---------------------------------------------------------------------------
// AddonLogRepo
// ---------------------------------------------------------------------------

/// Provides insert, query and deletion operations for add-on logs.
pub struct AddonLogRepo;

impl AddonLogRepo {
    /// Insert a log entry if its add-on is installed.
    ///
    /// Returns `None` (and writes nothing) when `addon_id` is not in the
    /// add-on registry.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAddonLog,
    ) -> Result<Option<AddonLog>, sqlx::Error> {
        let query = format!(
            "INSERT INTO addon_logs (addon_id, level, message, user_id, details) \
             SELECT $1::TEXT, $2::TEXT, $3::TEXT, $4::BIGINT, $5::JSONB \
             WHERE EXISTS (SELECT 1 FROM addons WHERE addon_id = $1) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AddonLog>(&query)
            .bind(&input.addon_id)
            .bind(input.level.as_str())
            .bind(&input.message)
            .bind(input.user_id)
            .bind(&input.details)
            .fetch_optional(pool)
            .await
    }

    /// Find a log entry by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AddonLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM addon_logs WHERE id = $1");
        sqlx::query_as::<_, AddonLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a log entry. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM addon_logs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of an add-on's logs, newest first.
    pub async fn list_for_addon(
        pool: &PgPool,
        addon_id: &str,
        filter: &LogFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<AddonLog>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_log_filter(addon_id, filter);

        let query = format!(
            "SELECT {COLUMNS} FROM addon_logs {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let q = bind_log_values(sqlx::query_as::<_, AddonLog>(&query), &bind_values);
        q.bind(per_page)
            .bind(page_offset(page, per_page))
            .fetch_all(pool)
            .await
    }

    /// Count an add-on's logs matching `filter`.
    pub async fn count_for_addon(
        pool: &PgPool,
        addon_id: &str,
        filter: &LogFilter,
    ) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_log_filter(addon_id, filter);

        let query = format!("SELECT COUNT(*)::BIGINT AS count FROM addon_logs {where_clause}");

        let q = bind_log_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }

    /// Distinct levels and actors present in an add-on's logs.
    pub async fn filter_bits(pool: &PgPool, addon_id: &str) -> Result<LogFilterBits, sqlx::Error> {
        let types = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT level FROM addon_logs WHERE addon_id = $1 ORDER BY level",
        )
        .bind(addon_id)
        .fetch_all(pool)
        .await?;

        let users = sqlx::query_as::<_, LogActor>(
            "SELECT DISTINCT l.user_id, COALESCE(u.username, $2) AS username \
             FROM addon_logs l \
             LEFT JOIN users u ON u.id = l.user_id \
             WHERE l.addon_id = $1 \
               AND (l.user_id IS NULL OR u.id IS NOT NULL) \
             ORDER BY l.user_id NULLS FIRST",
        )
        .bind(addon_id)
        .bind(SYSTEM_ACTOR)
        .fetch_all(pool)
        .await?;

        Ok(LogFilterBits { types, users })
    }

    /// Totals per add-on, broken down by level, most active first.
    ///
    /// Add-ons that have logs but are no longer installed are included with
    /// empty registry columns.
    pub async fn addon_summaries(pool: &PgPool) -> Result<Vec<AddonLogSummary>, sqlx::Error> {
        sqlx::query_as::<_, AddonLogSummary>(
            "SELECT c.addon_id, c.log_count, \
                    c.emergency_count, c.alert_count, c.critical_count, c.error_count, \
                    c.warning_count, c.notice_count, c.info_count, c.debug_count, \
                    c.latest_log_at, a.title, a.version_string, a.is_active \
             FROM ( \
                 SELECT addon_id, \
                        COUNT(*)::BIGINT AS log_count, \
                        COUNT(*) FILTER (WHERE level = 'emergency')::BIGINT AS emergency_count, \
                        COUNT(*) FILTER (WHERE level = 'alert')::BIGINT AS alert_count, \
                        COUNT(*) FILTER (WHERE level = 'critical')::BIGINT AS critical_count, \
                        COUNT(*) FILTER (WHERE level = 'error')::BIGINT AS error_count, \
                        COUNT(*) FILTER (WHERE level = 'warning')::BIGINT AS warning_count, \
                        COUNT(*) FILTER (WHERE level = 'notice')::BIGINT AS notice_count, \
                        COUNT(*) FILTER (WHERE level = 'info')::BIGINT AS info_count, \
                        COUNT(*) FILTER (WHERE level = 'debug')::BIGINT AS debug_count, \
                        MAX(created_at) AS latest_log_at \
                 FROM addon_logs \
                 GROUP BY addon_id \
             ) c \
             LEFT JOIN addons a ON a.addon_id = c.addon_id \
             ORDER BY c.log_count DESC, c.addon_id ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Counts of emergency, critical, alert and error entries across all
    /// add-ons. `None` when there are none of any of them.
    pub async fn high_priority_counts(
        pool: &PgPool,
    ) -> Result<Option<HighPriorityCounts>, sqlx::Error> {
        let levels: Vec<&str> = LogLevel::HIGH_PRIORITY.iter().map(|l| l.as_str()).collect();

        let counts = sqlx::query_as::<_, HighPriorityCounts>(
            "SELECT \
                 COUNT(*) FILTER (WHERE level = 'emergency')::BIGINT AS emergency_count, \
                 COUNT(*) FILTER (WHERE level = 'critical')::BIGINT AS critical_count, \
                 COUNT(*) FILTER (WHERE level = 'alert')::BIGINT AS alert_count, \
                 COUNT(*) FILTER (WHERE level = 'error')::BIGINT AS error_count \
             FROM addon_logs \
             WHERE level = ANY($1)",
        )
        .bind(&levels)
        .fetch_one(pool)
        .await?;

        Ok((counts.total() > 0).then_some(counts))
    }

    /// Delete every log of an add-on. Returns the number removed.
    pub async fn clear_for_addon(pool: &PgPool, addon_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM addon_logs WHERE addon_id = $1")
            .bind(addon_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete entries strictly older than `cutoff`. Returns the number removed.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM addon_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built log queries.
enum BindValue {
    Text(String),
    TextArray(Vec<String>),
    BigIntArray(Vec<DbId>),
    Timestamp(Timestamp),
}

/// Build a WHERE clause and bind values for one add-on's logs.
///
/// Returns `(where_clause, bind_values, next_bind_index)`. The clause always
/// starts with `WHERE addon_id = $1`.
fn build_log_filter(addon_id: &str, filter: &LogFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = vec!["addon_id = $1".to_string()];
    let mut bind_idx = 2u32;
    let mut bind_values: Vec<BindValue> = vec![BindValue::Text(addon_id.to_string())];

    if let Some(start) = filter.start_date {
        conditions.push(format!("created_at >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(start));
    }

    if let Some(end) = filter.end_date {
        conditions.push(format!("created_at <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(end));
    }

    if let Some(types) = filter.type_constraint() {
        conditions.push(format!("level = ANY(${bind_idx})"));
        bind_idx += 1;
        bind_values.push(BindValue::TextArray(types));
    }

    if let Some(actors) = filter.actor_constraint() {
        match (actors.include_system, actors.user_ids.is_empty()) {
            (true, true) => conditions.push("user_id IS NULL".to_string()),
            (true, false) => {
                conditions.push(format!("(user_id IS NULL OR user_id = ANY(${bind_idx}))"));
                bind_idx += 1;
                bind_values.push(BindValue::BigIntArray(actors.user_ids));
            }
            (false, false) => {
                conditions.push(format!("user_id = ANY(${bind_idx})"));
                bind_idx += 1;
                bind_values.push(BindValue::BigIntArray(actors.user_ids));
            }
            (false, true) => conditions.push("FALSE".to_string()),
        }
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));

    (where_clause, bind_values, bind_idx)
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_log_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v),
            BindValue::BigIntArray(v) => q = q.bind(v),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
fn bind_log_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v),
            BindValue::BigIntArray(v) => q = q.bind(v),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}
