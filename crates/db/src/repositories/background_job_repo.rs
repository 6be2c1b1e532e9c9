//! Repository for the `background_jobs` table.
//!
//! Jobs move `pending -> running -> pending` while they are suspended and
//! resumed, and end in `completed`, `cancelled` or `failed`. Every
//! transition out of `running` is guarded on the current status so a job
//! cancelled mid-step is not revived by its runner.
//!
//! Re-enqueueing a unique job that is already under way queues the new
//! state in `next_state`. When the current run completes or fails, the
//! queued state takes its place and the job becomes pending again.

use addonlog_core::types::DbId;
use sqlx::PgPool;

use crate::models::background_job::{BackgroundJob, EnqueueJob, JobListQuery, JobStatus};

/// Column list for `background_jobs` queries.
const COLUMNS: &str = "\
    id, unique_key, job_type, state, status, status_message, next_state, attempts, \
    run_after, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides enqueue, claim and lifecycle operations for background jobs.
pub struct BackgroundJobRepo;

impl BackgroundJobRepo {
    /// Enqueue a job.
    ///
    /// Without a unique key, or when no job holds the key, a new pending job
    /// is inserted. Otherwise the existing row is reused:
    ///
    /// - finished (completed, cancelled, failed): reset to pending with the
    ///   new state;
    /// - pending and never claimed: its state becomes
    ///   `merge(state, input.state)`;
    /// - under way (running, or pending after a suspension or retry): the
    ///   new state is queued as `next_state`, merged into any state already
    ///   queued there.
    ///
    /// `merge(queued, new)` combines a state that has not started running
    /// with a newer one; `|_, new| new` simply replaces it.
    pub async fn enqueue_unique<F>(
        pool: &PgPool,
        input: &EnqueueJob,
        merge: F,
    ) -> Result<BackgroundJob, sqlx::Error>
    where
        F: FnOnce(serde_json::Value, serde_json::Value) -> serde_json::Value,
    {
        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO background_jobs (unique_key, job_type, state, status, status_message) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (unique_key) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, BackgroundJob>(&insert)
            .bind(&input.unique_key)
            .bind(&input.job_type)
            .bind(&input.state)
            .bind(JobStatus::Pending.as_str())
            .bind(&input.status_message)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(job) = inserted {
            tx.commit().await?;
            return Ok(job);
        }

        let Some(unique_key) = &input.unique_key else {
            return Err(sqlx::Error::RowNotFound);
        };
        let lock = format!("SELECT {COLUMNS} FROM background_jobs WHERE unique_key = $1 FOR UPDATE");
        let existing = sqlx::query_as::<_, BackgroundJob>(&lock)
            .bind(unique_key)
            .fetch_one(&mut *tx)
            .await?;

        let status = existing.status.as_str();
        let finished = JobStatus::parse(status).map_or(true, |s| s.is_terminal());
        let not_started = status == JobStatus::Pending.as_str() && existing.attempts == 0;

        let job = if finished || not_started {
            let state = if finished {
                input.state.clone()
            } else {
                merge(existing.state, input.state.clone())
            };
            let reset = format!(
                "UPDATE background_jobs \
                 SET job_type = $2, state = $3, status = $4, status_message = $5, \
                     next_state = NULL, next_status_message = NULL, \
                     attempts = 0, run_after = NOW(), updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING {COLUMNS}"
            );
            sqlx::query_as::<_, BackgroundJob>(&reset)
                .bind(existing.id)
                .bind(&input.job_type)
                .bind(&state)
                .bind(JobStatus::Pending.as_str())
                .bind(&input.status_message)
                .fetch_one(&mut *tx)
                .await?
        } else {
            let next_state = match existing.next_state {
                Some(queued) => merge(queued, input.state.clone()),
                None => input.state.clone(),
            };
            let queue = format!(
                "UPDATE background_jobs \
                 SET next_state = $2, next_status_message = $3 \
                 WHERE id = $1 \
                 RETURNING {COLUMNS}"
            );
            sqlx::query_as::<_, BackgroundJob>(&queue)
                .bind(existing.id)
                .bind(&next_state)
                .bind(&input.status_message)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        Ok(job)
    }

    /// Atomically claim the next due job.
    ///
    /// Pending jobs whose `run_after` has passed are eligible, as are
    /// running jobs not touched for `stale_after_secs` (their runner died).
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent runners never
    /// claim the same job.
    pub async fn claim_next(
        pool: &PgPool,
        stale_after_secs: f64,
    ) -> Result<Option<BackgroundJob>, sqlx::Error> {
        let query = format!(
            "UPDATE background_jobs \
             SET status = $1, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM background_jobs \
                 WHERE (status = $2 AND run_after <= NOW()) \
                    OR (status = $1 AND updated_at < NOW() - make_interval(secs => $3)) \
                 ORDER BY run_after ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackgroundJob>(&query)
            .bind(JobStatus::Running.as_str())
            .bind(JobStatus::Pending.as_str())
            .bind(stale_after_secs)
            .fetch_optional(pool)
            .await
    }

    /// Persist a suspended job's checkpoint and make it due again.
    ///
    /// Returns `false` if the job is no longer running (e.g. cancelled).
    pub async fn suspend(
        pool: &PgPool,
        job_id: DbId,
        state: &serde_json::Value,
        status_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = $2, state = $3, status_message = $4, \
                 run_after = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(job_id)
        .bind(JobStatus::Pending.as_str())
        .bind(state)
        .bind(status_message)
        .bind(JobStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as completed, or start its queued follow-up.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        state: &serde_json::Value,
        status_message: &str,
    ) -> Result<bool, sqlx::Error> {
        Self::finish(pool, job_id, JobStatus::Completed, Some(state), status_message).await
    }

    /// Mark a running job as failed, or start its queued follow-up.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        Self::finish(pool, job_id, JobStatus::Failed, None, error).await
    }

    /// Put a running job back to pending after an error, due after
    /// `delay_secs`. Its last saved checkpoint is kept.
    pub async fn retry_later(
        pool: &PgPool,
        job_id: DbId,
        delay_secs: f64,
        status_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = $2, status_message = $3, \
                 run_after = NOW() + make_interval(secs => $4), updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(job_id)
        .bind(JobStatus::Pending.as_str())
        .bind(status_message)
        .bind(delay_secs)
        .bind(JobStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel a job that has not finished, along with any queued follow-up.
    ///
    /// Returns `true` if the job was cancelled, `false` if it was already
    /// completed, failed or cancelled.
    pub async fn cancel(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = $2, next_state = NULL, next_status_message = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND status IN ($3, $4)",
        )
        .bind(job_id)
        .bind(JobStatus::Cancelled.as_str())
        .bind(JobStatus::Pending.as_str())
        .bind(JobStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BackgroundJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM background_jobs WHERE id = $1");
        sqlx::query_as::<_, BackgroundJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by its unique key.
    pub async fn find_by_unique_key(
        pool: &PgPool,
        unique_key: &str,
    ) -> Result<Option<BackgroundJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM background_jobs WHERE unique_key = $1");
        sqlx::query_as::<_, BackgroundJob>(&query)
            .bind(unique_key)
            .fetch_optional(pool)
            .await
    }

    /// List jobs, newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        params: &JobListQuery,
    ) -> Result<Vec<BackgroundJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM background_jobs \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, BackgroundJob>(&query)
            .bind(&params.status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// End the current run with `status`. A queued follow-up instead
    /// becomes the job's state and the job goes back to pending.
    ///
    /// `state` of `None` keeps the stored state.
    async fn finish(
        pool: &PgPool,
        job_id: DbId,
        status: JobStatus,
        state: Option<&serde_json::Value>,
        status_message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE background_jobs \
             SET status = CASE WHEN next_state IS NULL THEN $2 ELSE $6 END, \
                 state = COALESCE(next_state, $3, state), \
                 status_message = CASE WHEN next_state IS NULL THEN $4 \
                                       ELSE next_status_message END, \
                 attempts = CASE WHEN next_state IS NULL THEN attempts ELSE 0 END, \
                 run_after = CASE WHEN next_state IS NULL THEN run_after ELSE NOW() END, \
                 next_state = NULL, next_status_message = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(state)
        .bind(status_message)
        .bind(JobStatus::Running.as_str())
        .bind(JobStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
