//! Job runner loop.
//!
//! Polls `background_jobs` every `poll_interval_secs`, claims due jobs with
//! `FOR UPDATE SKIP LOCKED` and runs one bounded step of each. Suspended
//! jobs go back to pending with their checkpoint, so a restart resumes
//! where the last step stopped.

use std::time::Duration;

use addonlog_core::addon::LIBRARY_ADDON_ID;
use addonlog_core::context::LogContext;
use addonlog_core::rebuild::{
    run_step, Deadline, RebuildCheckpoint, StepOutcome, StepReport, JOB_TYPE,
};
use addonlog_core::types::DbId;
use addonlog_db::models::background_job::BackgroundJob;
use addonlog_db::repositories::BackgroundJobRepo;
use addonlog_db::DbPool;
use addonlog_logger::AddonLogger;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::error::JobError;
use crate::jobs::store::PgFieldValueStore;

/// Runs background jobs until cancelled.
pub struct JobRunner {
    pool: DbPool,
    config: WorkerConfig,
    logger: AddonLogger,
}

impl JobRunner {
    pub fn new(pool: DbPool, config: WorkerConfig) -> Self {
        let logger =
            AddonLogger::for_addon(pool.clone(), LIBRARY_ADDON_ID).with_settings(&config.logs);
        Self {
            pool,
            config,
            logger,
        }
    }

    /// Run the poll loop until the cancellation token is triggered.
    ///
    /// Each tick drains every due job before waiting again.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            max_run_secs = self.config.max_run_secs,
            "Job runner started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job runner shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    while !cancel.is_cancelled() {
                        match self.run_next().await {
                            Ok(Some(_)) => {}
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "Job poll failed");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Claim and run one step of the next due job.
    ///
    /// Returns the id of the job that ran, or `None` when nothing was due.
    /// A failing step is rescheduled after `retry_delay_secs`, or failed
    /// outright when retrying cannot help.
    pub async fn run_next(&self) -> Result<Option<DbId>, sqlx::Error> {
        let Some(job) =
            BackgroundJobRepo::claim_next(&self.pool, self.config.stale_after_secs as f64).await?
        else {
            return Ok(None);
        };

        let job_id = job.id;
        tracing::debug!(job_id, job_type = %job.job_type, attempts = job.attempts, "Job claimed");

        if let Err(e) = self.process(job).await {
            if e.is_permanent() {
                tracing::error!(job_id, error = %e, "Job failed");
                BackgroundJobRepo::fail(&self.pool, job_id, &e.to_string()).await?;
            } else {
                tracing::warn!(
                    job_id,
                    error = %e,
                    retry_in_secs = self.config.retry_delay_secs,
                    "Job step failed, will retry",
                );
                BackgroundJobRepo::retry_later(
                    &self.pool,
                    job_id,
                    self.config.retry_delay_secs as f64,
                    &format!("Retrying after error: {e}"),
                )
                .await?;
            }
        }

        Ok(Some(job_id))
    }

    async fn process(&self, job: BackgroundJob) -> Result<(), JobError> {
        if job.job_type != JOB_TYPE {
            return Err(JobError::UnknownJobType(job.job_type));
        }

        let checkpoint: RebuildCheckpoint = serde_json::from_value(job.state.clone())?;
        let field_id = checkpoint.field_id.clone();
        let store = PgFieldValueStore::new(self.pool.clone());
        let deadline = Deadline::after(Duration::from_secs(self.config.max_run_secs));

        match run_step(&store, checkpoint, &deadline).await? {
            StepOutcome::Suspended(report) => {
                self.log_report(&report).await;
                let state = serde_json::to_value(&report.checkpoint)?;
                let message = report.checkpoint.status_message();
                if !BackgroundJobRepo::suspend(&self.pool, job.id, &state, &message).await? {
                    tracing::info!(job_id = job.id, "Job was cancelled during its step");
                }
            }
            StepOutcome::Complete(report) => {
                self.log_report(&report).await;
                self.logger
                    .info(
                        "User field value rebuild finished",
                        LogContext::new()
                            .with("field_id", field_id.as_str())
                            .with("processed", report.checkpoint.processed)
                            .with("total", report.checkpoint.total),
                    )
                    .await;
                let state = serde_json::to_value(&report.checkpoint)?;
                let message = report.checkpoint.status_message();
                BackgroundJobRepo::complete(&self.pool, job.id, &state, &message).await?;
            }
            StepOutcome::FieldMissing => {
                self.logger
                    .warning(
                        "User field value rebuild: field not found",
                        LogContext::new().with("field_id", field_id.as_str()),
                    )
                    .await;
                BackgroundJobRepo::complete(&self.pool, job.id, &job.state, "Field not found")
                    .await?;
            }
            StepOutcome::NoField => {
                BackgroundJobRepo::complete(&self.pool, job.id, &job.state, "No field").await?;
            }
        }

        Ok(())
    }

    /// Record the snapshot and every correction of one step.
    async fn log_report(&self, report: &StepReport) {
        let field_id = report.checkpoint.field_id.as_str();

        if report.snapshot_taken {
            self.logger
                .info(
                    "User field value rebuild: snapshot acquired",
                    LogContext::new()
                        .with("field_id", field_id)
                        .with("total", report.checkpoint.total),
                )
                .await;
        }

        for correction in &report.corrections {
            self.logger
                .notice(
                    "User field value rebuild: corrected field value",
                    LogContext::new()
                        .with("field_id", field_id)
                        .with("user_id", correction.user_id)
                        .with("before", correction.before.as_str())
                        .with("after", correction.after.as_str()),
                )
                .await;
        }
    }
}
