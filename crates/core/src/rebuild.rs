//! Resumable rewrite of stored user field values.
//!
//! The job state is a [`RebuildCheckpoint`]: a cursor over user ids plus the
//! rename map computed when the field's choices were edited. [`run_step`]
//! advances the cursor until the rows run out or the [`Budget`] is spent,
//! then hands the checkpoint back to be persisted and resumed later. Each
//! row is rewritten at most once per pass and only when its normalised value
//! differs, so a resumed or repeated run is harmless.
//!
//! A checkpoint carries the choice keys its rename map leads to. A pass
//! that is still running when the choices change again keeps normalising
//! against those keys; the later edit runs as a separate pass afterwards.

use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::choices::{compose_rename_maps, RenameMap};
use crate::field_value::normalize_value;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Job type stored on the background job row.
pub const JOB_TYPE: &str = "user_field_value_rebuild";

/// Rows fetched per batch, before clamping.
pub const DEFAULT_BATCH: i64 = 100;

/// Largest allowed batch.
pub const MAX_BATCH: i64 = 100;

/// Unique job key: one rebuild per field at a time.
pub fn unique_key(field_id: &str) -> String {
    format!("{JOB_TYPE}_{field_id}")
}

/// Clamp a batch size to `1..=MAX_BATCH`.
pub fn clamp_batch(batch: i64) -> i64 {
    batch.clamp(1, MAX_BATCH)
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

fn default_batch() -> i64 {
    DEFAULT_BATCH
}

/// Persisted state of one rebuild job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildCheckpoint {
    pub field_id: String,
    /// Exclusive lower bound for the next fetch.
    #[serde(default)]
    pub last_user_id: DbId,
    #[serde(default)]
    pub processed: i64,
    /// Row count taken on the first step. Not updated afterwards.
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default = "default_batch")]
    pub batch: i64,
    #[serde(default)]
    pub rename_map: RenameMap,
    /// Choice keys values are normalised against. `None` reads the field's
    /// current keys on every step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<BTreeSet<String>>,
}

impl RebuildCheckpoint {
    pub fn new(field_id: impl Into<String>, rename_map: RenameMap) -> Self {
        Self {
            field_id: field_id.into(),
            last_user_id: 0,
            processed: 0,
            total: None,
            batch: DEFAULT_BATCH,
            rename_map,
            allowed: None,
        }
    }

    /// Pin the choice keys this pass normalises against.
    pub fn with_allowed<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.allowed = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Fold a later edit into this pass, which has not started yet.
    ///
    /// The result renames through both edits and targets the later key set.
    pub fn followed_by(self, later: RebuildCheckpoint) -> RebuildCheckpoint {
        RebuildCheckpoint {
            rename_map: compose_rename_maps(&self.rename_map, &later.rename_map),
            ..later
        }
    }

    /// Progress line shown in the job list.
    pub fn status_message(&self) -> String {
        match self.total {
            Some(total) if total > 0 => format!(
                "Rebuilding user field \"{}\" values... {}/{}",
                self.field_id, self.processed, total
            ),
            _ => format!("Rebuilding user field \"{}\" values...", self.field_id),
        }
    }
}

/// Merge a newer rebuild's stored state into a queued one that has not
/// started. A state that does not decode as a checkpoint is replaced.
pub fn merge_queued_states(
    queued: serde_json::Value,
    newer: serde_json::Value,
) -> serde_json::Value {
    let decoded = (
        serde_json::from_value::<RebuildCheckpoint>(queued),
        serde_json::from_value::<RebuildCheckpoint>(newer.clone()),
    );
    match decoded {
        (Ok(queued), Ok(later)) => serde_json::to_value(queued.followed_by(later)).unwrap_or(newer),
        _ => newer,
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// One stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub user_id: DbId,
    pub field_value: String,
}

/// Storage the rebuild reads from and writes to.
#[async_trait]
pub trait FieldValueStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Allowed choice keys of the field, or `None` if the field is gone.
    async fn allowed_choices(&self, field_id: &str) -> Result<Option<HashSet<String>>, Self::Error>;

    async fn count_values(&self, field_id: &str) -> Result<i64, Self::Error>;

    /// Up to `limit` values with `user_id > after_user_id`, ascending.
    async fn fetch_after(
        &self,
        field_id: &str,
        after_user_id: DbId,
        limit: i64,
    ) -> Result<Vec<StoredValue>, Self::Error>;

    /// Overwrite one user's value.
    async fn write_value(
        &self,
        field_id: &str,
        user_id: DbId,
        value: &str,
    ) -> Result<(), Self::Error>;
}

/// Time (or work) allowance of one step.
pub trait Budget: Send + Sync {
    fn exhausted(&self) -> bool;
}

/// Wall-clock budget starting at construction.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }
}

impl Budget for Deadline {
    fn exhausted(&self) -> bool {
        self.started.elapsed() >= self.limit
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A value that was rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub user_id: DbId,
    pub before: String,
    pub after: String,
}

/// What a step did, for persisting and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub checkpoint: RebuildCheckpoint,
    pub corrections: Vec<Correction>,
    /// The row count snapshot was taken during this step.
    pub snapshot_taken: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Budget spent; persist the checkpoint and resume later.
    Suspended(StepReport),
    /// Every row has been visited.
    Complete(StepReport),
    /// The field no longer exists. Nothing to do.
    FieldMissing,
    /// The checkpoint names no field. Nothing to do.
    NoField,
}

/// Advance a rebuild until it completes or the budget runs out.
///
/// The budget is checked before every fetch and after every row.
pub async fn run_step<S, B>(
    store: &S,
    mut checkpoint: RebuildCheckpoint,
    budget: &B,
) -> Result<StepOutcome, S::Error>
where
    S: FieldValueStore + ?Sized,
    B: Budget + ?Sized,
{
    if checkpoint.field_id.trim().is_empty() {
        return Ok(StepOutcome::NoField);
    }

    let Some(current) = store.allowed_choices(&checkpoint.field_id).await? else {
        return Ok(StepOutcome::FieldMissing);
    };
    let allowed = match &checkpoint.allowed {
        Some(pinned) => pinned.iter().cloned().collect(),
        None => current,
    };

    let mut snapshot_taken = false;
    if checkpoint.total.is_none() {
        checkpoint.total = Some(store.count_values(&checkpoint.field_id).await?);
        checkpoint.batch = clamp_batch(checkpoint.batch);
        snapshot_taken = true;
    }

    let mut corrections = Vec::new();
    let report = |checkpoint: RebuildCheckpoint, corrections: Vec<Correction>| StepReport {
        checkpoint,
        corrections,
        snapshot_taken,
    };

    loop {
        if budget.exhausted() {
            return Ok(StepOutcome::Suspended(report(checkpoint, corrections)));
        }

        let rows = store
            .fetch_after(
                &checkpoint.field_id,
                checkpoint.last_user_id,
                clamp_batch(checkpoint.batch),
            )
            .await?;

        if rows.is_empty() {
            return Ok(StepOutcome::Complete(report(checkpoint, corrections)));
        }

        for row in rows {
            let after = normalize_value(&row.field_value, &checkpoint.rename_map, &allowed);
            if after != row.field_value {
                store
                    .write_value(&checkpoint.field_id, row.user_id, &after)
                    .await?;
                corrections.push(Correction {
                    user_id: row.user_id,
                    before: row.field_value,
                    after,
                });
            }

            checkpoint.last_user_id = row.user_id;
            checkpoint.processed += 1;

            if budget.exhausted() {
                return Ok(StepOutcome::Suspended(report(checkpoint, corrections)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    struct MemoryStore {
        allowed: Option<HashSet<String>>,
        values: Mutex<BTreeMap<DbId, String>>,
        writes: AtomicUsize,
    }

    impl MemoryStore {
        fn new(allowed: &[&str], values: &[(DbId, &str)]) -> Self {
            Self {
                allowed: Some(allowed.iter().map(|s| s.to_string()).collect()),
                values: Mutex::new(values.iter().map(|(id, v)| (*id, v.to_string())).collect()),
                writes: AtomicUsize::new(0),
            }
        }

        fn value(&self, user_id: DbId) -> String {
            self.values.lock().unwrap()[&user_id].clone()
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FieldValueStore for MemoryStore {
        type Error = Infallible;

        async fn allowed_choices(&self, _field_id: &str) -> Result<Option<HashSet<String>>, Infallible> {
            Ok(self.allowed.clone())
        }

        async fn count_values(&self, _field_id: &str) -> Result<i64, Infallible> {
            Ok(self.values.lock().unwrap().len() as i64)
        }

        async fn fetch_after(
            &self,
            _field_id: &str,
            after_user_id: DbId,
            limit: i64,
        ) -> Result<Vec<StoredValue>, Infallible> {
            Ok(self
                .values
                .lock()
                .unwrap()
                .range(after_user_id + 1..)
                .take(limit as usize)
                .map(|(user_id, value)| StoredValue {
                    user_id: *user_id,
                    field_value: value.clone(),
                })
                .collect())
        }

        async fn write_value(&self, _field_id: &str, user_id: DbId, value: &str) -> Result<(), Infallible> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.values.lock().unwrap().insert(user_id, value.to_string());
            Ok(())
        }
    }

    struct Unlimited;

    impl Budget for Unlimited {
        fn exhausted(&self) -> bool {
            false
        }
    }

    /// Allows a fixed number of budget checks to pass.
    struct Checks(AtomicUsize);

    impl Budget for Checks {
        fn exhausted(&self) -> bool {
            self.0
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
        }
    }

    fn rename_b_to_x() -> RenameMap {
        [("b".to_string(), "x".to_string())].into_iter().collect()
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::new(
            &["a", "x"],
            &[(1, "a,b,c"), (2, r#"["a","b"]"#), (3, "a"), (5, "c"), (8, "b")],
        )
    }

    #[tokio::test]
    async fn rewrites_every_shape() {
        let store = sample_store();
        let outcome = run_step(&store, RebuildCheckpoint::new("fruit", rename_b_to_x()), &Unlimited)
            .await
            .unwrap();

        let report = assert_matches!(outcome, StepOutcome::Complete(report) => report);
        assert!(report.snapshot_taken);
        assert_eq!(report.checkpoint.total, Some(5));
        assert_eq!(report.checkpoint.processed, 5);
        assert_eq!(report.checkpoint.last_user_id, 8);
        assert_eq!(report.corrections.len(), 4);

        assert_eq!(store.value(1), "a,x");
        assert_eq!(store.value(2), r#"["a","x"]"#);
        assert_eq!(store.value(3), "a");
        assert_eq!(store.value(5), "");
        assert_eq!(store.value(8), "x");
    }

    #[tokio::test]
    async fn second_run_writes_nothing() {
        let store = sample_store();
        run_step(&store, RebuildCheckpoint::new("fruit", rename_b_to_x()), &Unlimited)
            .await
            .unwrap();
        assert_eq!(store.writes(), 4);

        let outcome = run_step(&store, RebuildCheckpoint::new("fruit", rename_b_to_x()), &Unlimited)
            .await
            .unwrap();
        let report = assert_matches!(outcome, StepOutcome::Complete(report) => report);
        assert!(report.corrections.is_empty());
        assert_eq!(store.writes(), 4);
    }

    #[tokio::test]
    async fn interrupted_run_resumes_where_it_stopped() {
        let store = sample_store();

        // Pass the pre-fetch check and the check after the first row.
        let outcome = run_step(
            &store,
            RebuildCheckpoint::new("fruit", rename_b_to_x()),
            &Checks(AtomicUsize::new(2)),
        )
        .await
        .unwrap();
        let report = assert_matches!(outcome, StepOutcome::Suspended(report) => report);
        assert_eq!(report.checkpoint.last_user_id, 2);
        assert_eq!(report.checkpoint.processed, 2);
        assert_eq!(store.writes(), 2);

        let outcome = run_step(&store, report.checkpoint, &Unlimited).await.unwrap();
        let report = assert_matches!(outcome, StepOutcome::Complete(report) => report);
        assert!(!report.snapshot_taken);
        assert_eq!(report.checkpoint.processed, 5);
        assert_eq!(report.corrections.len(), 2);
        assert_eq!(store.writes(), 4);
    }

    #[tokio::test]
    async fn exhausted_budget_suspends_before_fetching() {
        let store = sample_store();
        let outcome = run_step(
            &store,
            RebuildCheckpoint::new("fruit", rename_b_to_x()),
            &Checks(AtomicUsize::new(0)),
        )
        .await
        .unwrap();

        let report = assert_matches!(outcome, StepOutcome::Suspended(report) => report);
        assert_eq!(report.checkpoint.processed, 0);
        assert_eq!(report.checkpoint.total, Some(5));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn small_batches_visit_every_row() {
        let store = sample_store();
        let mut checkpoint = RebuildCheckpoint::new("fruit", rename_b_to_x());
        checkpoint.batch = 2;

        let outcome = run_step(&store, checkpoint, &Unlimited).await.unwrap();
        let report = assert_matches!(outcome, StepOutcome::Complete(report) => report);
        assert_eq!(report.checkpoint.processed, 5);
    }

    #[tokio::test]
    async fn missing_field_completes_without_work() {
        let store = MemoryStore {
            allowed: None,
            ..sample_store()
        };
        let outcome = run_step(&store, RebuildCheckpoint::new("gone", RenameMap::new()), &Unlimited)
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::FieldMissing);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn empty_field_id_completes_without_work() {
        let store = sample_store();
        let outcome = run_step(&store, RebuildCheckpoint::new("", RenameMap::new()), &Unlimited)
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::NoField);
    }

    #[tokio::test]
    async fn pinned_keys_win_over_the_fields_current_keys() {
        // The field has since been edited to {z, x}; this pass still targets {a, x}.
        let store = MemoryStore::new(&["z", "x"], &[(1, "a"), (2, "b")]);
        let checkpoint = RebuildCheckpoint::new("fruit", rename_b_to_x()).with_allowed(["a", "x"]);

        run_step(&store, checkpoint, &Unlimited).await.unwrap();

        assert_eq!(store.value(1), "a");
        assert_eq!(store.value(2), "x");
    }

    #[test]
    fn later_edit_folds_into_a_queued_pass() {
        let a_to_z = [("a".to_string(), "z".to_string())].into();
        let x_to_y = [("x".to_string(), "y".to_string())].into();
        let queued = RebuildCheckpoint::new("fruit", a_to_z).with_allowed(["z", "x"]);
        let later = RebuildCheckpoint::new("fruit", x_to_y).with_allowed(["z", "y"]);

        let merged = queued.followed_by(later);

        let expected: RenameMap = [
            ("a".to_string(), "z".to_string()),
            ("x".to_string(), "y".to_string()),
        ]
        .into();
        assert_eq!(merged.rename_map, expected);
        assert_eq!(
            merged.allowed,
            Some(["z".to_string(), "y".to_string()].into())
        );
        assert_eq!(merged.last_user_id, 0);
        assert_eq!(merged.total, None);
    }

    #[test]
    fn queued_states_merge_as_checkpoints() {
        let queued = RebuildCheckpoint::new("fruit", rename_b_to_x());
        let later = RebuildCheckpoint::new("fruit", [("x".to_string(), "y".to_string())].into());

        let merged: RebuildCheckpoint = serde_json::from_value(merge_queued_states(
            serde_json::to_value(&queued).unwrap(),
            serde_json::to_value(&later).unwrap(),
        ))
        .unwrap();
        assert_eq!(merged.rename_map.get("b").map(String::as_str), Some("y"));
        assert_eq!(merged.rename_map.get("x").map(String::as_str), Some("y"));

        let later = serde_json::to_value(&later).unwrap();
        let replaced = merge_queued_states(serde_json::json!("garbage"), later.clone());
        assert_eq!(replaced, later);
    }

    #[test]
    fn batch_is_clamped() {
        assert_eq!(clamp_batch(0), 1);
        assert_eq!(clamp_batch(-5), 1);
        assert_eq!(clamp_batch(50), 50);
        assert_eq!(clamp_batch(500), MAX_BATCH);
    }

    #[test]
    fn status_message_includes_progress_once_counted() {
        let mut checkpoint = RebuildCheckpoint::new("fruit", RenameMap::new());
        assert_eq!(checkpoint.status_message(), "Rebuilding user field \"fruit\" values...");
        checkpoint.total = Some(10);
        checkpoint.processed = 3;
        assert_eq!(
            checkpoint.status_message(),
            "Rebuilding user field \"fruit\" values... 3/10"
        );
    }

    #[test]
    fn checkpoint_defaults_fill_missing_fields() {
        let checkpoint: RebuildCheckpoint =
            serde_json::from_value(serde_json::json!({"field_id": "fruit"})).unwrap();
        assert_eq!(checkpoint, RebuildCheckpoint::new("fruit", RenameMap::new()));
        assert_eq!(unique_key("fruit"), "user_field_value_rebuild_fruit");
    }
}
