//! Integration tests for the background job runner.

use addonlog_core::choices::Choices;
use addonlog_core::rebuild::{merge_queued_states, unique_key, RebuildCheckpoint, JOB_TYPE};
use addonlog_core::types::DbId;
use addonlog_core::user_field::{UserFieldOptions, FIELD_TYPE_SELECT};
use addonlog_db::models::background_job::{BackgroundJob, EnqueueJob};
use addonlog_db::repositories::{BackgroundJobRepo, UserFieldRepo};
use addonlog_worker::{JobRunner, WorkerConfig};
use sqlx::PgPool;

fn choices(pairs: &[(&str, &str)]) -> Choices {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn create_fruit_field(pool: &PgPool) {
    let options = UserFieldOptions {
        field_type: FIELD_TYPE_SELECT.to_string(),
        field_choices: choices(&[("a", "Apple"), ("x", "Banana")]),
        ..UserFieldOptions::default()
    };
    UserFieldRepo::create(pool, "fruit", "Fruit", "", &options)
        .await
        .unwrap();
}

async fn enqueue_checkpoint(pool: &PgPool, checkpoint: &RebuildCheckpoint) -> BackgroundJob {
    BackgroundJobRepo::enqueue_unique(
        pool,
        &EnqueueJob {
            unique_key: Some(unique_key(&checkpoint.field_id)),
            job_type: JOB_TYPE.to_string(),
            state: serde_json::to_value(checkpoint).unwrap(),
            status_message: Some(checkpoint.status_message()),
        },
        merge_queued_states,
    )
    .await
    .unwrap()
}

async fn enqueue_rebuild(pool: &PgPool, field_id: &str) -> BackgroundJob {
    let rename_map = choices(&[("b", "x")]);
    enqueue_checkpoint(pool, &RebuildCheckpoint::new(field_id, rename_map)).await
}

/// Run steps until no job is due.
async fn drain(runner: &JobRunner) {
    while runner.run_next().await.unwrap().is_some() {}
}

async fn value(pool: &PgPool, user_id: DbId) -> String {
    UserFieldRepo::find_value(pool, user_id, "fruit")
        .await
        .unwrap()
        .unwrap()
}

async fn count_level(pool: &PgPool, level: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM addon_logs WHERE addon_id = 'Sylphian/Library' AND level = $1",
    )
    .bind(level)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn runner(pool: &PgPool, max_run_secs: u64) -> JobRunner {
    JobRunner::new(
        pool.clone(),
        WorkerConfig {
            max_run_secs,
            ..WorkerConfig::default()
        },
    )
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rebuild_rewrites_values_and_completes(pool: PgPool) {
    create_fruit_field(&pool).await;
    for (user_id, raw) in [(1, "b"), (2, "a,b"), (3, r#"["b","zzz"]"#), (4, "a"), (6, "q")] {
        UserFieldRepo::set_value(&pool, user_id, "fruit", raw)
            .await
            .unwrap();
    }
    let job = enqueue_rebuild(&pool, "fruit").await;

    assert_eq!(runner(&pool, 60).run_next().await.unwrap(), Some(job.id));

    assert_eq!(value(&pool, 1).await, "x");
    assert_eq!(value(&pool, 2).await, "a,x");
    assert_eq!(value(&pool, 3).await, r#"["x"]"#);
    assert_eq!(value(&pool, 4).await, "a");
    assert_eq!(value(&pool, 6).await, "");

    let job = BackgroundJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.status, "completed");
    assert_eq!(job.state["processed"], 5);
    assert_eq!(job.state["total"], 5);

    assert_eq!(count_level(&pool, "notice").await, 4);
    assert_eq!(count_level(&pool, "info").await, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_run_corrects_nothing(pool: PgPool) {
    create_fruit_field(&pool).await;
    UserFieldRepo::set_value(&pool, 1, "fruit", "b").await.unwrap();

    enqueue_rebuild(&pool, "fruit").await;
    runner(&pool, 60).run_next().await.unwrap();
    enqueue_rebuild(&pool, "fruit").await;
    runner(&pool, 60).run_next().await.unwrap();

    assert_eq!(value(&pool, 1).await, "x");
    assert_eq!(count_level(&pool, "notice").await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn exhausted_budget_suspends_with_checkpoint(pool: PgPool) {
    create_fruit_field(&pool).await;
    UserFieldRepo::set_value(&pool, 1, "fruit", "b").await.unwrap();
    let job = enqueue_rebuild(&pool, "fruit").await;

    runner(&pool, 0).run_next().await.unwrap();

    let job = BackgroundJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.status, "pending");
    assert_eq!(job.state["total"], 1);
    assert_eq!(job.state["processed"], 0);
    assert_eq!(
        job.status_message.as_deref(),
        Some("Rebuilding user field \"fruit\" values... 0/1")
    );
    assert_eq!(value(&pool, 1).await, "b");

    runner(&pool, 60).run_next().await.unwrap();
    assert_eq!(value(&pool, 1).await, "x");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_field_completes_with_a_warning(pool: PgPool) {
    let job = enqueue_rebuild(&pool, "ghost").await;

    runner(&pool, 60).run_next().await.unwrap();

    let job = BackgroundJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.status, "completed");
    assert_eq!(count_level(&pool, "warning").await, 1);
    assert_eq!(count_level(&pool, "error").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_job_type_fails(pool: PgPool) {
    let job = BackgroundJobRepo::enqueue_unique(
        &pool,
        &EnqueueJob {
            unique_key: None,
            job_type: "mystery".to_string(),
            state: serde_json::json!({}),
            status_message: None,
        },
        |_, new| new,
    )
    .await
    .unwrap();

    runner(&pool, 60).run_next().await.unwrap();

    let job = BackgroundJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.status, "failed");
    assert_eq!(job.status_message.as_deref(), Some("Unknown job type 'mystery'"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_jobs_are_not_claimed(pool: PgPool) {
    let job = enqueue_rebuild(&pool, "fruit").await;
    assert!(BackgroundJobRepo::cancel(&pool, job.id).await.unwrap());

    assert_eq!(runner(&pool, 60).run_next().await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn choice_edit_during_a_pass_runs_after_it(pool: PgPool) {
    create_fruit_field(&pool).await;
    UserFieldRepo::set_value(&pool, 1, "fruit", "a").await.unwrap();
    UserFieldRepo::set_value(&pool, 2, "fruit", "b").await.unwrap();

    let first = RebuildCheckpoint::new("fruit", choices(&[("b", "x")])).with_allowed(["a", "x"]);
    let job = enqueue_checkpoint(&pool, &first).await;
    let claimed = BackgroundJobRepo::claim_next(&pool, 300.0).await.unwrap().unwrap();
    assert_eq!(claimed.id, job.id);

    // Apple is renamed from a to z while the first pass is running.
    let edited = choices(&[("z", "Apple"), ("x", "Banana")]);
    UserFieldRepo::update_choices(&pool, "fruit", &edited)
        .await
        .unwrap()
        .unwrap();
    let second = RebuildCheckpoint::new("fruit", choices(&[("a", "z")])).with_allowed(["z", "x"]);
    let queued = enqueue_checkpoint(&pool, &second).await;
    assert_eq!(queued.status, "running");
    assert_eq!(queued.state["rename_map"], serde_json::json!({"b": "x"}));
    assert_eq!(queued.next_state.unwrap()["rename_map"], serde_json::json!({"a": "z"}));

    // The worker that claimed the first pass died; a new runner picks it up.
    sqlx::query("UPDATE background_jobs SET updated_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();
    drain(&runner(&pool, 60)).await;

    assert_eq!(value(&pool, 1).await, "z");
    assert_eq!(value(&pool, 2).await, "x");

    let job = BackgroundJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(job.status, "completed");
    assert_eq!(job.next_state, None);
    assert_eq!(job.state["rename_map"], serde_json::json!({"a": "z"}));
}
