use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use addonlog_worker::{JobRunner, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "addonlog_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = addonlog_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    addonlog_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let cancel = CancellationToken::new();
    let runner = JobRunner::new(pool, config);
    let runner_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        runner.run(runner_cancel).await;
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown requested");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    tracing::info!("Worker stopped");
}
