//! Periodic pruning of old add-on log entries.

use std::time::Duration;

use addonlog_core::settings::LogSettings;
use addonlog_db::DbPool;
use addonlog_logger::prune_logs;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// Run the retention loop until `cancel` fires.
///
/// The first sweep runs immediately, then every `cleanup_interval_secs`.
/// Returns at once when retention is disabled.
pub async fn run(pool: DbPool, settings: LogSettings, cancel: CancellationToken) {
    if settings.retention_days == 0 {
        tracing::info!("Add-on log retention disabled");
        return;
    }

    let every = Duration::from_secs(settings.cleanup_interval_secs.max(1));
    tracing::info!(
        retention_days = settings.retention_days,
        interval_secs = every.as_secs(),
        "Add-on log retention job started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Add-on log retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match prune_logs(&pool, &settings, Utc::now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Add-on log retention: pruned old entries");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Add-on log retention: prune failed");
                    }
                }
            }
        }
    }
}
