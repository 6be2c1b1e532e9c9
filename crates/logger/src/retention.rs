//! Pruning of old add-on log entries.

use addonlog_core::addon::LIBRARY_ADDON_ID;
use addonlog_core::context::LogContext;
use addonlog_core::settings::LogSettings;
use addonlog_core::types::Timestamp;
use addonlog_db::repositories::AddonLogRepo;
use addonlog_db::DbPool;

use crate::logger::AddonLogger;

/// Timestamp format used in the prune audit entry.
const AUDIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Delete entries strictly older than the retention cutoff.
///
/// Does nothing when retention is disabled (`retention_days == 0`). With
/// `prune_audit` on, the run is recorded as a debug entry owned by the
/// library add-on. Returns the number of deleted entries.
pub async fn prune_logs(
    pool: &DbPool,
    settings: &LogSettings,
    now: Timestamp,
) -> Result<u64, sqlx::Error> {
    let Some(cutoff) = settings.retention().cutoff(now) else {
        return Ok(0);
    };

    let deleted = AddonLogRepo::delete_older_than(pool, cutoff).await?;

    tracing::debug!(deleted, cutoff = %cutoff, "Add-on log retention pass");

    if settings.prune_audit {
        let audit = AddonLogger::for_addon(pool.clone(), LIBRARY_ADDON_ID).with_settings(settings);
        if deleted > 0 {
            let context = LogContext::new()
                .with("deleted_records", deleted)
                .with("cutoff_date", cutoff.format(AUDIT_DATE_FORMAT).to_string())
                .with("pruned_date", now.format(AUDIT_DATE_FORMAT).to_string());
            audit.debug("Add-on logs pruned successfully", context).await;
        } else {
            audit.debug("No add-on logs needed pruning", LogContext::new()).await;
        }
    }

    Ok(deleted)
}
