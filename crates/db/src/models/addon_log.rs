//! Add-on log entries and their aggregate views.
//!
//! Log rows are append-only: there is no update DTO.

use addonlog_core::level::LogLevel;
use addonlog_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `addon_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AddonLog {
    pub id: DbId,
    pub addon_id: String,
    pub created_at: Timestamp,
    pub level: String,
    pub message: String,
    /// `None` for system-originated entries.
    pub user_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
}

/// DTO for inserting a log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAddonLog {
    pub addon_id: String,
    pub level: LogLevel,
    pub message: String,
    pub user_id: Option<DbId>,
    pub details: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Per-add-on totals from one GROUP BY pass, joined to the registry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AddonLogSummary {
    pub addon_id: String,
    pub log_count: i64,
    pub emergency_count: i64,
    pub alert_count: i64,
    pub critical_count: i64,
    pub error_count: i64,
    pub warning_count: i64,
    pub notice_count: i64,
    pub info_count: i64,
    pub debug_count: i64,
    pub latest_log_at: Option<Timestamp>,
    /// Registry columns; `None` when the add-on is no longer installed.
    pub title: Option<String>,
    pub version_string: Option<String>,
    pub is_active: Option<bool>,
}

impl AddonLogSummary {
    /// Count for one level.
    pub fn count_for(&self, level: LogLevel) -> i64 {
        match level {
            LogLevel::Debug => self.debug_count,
            LogLevel::Info => self.info_count,
            LogLevel::Notice => self.notice_count,
            LogLevel::Warning => self.warning_count,
            LogLevel::Error => self.error_count,
            LogLevel::Critical => self.critical_count,
            LogLevel::Alert => self.alert_count,
            LogLevel::Emergency => self.emergency_count,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.title.is_some()
    }
}

/// Counts of the dashboard's high-priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct HighPriorityCounts {
    pub emergency_count: i64,
    pub critical_count: i64,
    pub alert_count: i64,
    pub error_count: i64,
}

impl HighPriorityCounts {
    pub fn total(&self) -> i64 {
        self.emergency_count + self.critical_count + self.alert_count + self.error_count
    }
}

/// An actor appearing in an add-on's logs.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct LogActor {
    /// `None` for the system actor.
    pub user_id: Option<DbId>,
    pub username: String,
}

/// Values offered by the log browser's filter controls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogFilterBits {
    pub types: Vec<String>,
    pub users: Vec<LogActor>,
}
