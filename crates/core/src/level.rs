//! Severity levels for add-on log entries.
//!
//! The eight PSR-style levels, ordered from least to most severe. The string
//! form is what gets stored in `addon_logs.level` and what webhook event
//! names are built from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Level constants
// ---------------------------------------------------------------------------

pub const DEBUG: &str = "debug";
pub const INFO: &str = "info";
pub const NOTICE: &str = "notice";
pub const WARNING: &str = "warning";
pub const ERROR: &str = "error";
pub const CRITICAL: &str = "critical";
pub const ALERT: &str = "alert";
pub const EMERGENCY: &str = "emergency";

/// Prefix for the per-level webhook event names (`addon_log.error`, ...).
pub const EVENT_PREFIX: &str = "addon_log";

// ---------------------------------------------------------------------------
// LogLevel
// ---------------------------------------------------------------------------

/// Severity of a log entry. Variant order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    /// Every level, least severe first.
    pub const ALL: [LogLevel; 8] = [
        Self::Debug,
        Self::Info,
        Self::Notice,
        Self::Warning,
        Self::Error,
        Self::Critical,
        Self::Alert,
        Self::Emergency,
    ];

    /// Levels that light up the admin dashboard alert indicator.
    pub const HIGH_PRIORITY: [LogLevel; 4] =
        [Self::Emergency, Self::Critical, Self::Alert, Self::Error];

    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => DEBUG,
            Self::Info => INFO,
            Self::Notice => NOTICE,
            Self::Warning => WARNING,
            Self::Error => ERROR,
            Self::Critical => CRITICAL,
            Self::Alert => ALERT,
            Self::Emergency => EMERGENCY,
        }
    }

    /// Numeric priority, 0 for debug up to 7 for emergency.
    pub fn priority(&self) -> u8 {
        *self as u8
    }

    /// Whether an entry at this level passes a minimum-level threshold.
    pub fn passes(&self, minimum: LogLevel) -> bool {
        *self >= minimum
    }

    /// Webhook event name for entries at this level.
    pub fn event_name(&self) -> String {
        format!("{EVENT_PREFIX}.{}", self.as_str())
    }

    /// Human hint shown next to the event in webhook configuration.
    pub fn event_hint(&self) -> &'static str {
        match self {
            Self::Debug => "When a debug level log is created",
            Self::Info => "When an info level log is created",
            Self::Notice => "When a notice level log is created",
            Self::Warning => "When a warning level log is created",
            Self::Error => "When an error level log is created",
            Self::Critical => "When a critical level log is created",
            Self::Alert => "When an alert level log is created",
            Self::Emergency => "When an emergency level log is created",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown log level: '{s}'. Valid levels: {}",
                    Self::ALL.map(|l| l.as_str()).join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
