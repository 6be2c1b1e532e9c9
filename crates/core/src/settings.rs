use crate::level::LogLevel;
use crate::retention::RetentionPolicy;

/// Add-on logging options loaded from environment variables.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Days of logs to keep; `0` keeps everything (default: `30`).
    pub retention_days: u32,
    /// Whether a prune writes its own debug entry (default: `true`).
    pub prune_audit: bool,
    /// Entries below this level are dropped (default: `debug`).
    pub min_level: LogLevel,
    /// Seconds between retention sweeps (default: `3600`).
    pub cleanup_interval_secs: u64,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            retention_days: 30,
            prune_audit: true,
            min_level: LogLevel::Debug,
            cleanup_interval_secs: 3600,
        }
    }
}

impl LogSettings {
    /// Load settings from environment variables with defaults.
    ///
    /// | Env Var                           | Default |
    /// |-----------------------------------|---------|
    /// | `ADDON_LOG_RETENTION_DAYS`        | `30`    |
    /// | `ADDON_LOG_PRUNE_AUDIT`           | `true`  |
    /// | `ADDON_LOG_MIN_LEVEL`             | `debug` |
    /// | `ADDON_LOG_CLEANUP_INTERVAL_SECS` | `3600`  |
    pub fn from_env() -> Self {
        let retention_days: u32 = std::env::var("ADDON_LOG_RETENTION_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("ADDON_LOG_RETENTION_DAYS must be a valid u32");

        let prune_audit: bool = std::env::var("ADDON_LOG_PRUNE_AUDIT")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("ADDON_LOG_PRUNE_AUDIT must be true or false");

        let min_level: LogLevel = std::env::var("ADDON_LOG_MIN_LEVEL")
            .unwrap_or_else(|_| "debug".into())
            .parse()
            .expect("ADDON_LOG_MIN_LEVEL must be a valid log level");

        let cleanup_interval_secs: u64 = std::env::var("ADDON_LOG_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("ADDON_LOG_CLEANUP_INTERVAL_SECS must be a valid u64");

        Self {
            retention_days,
            prune_audit,
            min_level,
            cleanup_interval_secs,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention_days)
    }
}
