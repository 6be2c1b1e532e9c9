use addonlog_core::settings::LogSettings;

/// Job runner configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Wall-clock allowance of one job step, in seconds.
    pub max_run_secs: u64,
    /// Seconds between polls for due jobs.
    pub poll_interval_secs: u64,
    /// Delay before a job that hit an error is retried.
    pub retry_delay_secs: u64,
    /// A running job untouched this long is reclaimed.
    pub stale_after_secs: u64,
    /// Minimum level of the entries the runner writes.
    pub logs: LogSettings,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_run_secs: 8,
            poll_interval_secs: 2,
            retry_delay_secs: 30,
            stale_after_secs: 300,
            logs: LogSettings::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `JOB_MAX_RUN_SECS`       | `8`     |
    /// | `JOB_POLL_INTERVAL_SECS` | `2`     |
    /// | `JOB_RETRY_DELAY_SECS`   | `30`    |
    /// | `JOB_STALE_AFTER_SECS`   | `300`   |
    pub fn from_env() -> Self {
        let max_run_secs: u64 = std::env::var("JOB_MAX_RUN_SECS")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("JOB_MAX_RUN_SECS must be a valid u64");

        let poll_interval_secs: u64 = std::env::var("JOB_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("JOB_POLL_INTERVAL_SECS must be a valid u64");

        let retry_delay_secs: u64 = std::env::var("JOB_RETRY_DELAY_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("JOB_RETRY_DELAY_SECS must be a valid u64");

        let stale_after_secs: u64 = std::env::var("JOB_STALE_AFTER_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("JOB_STALE_AFTER_SECS must be a valid u64");

        Self {
            max_run_secs,
            poll_interval_secs,
            retry_delay_secs,
            stale_after_secs,
            logs: LogSettings::from_env(),
        }
    }
}
