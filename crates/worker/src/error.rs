/// Failure of one job step.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed job state: {0}")]
    State(#[from] serde_json::Error),

    #[error("Unknown job type '{0}'")]
    UnknownJobType(String),
}

impl JobError {
    /// Whether retrying cannot help. Such jobs are failed instead of
    /// rescheduled.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::State(_) | Self::UnknownJobType(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_are_retried() {
        assert!(!JobError::Database(sqlx::Error::PoolTimedOut).is_permanent());
        assert!(JobError::UnknownJobType("x".into()).is_permanent());

        let bad = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(JobError::State(bad).is_permanent());
    }
}
