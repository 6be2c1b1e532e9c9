//! Background job runner.
//!
//! Claims due jobs from `background_jobs` and advances them one bounded
//! step at a time, persisting the checkpoint between steps.

pub mod config;
pub mod error;
pub mod jobs;

pub use config::WorkerConfig;
pub use error::JobError;
pub use jobs::runner::JobRunner;
