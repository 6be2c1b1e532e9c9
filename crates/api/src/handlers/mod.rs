pub mod addon_logs;
pub mod jobs;
pub mod user_fields;
pub mod webhooks;
