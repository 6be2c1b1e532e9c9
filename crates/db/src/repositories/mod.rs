//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod addon_log_repo;
pub mod addon_repo;
pub mod admin_permission_repo;
pub mod background_job_repo;
pub mod user_field_repo;
pub mod user_repo;
pub mod webhook_repo;

pub use addon_log_repo::AddonLogRepo;
pub use addon_repo::AddonRepo;
pub use admin_permission_repo::AdminPermissionRepo;
pub use background_job_repo::BackgroundJobRepo;
pub use user_field_repo::UserFieldRepo;
pub use user_repo::UserRepo;
pub use webhook_repo::WebhookRepo;
