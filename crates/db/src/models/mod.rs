//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts, where rows are created via the API

pub mod addon;
pub mod addon_log;
pub mod background_job;
pub mod user;
pub mod user_field;
pub mod webhook;
