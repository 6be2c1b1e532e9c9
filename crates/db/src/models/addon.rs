//! Installed add-on registry.

use addonlog_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `addons` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Addon {
    pub addon_id: String,
    pub title: String,
    pub version_string: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// DTO for registering an add-on.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAddon {
    pub addon_id: String,
    pub title: String,
    pub version_string: Option<String>,
}
