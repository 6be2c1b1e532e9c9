//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?addon_id=` selector used by the clear endpoints.
#[derive(Debug, Deserialize)]
pub struct AddonIdParams {
    pub addon_id: Option<String>,
}
