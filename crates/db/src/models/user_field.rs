//! Custom user profile fields and stored values.

use addonlog_core::choices::{choices_from_json, Choices};
use addonlog_core::types::{DbId, Timestamp};
use addonlog_core::user_field::{UserFieldOverrides, VALID_FIELD_TYPES};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `user_fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserField {
    pub field_id: String,
    pub title: String,
    pub description: String,
    pub field_type: String,
    pub display_group: String,
    pub display_order: i32,
    pub required: bool,
    pub user_editable: String,
    pub moderator_editable: bool,
    pub show_registration: bool,
    pub viewable_profile: bool,
    pub viewable_message: bool,
    pub max_length: i32,
    pub field_choices: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserField {
    /// Choice set as key to label.
    pub fn choices(&self) -> Choices {
        choices_from_json(&self.field_choices)
    }

    pub fn has_valid_type(&self) -> bool {
        VALID_FIELD_TYPES.contains(&self.field_type.as_str())
    }
}

/// DTO for installing a field. Options not given take the install defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserField {
    pub field_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub options: UserFieldOverrides,
}

/// A row from the `user_field_values` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserFieldValue {
    pub user_id: DbId,
    pub field_id: String,
    pub field_value: String,
}
