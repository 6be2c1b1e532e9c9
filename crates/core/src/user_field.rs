//! User-selectable custom profile fields: types, install defaults and
//! validation.

use serde::{Deserialize, Serialize};

use crate::choices::Choices;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

pub const FIELD_TYPE_TEXTBOX: &str = "textbox";
pub const FIELD_TYPE_TEXTAREA: &str = "textarea";
pub const FIELD_TYPE_SELECT: &str = "select";
pub const FIELD_TYPE_RADIO: &str = "radio";
pub const FIELD_TYPE_CHECKBOX: &str = "checkbox";
pub const FIELD_TYPE_MULTISELECT: &str = "multiselect";

pub const VALID_FIELD_TYPES: &[&str] = &[
    FIELD_TYPE_TEXTBOX,
    FIELD_TYPE_TEXTAREA,
    FIELD_TYPE_SELECT,
    FIELD_TYPE_RADIO,
    FIELD_TYPE_CHECKBOX,
    FIELD_TYPE_MULTISELECT,
];

/// Field types whose values must be one of the field's choices.
pub const CHOICE_FIELD_TYPES: &[&str] = &[
    FIELD_TYPE_SELECT,
    FIELD_TYPE_RADIO,
    FIELD_TYPE_CHECKBOX,
    FIELD_TYPE_MULTISELECT,
];

/// Longest allowed field id.
pub const MAX_FIELD_ID_LEN: usize = 25;

pub fn is_choice_type(field_type: &str) -> bool {
    CHOICE_FIELD_TYPES.contains(&field_type)
}

// ---------------------------------------------------------------------------
// Install options
// ---------------------------------------------------------------------------

/// Overrides supplied when installing a field. Unset options take the
/// defaults of [`UserFieldOptions::default`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFieldOverrides {
    pub field_type: Option<String>,
    pub display_order: Option<i32>,
    pub display_group: Option<String>,
    pub required: Option<bool>,
    pub user_editable: Option<String>,
    pub moderator_editable: Option<bool>,
    pub show_registration: Option<bool>,
    pub viewable_profile: Option<bool>,
    pub viewable_message: Option<bool>,
    pub max_length: Option<i32>,
    pub field_choices: Option<Choices>,
}

/// Fully resolved field options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFieldOptions {
    pub field_type: String,
    pub display_order: i32,
    pub display_group: String,
    pub required: bool,
    pub user_editable: String,
    pub moderator_editable: bool,
    pub show_registration: bool,
    pub viewable_profile: bool,
    pub viewable_message: bool,
    pub max_length: i32,
    pub field_choices: Choices,
}

impl Default for UserFieldOptions {
    fn default() -> Self {
        Self {
            field_type: FIELD_TYPE_TEXTBOX.to_string(),
            display_order: 1,
            display_group: "personal".to_string(),
            required: false,
            user_editable: "yes".to_string(),
            moderator_editable: true,
            show_registration: false,
            viewable_profile: true,
            viewable_message: false,
            max_length: 0,
            field_choices: Choices::new(),
        }
    }
}

impl UserFieldOptions {
    /// Defaults with `overrides` applied on top.
    pub fn merged(overrides: UserFieldOverrides) -> Self {
        let d = Self::default();
        Self {
            field_type: overrides.field_type.unwrap_or(d.field_type),
            display_order: overrides.display_order.unwrap_or(d.display_order),
            display_group: overrides.display_group.unwrap_or(d.display_group),
            required: overrides.required.unwrap_or(d.required),
            user_editable: overrides.user_editable.unwrap_or(d.user_editable),
            moderator_editable: overrides.moderator_editable.unwrap_or(d.moderator_editable),
            show_registration: overrides.show_registration.unwrap_or(d.show_registration),
            viewable_profile: overrides.viewable_profile.unwrap_or(d.viewable_profile),
            viewable_message: overrides.viewable_message.unwrap_or(d.viewable_message),
            max_length: overrides.max_length.unwrap_or(d.max_length),
            field_choices: overrides.field_choices.unwrap_or(d.field_choices),
        }
    }

    /// Reject unknown types and choice types without choices.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !VALID_FIELD_TYPES.contains(&self.field_type.as_str()) {
            return Err(CoreError::Validation(format!(
                "Invalid field_type '{}'. Must be one of: {}",
                self.field_type,
                VALID_FIELD_TYPES.join(", ")
            )));
        }
        if is_choice_type(&self.field_type) && self.field_choices.is_empty() {
            return Err(CoreError::Validation(format!(
                "Field type '{}' requires field_choices",
                self.field_type
            )));
        }
        Ok(())
    }
}

/// Field ids are 1 to 25 ASCII letters, digits or underscores.
pub fn validate_field_id(field_id: &str) -> Result<(), CoreError> {
    if field_id.is_empty() || field_id.len() > MAX_FIELD_ID_LEN {
        return Err(CoreError::Validation(format!(
            "field_id must be 1 to {MAX_FIELD_ID_LEN} characters"
        )));
    }
    if !field_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CoreError::Validation(
            "field_id may only contain letters, digits and underscores".to_string(),
        ));
    }
    Ok(())
}
