//! Domain logic for add-on logging: severity levels, attribution, message
//! interpolation, log filters, retention, permissions and the user field
//! value rebuild. Zero internal dependencies.

pub mod addon;
pub mod attribution;
pub mod choices;
pub mod context;
pub mod error;
pub mod fallback;
pub mod field_value;
pub mod level;
pub mod log_filter;
pub mod permission;
pub mod rebuild;
pub mod retention;
pub mod roles;
pub mod settings;
pub mod types;
pub mod user_field;
