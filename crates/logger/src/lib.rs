//! Structured add-on log writer.
//!
//! [`AddonLogger`] turns a level, a message template and a [`LogContext`]
//! into a stored `addon_logs` row and an `addon_log.<level>` event.
//! [`retention`] prunes old rows.
//!
//! [`LogContext`]: addonlog_core::context::LogContext

pub mod error;
pub mod logger;
pub mod retention;

pub use error::WriteError;
pub use logger::{webhook_events, AddonLogger, WebhookEventInfo};
pub use retention::prune_logs;
