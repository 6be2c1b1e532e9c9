//! The add-on log writer.
//!
//! Writing a log never fails from the caller's point of view. An entry for
//! an add-on that is not installed is saved once more under the host
//! platform; any other failure is reported through `tracing` and dropped.

use std::collections::HashSet;
use std::sync::Arc;

use addonlog_core::addon::HOST_PLATFORM_ADDON_ID;
use addonlog_core::attribution::{resolve_owner, CallChain};
use addonlog_core::context::{interpolate, LogContext};
use addonlog_core::error::CoreError;
use addonlog_core::fallback::{attempt_with_fallback, Outcome};
use addonlog_core::level::LogLevel;
use addonlog_core::settings::LogSettings;
use addonlog_core::types::DbId;
use addonlog_db::models::addon_log::{AddonLog, CreateAddonLog};
use addonlog_db::repositories::{AddonLogRepo, AddonRepo};
use addonlog_db::DbPool;
use addonlog_events::{EventBus, PlatformEvent};
use serde::Serialize;

use crate::error::WriteError;

/// Source entity type attached to log events.
const EVENT_SOURCE: &str = "addon_log";

// ---------------------------------------------------------------------------
// Webhook event catalogue
// ---------------------------------------------------------------------------

/// One webhook event a subscriber can choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookEventInfo {
    pub event: String,
    pub hint: &'static str,
}

/// The `addon_log.<level>` events, least severe first.
pub fn webhook_events() -> Vec<WebhookEventInfo> {
    LogLevel::ALL
        .iter()
        .map(|level| WebhookEventInfo {
            event: level.event_name(),
            hint: level.event_hint(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// AddonLogger
// ---------------------------------------------------------------------------

/// Writes add-on log entries.
///
/// Cheap to clone; handlers build one per request with the acting user.
#[derive(Clone)]
pub struct AddonLogger {
    pool: DbPool,
    events: Option<Arc<EventBus>>,
    default_addon_id: Option<String>,
    min_level: LogLevel,
    actor_user_id: Option<DbId>,
}

impl AddonLogger {
    /// A logger without a default owner that records every level.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            events: None,
            default_addon_id: None,
            min_level: LogLevel::Debug,
            actor_user_id: None,
        }
    }

    /// A logger whose entries belong to `addon_id` unless the context says
    /// otherwise.
    pub fn for_addon(pool: DbPool, addon_id: impl Into<String>) -> Self {
        Self {
            default_addon_id: Some(addon_id.into()),
            ..Self::new(pool)
        }
    }

    /// Make `addon_id` the owner of entries whose context names none.
    pub fn with_default_addon(mut self, addon_id: impl Into<String>) -> Self {
        self.default_addon_id = Some(addon_id.into());
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_min_level(mut self, min_level: LogLevel) -> Self {
        self.min_level = min_level;
        self
    }

    /// Apply the configured minimum level.
    pub fn with_settings(self, settings: &LogSettings) -> Self {
        self.with_min_level(settings.min_level)
    }

    /// Record `user_id` as the actor of every entry. `None` marks entries
    /// as system-originated.
    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Write an entry. Returns the stored row, or `None` when the level is
    /// below the minimum or nothing could be saved.
    pub async fn log(
        &self,
        level: LogLevel,
        message: &str,
        context: LogContext,
    ) -> Option<AddonLog> {
        if !level.passes(self.min_level) {
            return None;
        }
        let owner = self
            .explicit_owner(&context)
            .unwrap_or_else(|| HOST_PLATFORM_ADDON_ID.to_string());
        self.write(owner, level, message, &context).await
    }

    /// Like [`log`](Self::log), attributing the entry by walking `chain`
    /// when neither the context nor the logger names an owner.
    pub async fn log_from(
        &self,
        chain: &CallChain,
        level: LogLevel,
        message: &str,
        context: LogContext,
    ) -> Option<AddonLog> {
        if !level.passes(self.min_level) {
            return None;
        }
        let owner = match self.explicit_owner(&context) {
            Some(owner) => owner,
            None => self.attribute(chain).await,
        };
        self.write(owner, level, message, &context).await
    }

    pub async fn debug(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Debug, message, context).await
    }

    pub async fn info(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Info, message, context).await
    }

    pub async fn notice(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Notice, message, context).await
    }

    pub async fn warning(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Warning, message, context).await
    }

    pub async fn error(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Error, message, context).await
    }

    pub async fn critical(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Critical, message, context).await
    }

    pub async fn alert(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Alert, message, context).await
    }

    pub async fn emergency(&self, message: &str, context: LogContext) -> Option<AddonLog> {
        self.log(LogLevel::Emergency, message, context).await
    }

    /// Log `message` at error level and hand it back as a validation error
    /// for the handler to return.
    pub async fn logged_error(&self, message: &str, context: LogContext) -> CoreError {
        self.error(message, context).await;
        CoreError::Validation(message.to_string())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn explicit_owner(&self, context: &LogContext) -> Option<String> {
        context
            .addon_id()
            .map(str::to_string)
            .or_else(|| self.default_addon_id.clone())
    }

    async fn attribute(&self, chain: &CallChain) -> String {
        if chain.is_empty() {
            return HOST_PLATFORM_ADDON_ID.to_string();
        }
        match AddonRepo::list_ids(&self.pool).await {
            Ok(ids) => resolve_owner(chain, &ids.into_iter().collect::<HashSet<_>>()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load installed add-ons for attribution");
                HOST_PLATFORM_ADDON_ID.to_string()
            }
        }
    }

    async fn write(
        &self,
        owner: String,
        level: LogLevel,
        message: &str,
        context: &LogContext,
    ) -> Option<AddonLog> {
        let message = interpolate(message, context);
        let details = context.details();

        let outcome = attempt_with_fallback(
            owner,
            |addon_id: String| {
                let input = CreateAddonLog {
                    addon_id,
                    level,
                    message: message.clone(),
                    user_id: self.actor_user_id,
                    details: details.clone(),
                };
                async move { self.save(&input).await }
            },
            |err, addon_id| match err {
                WriteError::UnknownAddon(_) if addon_id != HOST_PLATFORM_ADDON_ID => {
                    Some(HOST_PLATFORM_ADDON_ID.to_string())
                }
                _ => None,
            },
        )
        .await;

        match outcome {
            Outcome::Saved(log) => {
                self.publish(&log).await;
                Some(log)
            }
            Outcome::SavedWithFallback(log) => {
                tracing::warn!(
                    log_id = log.id,
                    "Add-on log owner is not installed, saved under the host platform"
                );
                self.publish(&log).await;
                Some(log)
            }
            Outcome::GaveUp(e) => {
                tracing::error!(error = %e, log_level = %level, "Error saving add-on log");
                None
            }
        }
    }

    async fn save(&self, input: &CreateAddonLog) -> Result<AddonLog, WriteError> {
        AddonLogRepo::create(&self.pool, input)
            .await?
            .ok_or_else(|| WriteError::UnknownAddon(input.addon_id.clone()))
    }

    async fn publish(&self, log: &AddonLog) {
        let Some(events) = &self.events else {
            return;
        };

        let addon = match AddonRepo::find(&self.pool, &log.addon_id).await {
            Ok(addon) => addon,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    addon_id = %log.addon_id,
                    "Failed to load add-on for log event"
                );
                None
            }
        };

        let event_name = match log.level.parse::<LogLevel>() {
            Ok(level) => level.event_name(),
            Err(_) => return,
        };

        events.publish(
            PlatformEvent::new(event_name)
                .with_source(EVENT_SOURCE, log.id)
                .with_actor(log.user_id)
                .with_payload(serde_json::json!({ "log": log, "addon": addon })),
        );
    }
}
