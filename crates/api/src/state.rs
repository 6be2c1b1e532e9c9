use std::sync::Arc;

use addonlog_core::types::DbId;
use addonlog_events::EventBus;
use addonlog_logger::AddonLogger;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: addonlog_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Bus the logger publishes `addon_log.<level>` events on.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// A log writer acting on behalf of `user_id`, honouring the configured
    /// minimum level.
    pub fn logger(&self, user_id: Option<DbId>) -> AddonLogger {
        AddonLogger::new(self.pool.clone())
            .with_events(Arc::clone(&self.event_bus))
            .with_settings(&self.config.logs)
            .with_actor(user_id)
    }
}
