//! Routes add-on log events from the bus to subscribed webhooks.
//!
//! Each delivery runs in its own task so a slow endpoint retrying with
//! backoff never holds up the next event.

use addonlog_core::level::EVENT_PREFIX;
use addonlog_db::repositories::WebhookRepo;
use addonlog_db::DbPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::PlatformEvent;
use crate::delivery::webhook::WebhookDelivery;

/// Background service delivering log events to webhooks.
pub struct WebhookDispatcher {
    pool: DbPool,
    delivery: WebhookDelivery,
}

impl WebhookDispatcher {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            delivery: WebhookDelivery::new(),
        }
    }

    /// Whether the dispatcher handles this event at all.
    pub fn handles(event: &PlatformEvent) -> bool {
        event
            .event_type
            .strip_prefix(EVENT_PREFIX)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Run until `cancel` fires or the bus is dropped.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Webhook dispatcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Webhook dispatcher stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) if Self::handles(&event) => self.dispatch(event).await,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Webhook dispatcher lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, webhook dispatcher shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn dispatch(&self, event: PlatformEvent) {
        let hooks = match WebhookRepo::list_for_event(&self.pool, &event.event_type).await {
            Ok(hooks) => hooks,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = %event.event_type,
                    "Failed to load webhook subscriptions"
                );
                return;
            }
        };

        for hook in hooks {
            let delivery = self.delivery.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if delivery.deliver(&hook.url, &event).await.is_ok() {
                    tracing::debug!(
                        webhook_id = hook.id,
                        event_type = %event.event_type,
                        "Webhook delivered"
                    );
                }
            });
        }
    }
}
