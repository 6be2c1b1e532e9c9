//! Event bus and webhook delivery for add-on log events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope published for every stored log.
//! - [`delivery`]: outbound webhook POSTs with retry.
//! - [`WebhookDispatcher`]: background task routing bus events to the
//!   webhooks subscribed to them.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::webhook::WebhookDelivery;
pub use dispatcher::WebhookDispatcher;
