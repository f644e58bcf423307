//! Notification handlers.
//!
//! Every backend implements [`Handler`]: `init` validates and caches the
//! backend's configuration section once at startup, `handle` turns one
//! [`StatemonitorEvent`] into a backend payload and delivers it. Delivery is
//! best effort: `handle` logs the outcome and never hands an error back to
//! the caller, so one failed notification cannot stall the event loop.
//!
//! The active handler is picked by name through [`registry`].

pub mod cloudevent;
pub mod error;
pub mod flock;
pub mod lark;
pub mod mattermost;
pub mod msteam;
pub mod registry;
pub mod slack;
pub mod slackwebhook;
pub mod smtp;
pub mod telegram;
pub(crate) mod transport;
pub mod webhook;

pub use error::{ConfigError, DeliveryError};
pub use registry::{HandlerKind, RegistryError, SetupError};

use crate::config::Config;
use crate::event::StatemonitorEvent;
use async_trait::async_trait;
use tracing::{debug, error, info};

/// The capability set every notification backend provides.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The registry name of this handler (e.g., "slack").
    fn name(&self) -> &'static str;

    /// Reads and validates this handler's configuration section.
    ///
    /// Called exactly once, before any event is handled. An error here is
    /// fatal to startup.
    fn init(&mut self, config: &Config) -> Result<(), ConfigError>;

    /// Transforms `event` into the backend's wire format and sends it.
    async fn deliver(&self, event: &StatemonitorEvent) -> Result<(), DeliveryError>;

    /// Delivers `event` and logs the outcome. Never fails.
    async fn handle(&self, event: &StatemonitorEvent) {
        match self.deliver(event).await {
            Ok(()) => {
                metrics::counter!("notifications_sent_total", "handler" => self.name())
                    .increment(1);
                info!(
                    handler = self.name(),
                    kind = %event.kind,
                    name = %event.name,
                    "Message successfully sent"
                );
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total", "handler" => self.name())
                    .increment(1);
                error!(
                    handler = self.name(),
                    kind = %event.kind,
                    name = %event.name,
                    error = %e,
                    "Failed to send notification"
                );
            }
        }
    }
}

/// Fallback handler used when no backend is configured. Does nothing.
#[derive(Debug, Default)]
pub struct DefaultHandler;

#[async_trait]
impl Handler for DefaultHandler {
    fn name(&self) -> &'static str {
        "default"
    }

    fn init(&mut self, _config: &Config) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn deliver(&self, _event: &StatemonitorEvent) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn handle(&self, event: &StatemonitorEvent) {
        debug!(kind = %event.kind, name = %event.name, reason = %event.reason, "Event dropped by default handler");
    }
}
