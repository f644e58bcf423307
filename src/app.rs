//! The dispatch loop, decoupled from the entry point.

use crate::event::StatemonitorEvent;
use crate::handlers::Handler;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Hands every received event to the active handler, one at a time and in
/// the order received.
pub struct Dispatcher {
    handler: Arc<dyn Handler>,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    /// Runs until the event channel closes or a shutdown is signalled.
    ///
    /// A shutdown is only observed between events; an in-flight delivery
    /// always completes. Returns the number of events handled.
    pub async fn run(
        self,
        mut events_rx: mpsc::Receiver<StatemonitorEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> usize {
        info!(handler = self.handler.name(), "Dispatcher started.");
        let mut handled = 0;
        loop {
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.changed() => {
                    info!("Dispatcher received shutdown signal.");
                    break;
                }
                event = events_rx.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed. Dispatcher shutting down.");
                        break;
                    };
                    debug!(kind = %event.kind, name = %event.name, reason = %event.reason, "Dispatching event");
                    self.handler.handle(&event).await;
                    handled += 1;
                }
            }
        }
        info!("Dispatcher finished after {} events.", handled);
        handled
    }
}
