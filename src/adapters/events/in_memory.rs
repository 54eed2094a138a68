//! In-process event bus the outbox relay publishes to.
//!
//! Handlers for a type run one after another in subscription order. A
//! failing handler does not stop the rest; the publish still reports an
//! error so the relay retries the row.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

#[derive(Default)]
struct Routes {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    delivered: Vec<EventEnvelope>,
}

/// Routes envelopes by `event_type` and keeps a log of what it saw.
#[derive(Default)]
pub struct InMemoryEventBus {
    routes: Mutex<Routes>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, Routes> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn event_count(&self) -> usize {
        self.routes().delivered.len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.routes()
            .delivered
            .iter()
            .any(|e| e.event_type == event_type)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        // Snapshot the handler list; the lock must not be held across awaits.
        let handlers = {
            let mut routes = self.routes();
            routes.delivered.push(event.clone());
            routes
                .handlers
                .get(&event.event_type)
                .cloned()
                .unwrap_or_default()
        };

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            handlers = handlers.len(),
            "Dispatching event"
        );

        let mut failed = Vec::new();
        for handler in &handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    event_id = %event.event_id,
                    handler = handler.name(),
                    error = %e,
                    "Event handler failed"
                );
                failed.push(handler.name());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InternalError,
                format!("{} failed on {}", failed.join(", "), event.event_id),
            ))
        }
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.routes()
            .handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }
}
