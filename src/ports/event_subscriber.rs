//! EventSubscriber port and the handler contract.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Consumer of one or more event types.
///
/// Delivery is at-least-once. Wrap a handler in
/// [`crate::adapters::IdempotentHandler`] when a repeat would do harm.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Stable name; part of the processed-event key.
    fn name(&self) -> &'static str;
}

pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);
}
