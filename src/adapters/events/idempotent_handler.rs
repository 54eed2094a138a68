//! At-most-once wrapper around an [`EventHandler`].
//!
//! The `(event_id, handler name)` pair is looked up before delegating and
//! recorded only after the inner handler succeeded. An error therefore
//! leaves the event eligible for the next delivery.
//!
//! The check and the record are separate calls. Two deliveries racing
//! through the gap both reach the inner handler, so the inner handler must
//! tolerate that on its own (the action executor locks each action row).

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::{EventHandler, ProcessedEventStore};

pub struct IdempotentHandler<H: EventHandler> {
    inner: H,
    processed: Arc<dyn ProcessedEventStore>,
}

impl<H: EventHandler> IdempotentHandler<H> {
    pub fn new(inner: H, processed: Arc<dyn ProcessedEventStore>) -> Self {
        Self { inner, processed }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: EventHandler + 'static> EventHandler for IdempotentHandler<H> {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let name = self.inner.name();
        let event_id = envelope.event_id.clone();

        if self.processed.contains(&event_id, name).await? {
            tracing::debug!(event_id = %event_id, handler = name, "Event already handled");
            return Ok(());
        }

        self.inner.handle(envelope).await?;
        self.processed.mark_processed(&event_id, name).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
