//! ProcessedEventStore port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId};

/// Which handler already handled which event.
///
/// Keys are `(event_id, handler_name)`; two handlers subscribed to the same
/// type each get their own entry.
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    async fn contains(&self, event_id: &EventId, handler_name: &str)
        -> Result<bool, DomainError>;

    /// Recording an existing key is a no-op.
    async fn mark_processed(
        &self,
        event_id: &EventId,
        handler_name: &str,
    ) -> Result<(), DomainError>;
}
