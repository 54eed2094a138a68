//! EventPublisher port.
//!
//! Only the outbox relay publishes. Application handlers hand their events
//! to a repository, which stores them in the outbox with the state change.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Delivers one envelope to whoever subscribed to its type.
///
/// An `Err` leaves the outbox row pending, so the same envelope may be
/// delivered again.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}
