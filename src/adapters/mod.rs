//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - Event bus, outbox relay and idempotent handler wrapper
//! - `memory` - In-process store implementing every persistence port
//! - `postgres` - PostgreSQL repositories and the LISTEN notification source

pub mod events;
pub mod memory;
pub mod postgres;

pub use events::{IdempotentHandler, InMemoryEventBus, OutboxPublisher, OutboxPublisherConfig};
pub use memory::InMemoryGovernanceStore;
pub use postgres::{
    PostgresDiscussionRepository, PostgresMembershipDirectory, PostgresNotificationSource,
    PostgresOutboxWriter, PostgresPendingActionStore, PostgresProcessedEventStore,
    PostgresVoteLedger, PostgresVotingSessionRepository, MIGRATOR,
};
