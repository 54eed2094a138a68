//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus the relay publishes to
//! - `IdempotentHandler` - Wrapper for at-most-once handling per handler
//! - `OutboxPublisher` - Background relay from the outbox to the bus

mod idempotent_handler;
mod in_memory;
mod outbox_publisher;

pub use idempotent_handler::IdempotentHandler;
pub use in_memory::InMemoryEventBus;
pub use outbox_publisher::{OutboxPublisher, OutboxPublisherConfig};
