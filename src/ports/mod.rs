//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the governance domain and the outside world. Adapters implement them.
//!
//! ## Governance Ports
//!
//! - `MembershipDirectory` - Caller lookup (party memberships, manager role)
//! - `DiscussionRepository` - Discussion persistence with optimistic status writes
//!   and locked resolution
//! - `VoteLedger` - Ballot upsert and tally
//! - `PendingActionStore` - Pending action queue with per-action transactions
//! - `VotingSessionRepository` - Voting sessions and atomic phase commits
//! - `NotificationSource` - Listener connection feeding the phase scheduler
//!
//! ## Event Ports
//!
//! - `OutboxWriter` - Transactional outbox read by the relay
//! - `EventPublisher` / `EventSubscriber` / `EventHandler` - Event bus
//! - `ProcessedEventStore` - Idempotency tracking for event handlers

mod discussion_repository;
mod event_publisher;
mod event_subscriber;
mod membership_directory;
mod notification_source;
mod outbox_writer;
mod pending_action_store;
mod processed_event_store;
mod vote_ledger;
mod voting_session_repository;

pub use discussion_repository::{DiscussionRepository, Resolution};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use membership_directory::MembershipDirectory;
pub use notification_source::{Notification, NotificationSource};
pub use outbox_writer::{OutboxEntry, OutboxStatus, OutboxWriter};
pub use pending_action_store::{ActionExecution, OrganizationChanges, PendingActionStore};
pub use processed_event_store::ProcessedEventStore;
pub use vote_ledger::VoteLedger;
pub use voting_session_repository::{
    DiscussionPhaseChange, PhaseCommit, VotingSessionRepository,
};
