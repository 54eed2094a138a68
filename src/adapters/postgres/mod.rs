//! PostgreSQL adapters - Database implementations for the governance ports.
//!
//! - `PostgresDiscussionRepository` - Discussions with conditional status writes
//! - `PostgresVoteLedger` - Ballot upsert and tally
//! - `PostgresPendingActionStore` - Action queue with row-locked executions
//! - `PostgresVotingSessionRepository` - Sessions and atomic phase commits
//! - `PostgresOutboxWriter` / `PostgresProcessedEventStore` - Event delivery
//! - `PostgresMembershipDirectory` - Caller lookup
//! - `PostgresNotificationSource` - LISTEN connection for the scheduler

mod discussion_repository;
mod membership_directory;
mod notification_source;
mod outbox_writer;
mod pending_action_store;
mod processed_event_store;
mod support;
mod vote_ledger;
mod voting_session_repository;

pub use discussion_repository::PostgresDiscussionRepository;
pub use membership_directory::PostgresMembershipDirectory;
pub use notification_source::PostgresNotificationSource;
pub use outbox_writer::PostgresOutboxWriter;
pub use pending_action_store::PostgresPendingActionStore;
pub use processed_event_store::PostgresProcessedEventStore;
pub use vote_ledger::PostgresVoteLedger;
pub use voting_session_repository::PostgresVotingSessionRepository;

use sqlx::migrate::Migrator;

/// Schema migrations under `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
