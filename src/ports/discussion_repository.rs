//! DiscussionRepository port - persistence for Discussion aggregates.

use async_trait::async_trait;

use crate::domain::discussion::{Discussion, DiscussionStatus};
use crate::domain::foundation::{DiscussionId, DomainError, EventEnvelope};
use crate::domain::vote::Tally;

/// Repository port for Discussion aggregate persistence.
///
/// Implementations must:
/// - Hide tombstoned discussions from every finder
/// - Apply writes only while the stored status equals `expected_status`
/// - Write the given events to the outbox in the same transaction as the row
/// - Leave the session pointer alone; `VotingSessionRepository` owns it
#[async_trait]
pub trait DiscussionRepository: Send + Sync {
    /// Insert a new discussion.
    async fn save(&self, discussion: &Discussion) -> Result<(), DomainError>;

    /// Persist a status change or tombstone.
    ///
    /// Only the lifecycle columns (status, `updated_at`, `deleted_at`) are
    /// written; content edited concurrently is kept.
    ///
    /// # Errors
    ///
    /// - `DiscussionNotFound` if the row is gone or tombstoned
    /// - `Conflict` if the stored status no longer equals `expected_status`;
    ///   nothing is written in that case, including the events
    async fn update(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError>;

    /// Persist subject, content and attachment.
    ///
    /// # Errors
    ///
    /// - `DiscussionNotFound` if the row is gone or tombstoned
    /// - `Conflict` if the stored status no longer equals `expected_status`
    async fn update_content(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
    ) -> Result<(), DomainError>;

    /// Lock a discussion for resolution and count its ballots under the lock.
    ///
    /// Ballot writes on the discussion wait until the returned resolution is
    /// committed or dropped, so the tally it reports is the one recorded.
    ///
    /// # Errors
    ///
    /// - `DiscussionNotFound` if the row is gone or tombstoned
    /// - `Conflict` if the stored status no longer equals `expected_status`
    async fn begin_resolution(
        &self,
        id: &DiscussionId,
        expected_status: DiscussionStatus,
    ) -> Result<Box<dyn Resolution>, DomainError>;

    /// Find a live discussion by ID.
    async fn find_by_id(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError>;

    /// Find the live discussions among `ids`. Missing IDs are simply absent.
    async fn find_by_ids(&self, ids: &[DiscussionId]) -> Result<Vec<Discussion>, DomainError>;
}

/// One open resolution transaction.
///
/// Dropping it without committing releases the lock and writes nothing.
#[async_trait]
pub trait Resolution: Send {
    /// Ballots counted inside the transaction.
    fn tally(&self) -> Tally;

    /// Write the resolved status and the events, then release the lock.
    async fn commit(
        self: Box<Self>,
        discussion: &Discussion,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn DiscussionRepository, _: Box<dyn Resolution>) {}
}
