//! VoteLedger port - one ballot per (discussion, voter).

use async_trait::async_trait;

use crate::domain::foundation::{DiscussionId, DomainError};
use crate::domain::vote::{Ballot, Tally};

/// Port for ballot storage.
///
/// `upsert` must be a single atomic insert-or-update keyed on
/// (discussion, voter): concurrent casts by the same voter leave exactly one
/// row holding the last written value. The discussion status is checked in
/// the same transaction as the write, under a lock that a status change or
/// an open `Resolution` has to wait for.
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Insert the ballot or overwrite the voter's previous one.
    ///
    /// # Errors
    ///
    /// - `DiscussionNotFound` if the discussion is gone or tombstoned
    /// - `Forbidden` unless the discussion is VOTING or FINAL_VOTING when
    ///   the write lands
    async fn upsert(&self, ballot: &Ballot) -> Result<(), DomainError>;

    /// Count current ballots of a discussion.
    async fn tally(&self, discussion_id: &DiscussionId) -> Result<Tally, DomainError>;

    /// Current ballots of a discussion, oldest cast first.
    async fn ballots_for(&self, discussion_id: &DiscussionId) -> Result<Vec<Ballot>, DomainError>;
}
