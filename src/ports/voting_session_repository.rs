//! VotingSessionRepository port - persistence for voting sessions.
//!
//! Session membership is carried by each discussion's session pointer, so
//! every write that changes membership also rewrites those pointers in the
//! same transaction.

use async_trait::async_trait;

use crate::domain::discussion::{Discussion, DiscussionStatus};
use crate::domain::foundation::{DomainError, EventEnvelope, VotingSessionId};
use crate::domain::voting_session::{VotingSession, VotingSessionStatus};

/// A member discussion changed by a phase transition.
#[derive(Debug, Clone)]
pub struct DiscussionPhaseChange {
    pub discussion: Discussion,
    pub expected_status: DiscussionStatus,
}

/// Everything a phase transition writes, committed atomically.
#[derive(Debug, Clone)]
pub struct PhaseCommit {
    pub session: VotingSession,
    pub expected_status: VotingSessionStatus,
    pub discussions: Vec<DiscussionPhaseChange>,
    pub events: Vec<EventEnvelope>,
}

/// Repository port for VotingSession persistence.
#[async_trait]
pub trait VotingSessionRepository: Send + Sync {
    /// Insert a session and point `members` at it.
    async fn save(
        &self,
        session: &VotingSession,
        members: &[Discussion],
    ) -> Result<(), DomainError>;

    /// Persist session fields and rewrite the session pointers of
    /// `rebound` discussions (added ones point at the session, removed ones
    /// are detached).
    ///
    /// # Errors
    ///
    /// - `VotingSessionNotFound` if the session row is gone
    async fn update(
        &self,
        session: &VotingSession,
        rebound: &[Discussion],
    ) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &VotingSessionId)
        -> Result<Option<VotingSession>, DomainError>;

    /// Write a phase transition in one transaction.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the session or any listed discussion no longer has
    ///   its expected status; nothing is written in that case
    async fn commit_phase(&self, commit: PhaseCommit) -> Result<(), DomainError>;
}
