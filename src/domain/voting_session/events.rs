//! Voting session domain events.

use serde::{Deserialize, Serialize};

use super::VotingSessionStatus;
use crate::domain::foundation::{domain_event, DiscussionId, EventId, Timestamp, VotingSessionId};

/// Published when the scheduler advances a session to a new phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSessionPhaseChanged {
    pub event_id: EventId,
    pub session_id: VotingSessionId,
    pub from: VotingSessionStatus,
    pub to: VotingSessionStatus,

    /// Member discussions whose status moved along with the session.
    pub advanced_discussions: Vec<DiscussionId>,

    pub changed_at: Timestamp,
}

domain_event!(
    VotingSessionPhaseChanged,
    "voting_session.phase_changed.v1",
    VotingSession(session_id),
    changed_at
);
