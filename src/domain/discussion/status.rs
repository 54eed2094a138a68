//! DiscussionStatus enum and its lifecycle graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::GovernanceError;
use crate::domain::foundation::{
    DiscussionId, DomainError, ErrorCode, InvalidTransition, StateMachine, ValidationError,
};

/// Lifecycle status of a discussion.
///
/// ```text
/// WAITING ──► VOTING ──► FINAL_VOTING ──► RESOLVED
///    ▲  │                                  │  │
///    │  └──────────► ARCHIVED ◄────────────┘  │
///    └─────────────────┴──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscussionStatus {
    #[default]
    Waiting,
    Voting,
    FinalVoting,
    Resolved,
    Archived,
}

impl DiscussionStatus {
    pub const ALL: [DiscussionStatus; 5] = [
        DiscussionStatus::Waiting,
        DiscussionStatus::Voting,
        DiscussionStatus::FinalVoting,
        DiscussionStatus::Resolved,
        DiscussionStatus::Archived,
    ];

    /// Stored and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionStatus::Waiting => "WAITING",
            DiscussionStatus::Voting => "VOTING",
            DiscussionStatus::FinalVoting => "FINAL_VOTING",
            DiscussionStatus::Resolved => "RESOLVED",
            DiscussionStatus::Archived => "ARCHIVED",
        }
    }

    /// Ballots are accepted only while a vote is open.
    pub fn accepts_ballots(&self) -> bool {
        matches!(self, DiscussionStatus::Voting | DiscussionStatus::FinalVoting)
    }

    /// Content edits and new pending actions are allowed only before voting.
    pub fn is_editable(&self) -> bool {
        matches!(self, DiscussionStatus::Waiting)
    }

    /// Entering this status requires the session-management role.
    ///
    /// Resolution is open to any party member.
    pub fn requires_manager(&self) -> bool {
        !matches!(self, DiscussionStatus::Resolved)
    }

    /// Refuse a ballot unless the vote is open.
    ///
    /// Stores call this with the status read under the row lock, so the
    /// check and the write land together.
    pub fn guard_ballot(&self, discussion_id: &DiscussionId) -> Result<(), DomainError> {
        if self.accepts_ballots() {
            return Ok(());
        }
        Err(DomainError::new(
            ErrorCode::Forbidden,
            format!(
                "discussion {} is not open for voting (status {})",
                discussion_id, self
            ),
        ))
    }

    /// Refuse a new pending action once the discussion left WAITING.
    pub fn guard_new_action(&self, discussion_id: &DiscussionId) -> Result<(), DomainError> {
        if self.is_editable() {
            return Ok(());
        }
        Err(DomainError::new(
            ErrorCode::Forbidden,
            format!(
                "actions can only be added while WAITING, discussion {} is {}",
                discussion_id, self
            ),
        ))
    }
}

impl StateMachine for DiscussionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use DiscussionStatus::*;
        match self {
            Waiting => vec![Voting, Archived],
            Voting => vec![FinalVoting],
            FinalVoting => vec![Resolved],
            Resolved => vec![Archived, Waiting],
            Archived => vec![Waiting],
        }
    }
}

impl From<InvalidTransition<DiscussionStatus>> for GovernanceError {
    fn from(err: InvalidTransition<DiscussionStatus>) -> Self {
        GovernanceError::ForbiddenTransition {
            from: err.from.as_str(),
            to: err.to.as_str(),
        }
    }
}

impl fmt::Display for DiscussionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscussionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiscussionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let reason = format!("unknown discussion status '{}'", s);
                ValidationError::invalid_format("status", reason)
            })
    }
}
