//! VotingSessionStatus enum for the phase lifecycle of a voting session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::GovernanceError;
use crate::domain::foundation::{InvalidTransition, StateMachine, ValidationError};

/// Phase of a voting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotingSessionStatus {
    #[default]
    Waiting,
    Voting,
    FinalVoting,
    Resolved,
    Archived,
}

impl VotingSessionStatus {
    pub const ALL: [VotingSessionStatus; 5] = [
        VotingSessionStatus::Waiting,
        VotingSessionStatus::Voting,
        VotingSessionStatus::FinalVoting,
        VotingSessionStatus::Resolved,
        VotingSessionStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VotingSessionStatus::Waiting => "WAITING",
            VotingSessionStatus::Voting => "VOTING",
            VotingSessionStatus::FinalVoting => "FINAL_VOTING",
            VotingSessionStatus::Resolved => "RESOLVED",
            VotingSessionStatus::Archived => "ARCHIVED",
        }
    }
}

impl StateMachine for VotingSessionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use VotingSessionStatus::*;
        match self {
            Waiting => vec![Voting, FinalVoting],
            Voting => vec![FinalVoting],
            FinalVoting => vec![Resolved],
            Resolved => vec![Archived],
            Archived => vec![],
        }
    }
}

impl From<InvalidTransition<VotingSessionStatus>> for GovernanceError {
    fn from(err: InvalidTransition<VotingSessionStatus>) -> Self {
        GovernanceError::ForbiddenTransition {
            from: err.from.as_str(),
            to: err.to.as_str(),
        }
    }
}

impl fmt::Display for VotingSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VotingSessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VotingSessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown session status '{}'", s))
            })
    }
}
