//! Ballot value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DiscussionId, Timestamp, UserId, ValidationError};

/// A voter's position on a discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteValue {
    Agree,
    Disagree,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteValue::Agree => "AGREE",
            VoteValue::Disagree => "DISAGREE",
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteValue {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AGREE" => Ok(VoteValue::Agree),
            "DISAGREE" => Ok(VoteValue::Disagree),
            other => Err(ValidationError::invalid_format(
                "vote",
                format!("unknown vote value '{}'", other),
            )),
        }
    }
}

/// One voter's current ballot on one discussion.
///
/// At most one exists per (discussion, voter); a re-cast replaces value and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub discussion_id: DiscussionId,
    pub voter_id: UserId,
    pub value: VoteValue,
    pub cast_at: Timestamp,
}

impl Ballot {
    pub fn new(discussion_id: DiscussionId, voter_id: UserId, value: VoteValue) -> Self {
        Self {
            discussion_id,
            voter_id,
            value,
            cast_at: Timestamp::now(),
        }
    }
}
