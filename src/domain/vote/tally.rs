//! Majority tally over the ballots of one discussion.

use serde::{Deserialize, Serialize};

use super::{Ballot, VoteValue};

/// Agree/disagree counts for a discussion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub agree: u64,
    pub disagree: u64,
}

impl Tally {
    pub fn new(agree: u64, disagree: u64) -> Self {
        Self { agree, disagree }
    }

    pub fn from_ballots<'a>(ballots: impl IntoIterator<Item = &'a Ballot>) -> Self {
        ballots
            .into_iter()
            .fold(Tally::default(), |mut tally, ballot| {
                tally.record(ballot.value);
                tally
            })
    }

    pub fn record(&mut self, value: VoteValue) {
        match value {
            VoteValue::Agree => self.agree += 1,
            VoteValue::Disagree => self.disagree += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.agree + self.disagree
    }

    /// Winning value. A tie, including zero ballots, counts as DISAGREE.
    pub fn outcome(&self) -> VoteValue {
        if self.agree > self.disagree {
            VoteValue::Agree
        } else {
            VoteValue::Disagree
        }
    }

    pub fn approved(&self) -> bool {
        self.outcome() == VoteValue::Agree
    }
}
