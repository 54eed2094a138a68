//! Vote module - ballots and their majority tally.

mod ballot;
mod tally;

pub use ballot::{Ballot, VoteValue};
pub use tally::Tally;
