//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `discussion` - Discussion aggregate and its status state machine
//! - `vote` - Ballots and majority tally
//! - `action` - Pending organizational actions and their payloads
//! - `voting_session` - Voting sessions and phase fan-out to member discussions

pub mod action;
pub mod discussion;
pub mod errors;
pub mod foundation;
pub mod vote;
pub mod voting_session;

pub use errors::GovernanceError;
