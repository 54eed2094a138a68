//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations. Each takes
//! its ports as `Arc<dyn Port>` and returns `GovernanceError` to callers.

pub mod action;
pub(crate) mod caller;
pub mod discussion;
#[cfg(test)]
pub(crate) mod test_support;
pub mod vote;
pub mod voting_session;

pub use action::{
    ActionExecutor, ActionOutcome, EnqueueActionCommand, EnqueueActionHandler,
    EnqueueActionResult, ExecutionReport, ListActionsHandler, ListActionsQuery,
};
pub use discussion::{
    CreateDiscussionCommand, CreateDiscussionHandler, CreateDiscussionResult,
    DeleteDiscussionCommand, DeleteDiscussionHandler, ResolveDiscussionCommand,
    ResolveDiscussionHandler, ResolveDiscussionResult, TransitionDiscussionCommand,
    TransitionDiscussionHandler, TransitionDiscussionResult, UpdateDiscussionCommand,
    UpdateDiscussionHandler, UpdateDiscussionResult,
};
pub use vote::{CastVoteCommand, CastVoteHandler, CastVoteResult};
pub use voting_session::{
    AdvanceSessionPhaseHandler, CreateVotingSessionCommand, CreateVotingSessionHandler,
    CreateVotingSessionResult, PhaseChangeResult, UpdateVotingSessionCommand,
    UpdateVotingSessionHandler, UpdateVotingSessionResult,
};
