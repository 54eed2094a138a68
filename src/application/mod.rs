//! Application layer - command handlers, the action executor and the
//! session phase scheduler.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
pub mod scheduler;

pub use handlers::{
    // Discussion handlers
    CreateDiscussionCommand, CreateDiscussionHandler, CreateDiscussionResult,
    DeleteDiscussionCommand, DeleteDiscussionHandler,
    ResolveDiscussionCommand, ResolveDiscussionHandler, ResolveDiscussionResult,
    TransitionDiscussionCommand, TransitionDiscussionHandler, TransitionDiscussionResult,
    UpdateDiscussionCommand, UpdateDiscussionHandler, UpdateDiscussionResult,
    // Vote handlers
    CastVoteCommand, CastVoteHandler, CastVoteResult,
    // Action handlers
    ActionExecutor, ActionOutcome, EnqueueActionCommand, EnqueueActionHandler,
    EnqueueActionResult, ExecutionReport, ListActionsHandler, ListActionsQuery,
    // Voting session handlers
    AdvanceSessionPhaseHandler, CreateVotingSessionCommand, CreateVotingSessionHandler,
    CreateVotingSessionResult, PhaseChangeResult, UpdateVotingSessionCommand,
    UpdateVotingSessionHandler, UpdateVotingSessionResult,
};
pub use scheduler::{SchedulerConfig, SchedulerStats, SessionPhaseScheduler};
