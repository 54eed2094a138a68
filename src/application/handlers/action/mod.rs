//! Pending action handlers: queueing, listing and executing.

mod action_executor;
mod enqueue_action;
mod list_actions;

pub use action_executor::{ActionExecutor, ActionOutcome, ExecutionReport};
pub use enqueue_action::{EnqueueActionCommand, EnqueueActionHandler, EnqueueActionResult};
pub use list_actions::{ListActionsHandler, ListActionsQuery};
