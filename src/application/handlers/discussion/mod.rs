//! Discussion command handlers.

mod create_discussion;
mod delete_discussion;
mod resolve_discussion;
mod transition_discussion;
mod update_discussion;

pub use create_discussion::{
    CreateDiscussionCommand, CreateDiscussionHandler, CreateDiscussionResult,
};
pub use delete_discussion::{DeleteDiscussionCommand, DeleteDiscussionHandler};
pub use resolve_discussion::{
    ResolveDiscussionCommand, ResolveDiscussionHandler, ResolveDiscussionResult,
};
pub use transition_discussion::{
    TransitionDiscussionCommand, TransitionDiscussionHandler, TransitionDiscussionResult,
};
pub use update_discussion::{
    UpdateDiscussionCommand, UpdateDiscussionHandler, UpdateDiscussionResult,
};
