//! Action module - pending organizational changes attached to discussions.

mod payload;
mod pending_action;

pub use payload::{ActionPayload, ActionType, MAX_NAME_LENGTH};
pub use pending_action::PendingAction;
