//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types and the event
//! infrastructure that form the vocabulary of the governance domain.

mod command;
mod errors;
mod events;
mod ids;
mod principal;
mod state_machine;
mod timestamp;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{CompanyId, DiscussionId, PartyId, PendingActionId, UserId, VotingSessionId};
pub use principal::Principal;
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
