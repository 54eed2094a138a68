//! Lookups and event stamping shared by the handlers.

use crate::domain::discussion::Discussion;
use crate::domain::foundation::{
    CommandMetadata, DiscussionId, EventEnvelope, Principal, SerializableDomainEvent,
};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory};

/// Resolve the caller behind `metadata`.
///
/// # Errors
///
/// - `NotFound` if the directory has no such user
pub(crate) async fn load_principal(
    directory: &dyn MembershipDirectory,
    metadata: &CommandMetadata,
) -> Result<Principal, GovernanceError> {
    directory
        .principal(&metadata.user_id)
        .await?
        .ok_or_else(|| GovernanceError::user_not_found(metadata.user_id))
}

/// Load a live discussion.
///
/// # Errors
///
/// - `NotFound` if the discussion does not exist or was deleted
pub(crate) async fn load_discussion(
    repository: &dyn DiscussionRepository,
    id: &DiscussionId,
) -> Result<Discussion, GovernanceError> {
    repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| GovernanceError::discussion_not_found(id))
}

/// Wrap an event for the outbox, stamped with the caller's context.
pub(crate) fn envelope_for<E: SerializableDomainEvent>(
    event: &E,
    metadata: &CommandMetadata,
) -> Result<EventEnvelope, GovernanceError> {
    let mut envelope = event
        .to_envelope()?
        .with_correlation_id(metadata.correlation_id())
        .with_user_id(metadata.user_id.to_string());
    if let Some(trace_id) = metadata.trace_id() {
        envelope = envelope.with_trace_id(trace_id);
    }
    Ok(envelope)
}
