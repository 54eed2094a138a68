//! Voting session handlers: scheduling sessions and advancing their phases.

mod advance_phase;
mod create_voting_session;
mod update_voting_session;

pub use advance_phase::{AdvanceSessionPhaseHandler, PhaseChangeResult};
pub use create_voting_session::{
    CreateVotingSessionCommand, CreateVotingSessionHandler, CreateVotingSessionResult,
};
pub use update_voting_session::{
    UpdateVotingSessionCommand, UpdateVotingSessionHandler, UpdateVotingSessionResult,
};

use std::collections::BTreeSet;

use crate::domain::discussion::Discussion;
use crate::domain::foundation::{DiscussionId, PartyId};
use crate::domain::GovernanceError;
use crate::ports::DiscussionRepository;

/// Load the discussions a session should contain.
///
/// # Errors
///
/// - `NotFound` for the first id that does not resolve to a live discussion
/// - `Forbidden` if a discussion belongs to another party
pub(crate) async fn load_members(
    repository: &dyn DiscussionRepository,
    party_id: &PartyId,
    ids: &[DiscussionId],
) -> Result<Vec<Discussion>, GovernanceError> {
    let wanted: Vec<DiscussionId> = ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let found = repository.find_by_ids(&wanted).await?;

    if let Some(missing) = wanted
        .iter()
        .find(|id| !found.iter().any(|d| d.id() == *id))
    {
        return Err(GovernanceError::discussion_not_found(missing));
    }
    if let Some(foreign) = found.iter().find(|d| d.party_id() != party_id) {
        return Err(GovernanceError::forbidden(format!(
            "discussion {} belongs to another party",
            foreign.id()
        )));
    }
    Ok(found)
}
