//! VotingSession aggregate - a batch of discussions voted on together.
//!
//! The session owns its phase; member discussions follow it in lock-step
//! through `start_member` and `end_member`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::VotingSessionStatus;
use crate::domain::discussion::{Discussion, DiscussionStatus};
use crate::domain::errors::GovernanceError;
use crate::domain::foundation::{
    DiscussionId, PartyId, Principal, StateMachine, Timestamp, ValidationError, VotingSessionId,
};

pub const MAX_SESSION_NAME_LENGTH: usize = 255;

/// Optional schedule of a session's phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSchedule {
    pub first_round_starts_at: Option<Timestamp>,
    pub second_round_starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
}

/// Partial edit of a session. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VotingSessionChanges {
    pub name: Option<String>,
    pub first_round_starts_at: Option<Timestamp>,
    pub second_round_starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,

    /// Wholesale replacement of the member discussions.
    pub discussion_ids: Option<BTreeSet<DiscussionId>>,
}

/// Membership delta produced by replacing a session's discussions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub added: BTreeSet<DiscussionId>,
    pub removed: BTreeSet<DiscussionId>,
}

/// Voting session aggregate.
///
/// # Invariants
///
/// - `name` is non-empty
/// - every member discussion belongs to `party_id`
/// - status only moves forward along `VotingSessionStatus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    id: VotingSessionId,
    party_id: PartyId,
    name: String,
    status: VotingSessionStatus,
    schedule: SessionSchedule,
    discussion_ids: BTreeSet<DiscussionId>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl VotingSession {
    /// Create a session in `Waiting`.
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is blank or too long
    pub fn new(
        id: VotingSessionId,
        party_id: PartyId,
        name: String,
        schedule: SessionSchedule,
        discussion_ids: impl IntoIterator<Item = DiscussionId>,
    ) -> Result<Self, GovernanceError> {
        ValidationError::check_text("name", &name, MAX_SESSION_NAME_LENGTH)?;

        let now = Timestamp::now();
        Ok(Self {
            id,
            party_id,
            name,
            status: VotingSessionStatus::Waiting,
            schedule,
            discussion_ids: discussion_ids.into_iter().collect(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: VotingSessionId,
        party_id: PartyId,
        name: String,
        status: VotingSessionStatus,
        schedule: SessionSchedule,
        discussion_ids: BTreeSet<DiscussionId>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            party_id,
            name,
            status,
            schedule,
            discussion_ids,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &VotingSessionId {
        &self.id
    }

    pub fn party_id(&self) -> &PartyId {
        &self.party_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> VotingSessionStatus {
        self.status
    }

    pub fn schedule(&self) -> &SessionSchedule {
        &self.schedule
    }

    pub fn discussion_ids(&self) -> &BTreeSet<DiscussionId> {
        &self.discussion_ids
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// # Errors
    ///
    /// - `Forbidden` unless the caller manages sessions in the owning party
    pub fn ensure_manager(&self, principal: &Principal) -> Result<(), GovernanceError> {
        if principal.manages(&self.party_id) {
            Ok(())
        } else {
            Err(GovernanceError::forbidden(format!(
                "user {} cannot manage sessions of party {}",
                principal.user_id, self.party_id
            )))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phases
    // ─────────────────────────────────────────────────────────────────────────

    /// Open (or keep open) the voting round.
    ///
    /// Returns the previous status, or `None` when the session already votes.
    ///
    /// # Errors
    ///
    /// - `ForbiddenTransition` once the session reached FINAL_VOTING or later
    pub fn start_voting(&mut self) -> Result<Option<VotingSessionStatus>, GovernanceError> {
        if self.status == VotingSessionStatus::Voting {
            return Ok(None);
        }
        self.move_to(VotingSessionStatus::Voting).map(Some)
    }

    /// Close the open rounds and move to FINAL_VOTING.
    ///
    /// Returns the previous status, or `None` when already FINAL_VOTING.
    ///
    /// # Errors
    ///
    /// - `ForbiddenTransition` once the session is RESOLVED or ARCHIVED
    pub fn end_voting(&mut self) -> Result<Option<VotingSessionStatus>, GovernanceError> {
        if self.status == VotingSessionStatus::FinalVoting {
            return Ok(None);
        }
        self.move_to(VotingSessionStatus::FinalVoting).map(Some)
    }

    fn move_to(
        &mut self,
        target: VotingSessionStatus,
    ) -> Result<VotingSessionStatus, GovernanceError> {
        let next = self.status.transition_to(target)?;
        let previous = std::mem::replace(&mut self.status, next);
        self.updated_at = Timestamp::now();
        Ok(previous)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a partial edit. Returns the membership delta when the
    /// discussions were replaced.
    ///
    /// # Errors
    ///
    /// - `Validation` if a new name is blank or too long
    pub fn update(
        &mut self,
        changes: VotingSessionChanges,
    ) -> Result<MembershipDelta, GovernanceError> {
        if let Some(name) = &changes.name {
            ValidationError::check_text("name", name, MAX_SESSION_NAME_LENGTH)?;
        }

        if let Some(name) = changes.name {
            self.name = name;
        }
        if changes.first_round_starts_at.is_some() {
            self.schedule.first_round_starts_at = changes.first_round_starts_at;
        }
        if changes.second_round_starts_at.is_some() {
            self.schedule.second_round_starts_at = changes.second_round_starts_at;
        }
        if changes.ends_at.is_some() {
            self.schedule.ends_at = changes.ends_at;
        }

        let delta = match changes.discussion_ids {
            Some(ids) => self.replace_discussions(ids),
            None => MembershipDelta::default(),
        };
        self.updated_at = Timestamp::now();
        Ok(delta)
    }

    fn replace_discussions(&mut self, ids: BTreeSet<DiscussionId>) -> MembershipDelta {
        let added = ids.difference(&self.discussion_ids).copied().collect();
        let removed = self.discussion_ids.difference(&ids).copied().collect();
        self.discussion_ids = ids;
        MembershipDelta { added, removed }
    }
}

/// Bring a member discussion into the voting round.
///
/// WAITING moves to VOTING; every other status is left alone. Returns the
/// previous status when something changed.
pub fn start_member(
    discussion: &mut Discussion,
) -> Result<Option<DiscussionStatus>, GovernanceError> {
    match discussion.status() {
        DiscussionStatus::Waiting => discussion.advance_to(DiscussionStatus::Voting).map(Some),
        _ => Ok(None),
    }
}

/// Bring a member discussion into the final round.
///
/// WAITING steps through VOTING; VOTING moves directly. Every other status
/// is left alone. Returns the previous status when something changed.
pub fn end_member(
    discussion: &mut Discussion,
) -> Result<Option<DiscussionStatus>, GovernanceError> {
    match discussion.status() {
        DiscussionStatus::Waiting => {
            discussion.advance_to(DiscussionStatus::Voting)?;
            discussion.advance_to(DiscussionStatus::FinalVoting)?;
            Ok(Some(DiscussionStatus::Waiting))
        }
        DiscussionStatus::Voting => discussion
            .advance_to(DiscussionStatus::FinalVoting)
            .map(Some),
        _ => Ok(None),
    }
}
