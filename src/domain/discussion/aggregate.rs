//! Discussion aggregate entity.
//!
//! A discussion is a proposal raised inside a party. Ballots and pending
//! actions are stored separately and reference the discussion by ID.

use serde::{Deserialize, Serialize};

use super::DiscussionStatus;
use crate::domain::errors::GovernanceError;
use crate::domain::foundation::{
    DiscussionId, PartyId, Principal, StateMachine, Timestamp, UserId, ValidationError,
    VotingSessionId,
};

pub const MAX_SUBJECT_LENGTH: usize = 200;
pub const MAX_CONTENT_LENGTH: usize = 4000;
pub const MAX_FILE_URL_LENGTH: usize = 500;

/// Optional file attached to a discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_url: String,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
}

impl Attachment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_text("file_url", &self.file_url, MAX_FILE_URL_LENGTH)?;
        if let Some(size) = self.file_size {
            if size < 0 {
                return Err(ValidationError::invalid_format(
                    "file_size",
                    "must not be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Partial edit of a discussion's content. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscussionChanges {
    pub subject: Option<String>,
    pub content: Option<String>,
    pub attachment: Option<Attachment>,
}

impl DiscussionChanges {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.content.is_none() && self.attachment.is_none()
    }
}

/// Discussion aggregate.
///
/// # Invariants
///
/// - `subject` is 1-200 characters, `content` is 1-4000 characters
/// - `status` only moves along the `DiscussionStatus` graph
/// - content is editable only in `Waiting` and only by the creator
/// - a deleted discussion is never returned by repositories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    id: DiscussionId,
    party_id: PartyId,
    creator_id: UserId,
    subject: String,
    content: String,
    attachment: Option<Attachment>,
    status: DiscussionStatus,
    session_id: Option<VotingSessionId>,
    created_at: Timestamp,
    updated_at: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl Discussion {
    /// Raise a new discussion in `Waiting`.
    ///
    /// # Errors
    ///
    /// - `Validation` if subject, content or attachment violate their limits
    pub fn new(
        id: DiscussionId,
        party_id: PartyId,
        creator_id: UserId,
        subject: String,
        content: String,
        attachment: Option<Attachment>,
    ) -> Result<Self, GovernanceError> {
        ValidationError::check_text("subject", &subject, MAX_SUBJECT_LENGTH)?;
        ValidationError::check_text("content", &content, MAX_CONTENT_LENGTH)?;
        if let Some(attachment) = &attachment {
            attachment.validate()?;
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            party_id,
            creator_id,
            subject,
            content,
            attachment,
            status: DiscussionStatus::Waiting,
            session_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Reconstitute a discussion from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: DiscussionId,
        party_id: PartyId,
        creator_id: UserId,
        subject: String,
        content: String,
        attachment: Option<Attachment>,
        status: DiscussionStatus,
        session_id: Option<VotingSessionId>,
        created_at: Timestamp,
        updated_at: Timestamp,
        deleted_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            party_id,
            creator_id,
            subject,
            content,
            attachment,
            status,
            session_id,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &DiscussionId {
        &self.id
    }

    pub fn party_id(&self) -> &PartyId {
        &self.party_id
    }

    pub fn creator_id(&self) -> &UserId {
        &self.creator_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn status(&self) -> DiscussionStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&VotingSessionId> {
        self.session_id.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    pub fn deleted_at(&self) -> Option<&Timestamp> {
        self.deleted_at.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// - `Forbidden` if the caller is not a member of the owning party
    pub fn ensure_member(&self, principal: &Principal) -> Result<(), GovernanceError> {
        if principal.belongs_to(&self.party_id) {
            Ok(())
        } else {
            Err(GovernanceError::forbidden(format!(
                "user {} is not a member of party {}",
                principal.user_id, self.party_id
            )))
        }
    }

    fn ensure_creator(&self, principal: &Principal) -> Result<(), GovernanceError> {
        if principal.user_id == self.creator_id {
            Ok(())
        } else {
            Err(GovernanceError::forbidden(
                "only the creator may modify this discussion",
            ))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Move to `target` on behalf of a caller. Returns the previous status.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller is not in the party, or lacks the manager
    ///   role for a target that needs it
    /// - `ForbiddenTransition` if the move is not in the lifecycle graph
    pub fn transition(
        &mut self,
        target: DiscussionStatus,
        principal: &Principal,
    ) -> Result<DiscussionStatus, GovernanceError> {
        self.ensure_member(principal)?;
        if target.requires_manager() && !principal.can_manage_sessions {
            return Err(GovernanceError::forbidden(format!(
                "moving a discussion to {} requires the session manager role",
                target
            )));
        }
        self.advance_to(target)
    }

    /// Move to `target` without a caller (scheduler-driven phase changes).
    ///
    /// # Errors
    ///
    /// - `ForbiddenTransition` if the move is not in the lifecycle graph
    pub fn advance_to(
        &mut self,
        target: DiscussionStatus,
    ) -> Result<DiscussionStatus, GovernanceError> {
        let next = self.status.transition_to(target)?;
        let previous = std::mem::replace(&mut self.status, next);
        self.updated_at = Timestamp::now();
        Ok(previous)
    }

    /// Apply a partial content edit.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller is not the creator or the discussion left `Waiting`
    /// - `Validation` if a new value violates its limit
    pub fn update(
        &mut self,
        changes: DiscussionChanges,
        principal: &Principal,
    ) -> Result<(), GovernanceError> {
        self.ensure_creator(principal)?;
        if !self.status.is_editable() {
            return Err(GovernanceError::forbidden(format!(
                "discussion can only be edited while WAITING, current status is {}",
                self.status
            )));
        }

        if let Some(subject) = &changes.subject {
            ValidationError::check_text("subject", subject, MAX_SUBJECT_LENGTH)?;
        }
        if let Some(content) = &changes.content {
            ValidationError::check_text("content", content, MAX_CONTENT_LENGTH)?;
        }
        if let Some(attachment) = &changes.attachment {
            attachment.validate()?;
        }

        if let Some(subject) = changes.subject {
            self.subject = subject;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if changes.attachment.is_some() {
            self.attachment = changes.attachment;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Tombstone the discussion.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller is not the creator
    pub fn delete(&mut self, principal: &Principal) -> Result<(), GovernanceError> {
        self.ensure_creator(principal)?;
        let now = Timestamp::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Point the discussion at a voting session, or detach it.
    pub fn bind_session(&mut self, session_id: Option<VotingSessionId>) {
        self.session_id = session_id;
        self.updated_at = Timestamp::now();
    }
}
