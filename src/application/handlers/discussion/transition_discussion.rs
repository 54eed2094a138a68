//! TransitionDiscussionHandler - Command handler for caller-driven status moves.
//!
//! Covers put-on-voting, put-on-final-voting, archive and put-on-wait, keyed
//! by the target status. Resolution has its own handler because it tallies
//! votes and emits the event that drives action execution.

use std::sync::Arc;

use crate::application::handlers::caller::{envelope_for, load_discussion, load_principal};
use crate::domain::discussion::{Discussion, DiscussionStatus, DiscussionStatusChanged};
use crate::domain::foundation::{CommandMetadata, DiscussionId, EventId, Timestamp};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory};

/// Command to move a discussion to `target`.
#[derive(Debug, Clone)]
pub struct TransitionDiscussionCommand {
    pub discussion_id: DiscussionId,
    pub target: DiscussionStatus,
}

impl TransitionDiscussionCommand {
    pub fn put_on_voting(discussion_id: DiscussionId) -> Self {
        Self {
            discussion_id,
            target: DiscussionStatus::Voting,
        }
    }

    pub fn put_on_final_voting(discussion_id: DiscussionId) -> Self {
        Self {
            discussion_id,
            target: DiscussionStatus::FinalVoting,
        }
    }

    pub fn archive(discussion_id: DiscussionId) -> Self {
        Self {
            discussion_id,
            target: DiscussionStatus::Archived,
        }
    }

    pub fn put_on_wait(discussion_id: DiscussionId) -> Self {
        Self {
            discussion_id,
            target: DiscussionStatus::Waiting,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionDiscussionResult {
    pub discussion: Discussion,
    pub event: DiscussionStatusChanged,
}

/// Handler for discussion status transitions.
pub struct TransitionDiscussionHandler {
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn DiscussionRepository>,
}

impl TransitionDiscussionHandler {
    pub fn new(
        directory: Arc<dyn MembershipDirectory>,
        repository: Arc<dyn DiscussionRepository>,
    ) -> Self {
        Self {
            directory,
            repository,
        }
    }

    pub async fn handle(
        &self,
        cmd: TransitionDiscussionCommand,
        metadata: CommandMetadata,
    ) -> Result<TransitionDiscussionResult, GovernanceError> {
        if cmd.target == DiscussionStatus::Resolved {
            return Err(GovernanceError::forbidden(
                "discussions are resolved through the resolve operation",
            ));
        }

        // 1. Load
        let mut discussion = load_discussion(self.repository.as_ref(), &cmd.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        // 2. Transition - membership, role, then lifecycle graph
        let previous = discussion.transition(cmd.target, &principal)?;

        // 3. Persist with the event, conditional on the loaded status
        let event = DiscussionStatusChanged {
            event_id: EventId::new(),
            discussion_id: cmd.discussion_id,
            from: previous,
            to: cmd.target,
            changed_by: Some(principal.user_id),
            changed_at: Timestamp::now(),
        };
        let envelope = envelope_for(&event, &metadata)?;
        self.repository
            .update(&discussion, previous, &[envelope])
            .await?;

        tracing::info!(
            discussion_id = %cmd.discussion_id,
            from = %previous,
            to = %cmd.target,
            user_id = %principal.user_id,
            "Discussion status changed"
        );

        Ok(TransitionDiscussionResult { discussion, event })
    }
}
