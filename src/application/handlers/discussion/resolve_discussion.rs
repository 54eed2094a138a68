//! ResolveDiscussionHandler - Command handler for closing the final vote.
//!
//! Locks the discussion, tallies the ballots under that lock, moves the
//! discussion from FINAL_VOTING to RESOLVED and writes
//! `discussion.resolved.v1` to the outbox in the same transaction. Ballots
//! arriving meanwhile wait for the lock and then find the vote closed. The
//! relay delivers the event, and with it the approved actions, only once
//! RESOLVED is committed.

use std::sync::Arc;

use crate::application::handlers::caller::{envelope_for, load_discussion, load_principal};
use crate::domain::discussion::{Discussion, DiscussionResolved, DiscussionStatus};
use crate::domain::foundation::{CommandMetadata, DiscussionId, EventId, Timestamp};
use crate::domain::vote::Tally;
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory};

#[derive(Debug, Clone)]
pub struct ResolveDiscussionCommand {
    pub discussion_id: DiscussionId,
}

/// Result of a resolution.
#[derive(Debug, Clone)]
pub struct ResolveDiscussionResult {
    pub discussion: Discussion,
    pub tally: Tally,
    pub approved: bool,
}

/// Handler for resolving discussions.
pub struct ResolveDiscussionHandler {
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn DiscussionRepository>,
}

impl ResolveDiscussionHandler {
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
        cmd: ResolveDiscussionCommand,
        metadata: CommandMetadata,
    ) -> Result<ResolveDiscussionResult, GovernanceError> {
        // 1. Load
        let mut discussion = load_discussion(self.repository.as_ref(), &cmd.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        // 2. Transition - only FINAL_VOTING -> RESOLVED is legal
        let previous = discussion.transition(DiscussionStatus::Resolved, &principal)?;

        // 3. Lock and tally
        let resolution = self
            .repository
            .begin_resolution(&cmd.discussion_id, previous)
            .await?;
        let tally = resolution.tally();
        let approved = tally.approved();

        // 4. Persist status and event together, releasing the lock
        let event = DiscussionResolved {
            event_id: EventId::new(),
            discussion_id: cmd.discussion_id,
            approved,
            agree_count: tally.agree,
            disagree_count: tally.disagree,
            resolved_at: Timestamp::now(),
        };
        let envelope = envelope_for(&event, &metadata)?;
        resolution.commit(&discussion, &[envelope]).await?;

        tracing::info!(
            discussion_id = %cmd.discussion_id,
            agree = tally.agree,
            disagree = tally.disagree,
            approved,
            "Discussion resolved"
        );

        Ok(ResolveDiscussionResult {
            discussion,
            tally,
            approved,
        })
    }
}
