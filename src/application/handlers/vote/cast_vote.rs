//! CastVoteHandler - Command handler for casting or changing a ballot.

use std::sync::Arc;

use crate::application::handlers::caller::{load_discussion, load_principal};
use crate::domain::foundation::{CommandMetadata, DiscussionId};
use crate::domain::vote::{Ballot, VoteValue};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory, VoteLedger};

/// Command to vote on a discussion as the calling user.
#[derive(Debug, Clone)]
pub struct CastVoteCommand {
    pub discussion_id: DiscussionId,
    pub value: VoteValue,
}

#[derive(Debug, Clone)]
pub struct CastVoteResult {
    pub ballot: Ballot,
}

/// Handler for casting votes. A repeated vote replaces the earlier one.
pub struct CastVoteHandler {
    directory: Arc<dyn MembershipDirectory>,
    discussions: Arc<dyn DiscussionRepository>,
    ledger: Arc<dyn VoteLedger>,
}

impl CastVoteHandler {
    pub fn new(
        directory: Arc<dyn MembershipDirectory>,
        discussions: Arc<dyn DiscussionRepository>,
        ledger: Arc<dyn VoteLedger>,
    ) -> Self {
        Self {
            directory,
            discussions,
            ledger,
        }
    }

    pub async fn handle(
        &self,
        cmd: CastVoteCommand,
        metadata: CommandMetadata,
    ) -> Result<CastVoteResult, GovernanceError> {
        // 1. Load
        let discussion = load_discussion(self.discussions.as_ref(), &cmd.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        // 2. Authorize - party member, discussion open for ballots
        discussion.ensure_member(&principal)?;
        discussion.status().guard_ballot(&cmd.discussion_id)?;

        // 3. Upsert; the ledger re-checks the status under its lock
        let ballot = Ballot::new(cmd.discussion_id, principal.user_id, cmd.value);
        self.ledger.upsert(&ballot).await?;

        tracing::info!(
            discussion_id = %cmd.discussion_id,
            voter_id = %principal.user_id,
            value = %cmd.value.as_str(),
            "Vote cast"
        );

        Ok(CastVoteResult { ballot })
    }
}
