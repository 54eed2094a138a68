//! CreateVotingSessionHandler - Command handler for scheduling a batch of
//! discussions.

use std::sync::Arc;

use crate::application::handlers::voting_session::load_members;
use crate::application::handlers::caller::load_principal;
use crate::domain::foundation::{CommandMetadata, DiscussionId, PartyId, VotingSessionId};
use crate::domain::voting_session::{SessionSchedule, VotingSession};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory, VotingSessionRepository};

#[derive(Debug, Clone)]
pub struct CreateVotingSessionCommand {
    pub party_id: PartyId,
    pub name: String,
    pub schedule: SessionSchedule,
    pub discussion_ids: Vec<DiscussionId>,
}

#[derive(Debug, Clone)]
pub struct CreateVotingSessionResult {
    pub session: VotingSession,
}

/// Handler for creating voting sessions.
pub struct CreateVotingSessionHandler {
    directory: Arc<dyn MembershipDirectory>,
    discussions: Arc<dyn DiscussionRepository>,
    sessions: Arc<dyn VotingSessionRepository>,
}

impl CreateVotingSessionHandler {
    pub fn new(
        directory: Arc<dyn MembershipDirectory>,
        discussions: Arc<dyn DiscussionRepository>,
        sessions: Arc<dyn VotingSessionRepository>,
    ) -> Self {
        Self {
            directory,
            discussions,
            sessions,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateVotingSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateVotingSessionResult, GovernanceError> {
        // 1. Authorize - session manager inside the party
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;
        if !principal.manages(&cmd.party_id) {
            return Err(GovernanceError::forbidden(format!(
                "user {} cannot manage voting sessions of party {}",
                principal.user_id, cmd.party_id
            )));
        }

        // 2. Load members - every id must exist in this party
        let mut members =
            load_members(self.discussions.as_ref(), &cmd.party_id, &cmd.discussion_ids).await?;

        // 3. Create and bind
        let session = VotingSession::new(
            VotingSessionId::new(),
            cmd.party_id,
            cmd.name,
            cmd.schedule,
            cmd.discussion_ids,
        )?;
        for member in &mut members {
            member.bind_session(Some(*session.id()));
        }

        // 4. Persist
        self.sessions.save(&session, &members).await?;

        tracing::info!(
            session_id = %session.id(),
            party_id = %cmd.party_id,
            discussions = members.len(),
            "Voting session created"
        );

        Ok(CreateVotingSessionResult { session })
    }
}
