//! UpdateVotingSessionHandler - Command handler for editing a session.

use std::sync::Arc;

use crate::application::handlers::caller::load_principal;
use crate::application::handlers::voting_session::load_members;
use crate::domain::foundation::{CommandMetadata, DiscussionId, VotingSessionId};
use crate::domain::voting_session::{MembershipDelta, VotingSession, VotingSessionChanges};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory, VotingSessionRepository};

#[derive(Debug, Clone)]
pub struct UpdateVotingSessionCommand {
    pub session_id: VotingSessionId,
    pub changes: VotingSessionChanges,
}

#[derive(Debug, Clone)]
pub struct UpdateVotingSessionResult {
    pub session: VotingSession,
    pub delta: MembershipDelta,
}

/// Handler for editing voting sessions.
///
/// Replacing the discussion set detaches removed discussions and binds
/// added ones in the same write.
pub struct UpdateVotingSessionHandler {
    directory: Arc<dyn MembershipDirectory>,
    discussions: Arc<dyn DiscussionRepository>,
    sessions: Arc<dyn VotingSessionRepository>,
}

impl UpdateVotingSessionHandler {
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
        cmd: UpdateVotingSessionCommand,
        metadata: CommandMetadata,
    ) -> Result<UpdateVotingSessionResult, GovernanceError> {
        // 1. Load
        let mut session = self
            .sessions
            .find_by_id(&cmd.session_id)
            .await?
            .ok_or_else(|| GovernanceError::session_not_found(cmd.session_id))?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        // 2. Authorize
        session.ensure_manager(&principal)?;

        // 3. Validate the replacement set before touching the session
        let mut incoming = match &cmd.changes.discussion_ids {
            Some(ids) => {
                let ids: Vec<DiscussionId> = ids.iter().copied().collect();
                load_members(self.discussions.as_ref(), session.party_id(), &ids).await?
            }
            None => Vec::new(),
        };

        // 4. Apply
        let delta = session.update(cmd.changes)?;

        let mut rebound = Vec::with_capacity(delta.added.len() + delta.removed.len());
        for mut discussion in incoming.drain(..) {
            if delta.added.contains(discussion.id()) {
                discussion.bind_session(Some(cmd.session_id));
                rebound.push(discussion);
            }
        }
        let removed: Vec<DiscussionId> = delta.removed.iter().copied().collect();
        for mut discussion in self.discussions.find_by_ids(&removed).await? {
            discussion.bind_session(None);
            rebound.push(discussion);
        }

        // 5. Persist
        self.sessions.update(&session, &rebound).await?;

        tracing::info!(
            session_id = %cmd.session_id,
            added = delta.added.len(),
            removed = delta.removed.len(),
            "Voting session updated"
        );

        Ok(UpdateVotingSessionResult { session, delta })
    }
}
