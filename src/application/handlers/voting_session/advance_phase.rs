//! AdvanceSessionPhaseHandler - scheduler-driven session phase changes.
//!
//! - `start_voting_session`: session to VOTING, WAITING members to VOTING
//! - `end_voting_session`: session to FINAL_VOTING, WAITING and VOTING
//!   members to FINAL_VOTING
//!
//! Members in any other status are left alone. The session row, every
//! advanced discussion and the emitted events commit together; a concurrent
//! status change anywhere in that set fails the whole commit with
//! `Conflict`.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::discussion::{Discussion, DiscussionStatus, DiscussionStatusChanged};
use crate::domain::foundation::{
    DiscussionId, EventEnvelope, EventId, SerializableDomainEvent, Timestamp, VotingSessionId,
};
use crate::domain::voting_session::{
    end_member, start_member, VotingSession, VotingSessionPhaseChanged, VotingSessionStatus,
};
use crate::domain::GovernanceError;
use crate::ports::{
    DiscussionPhaseChange, DiscussionRepository, PhaseCommit, VotingSessionRepository,
};

/// Outcome of a phase change request.
#[derive(Debug, Clone)]
pub struct PhaseChangeResult {
    pub session: VotingSession,
    /// Member discussions whose status moved.
    pub advanced: Vec<DiscussionId>,
    /// False when the request was an idempotent no-op.
    pub changed: bool,
}

type MemberStep = fn(&mut Discussion) -> Result<Option<DiscussionStatus>, GovernanceError>;

/// Handler for session phase changes triggered by schedule notifications.
pub struct AdvanceSessionPhaseHandler {
    discussions: Arc<dyn DiscussionRepository>,
    sessions: Arc<dyn VotingSessionRepository>,
}

impl AdvanceSessionPhaseHandler {
    pub fn new(
        discussions: Arc<dyn DiscussionRepository>,
        sessions: Arc<dyn VotingSessionRepository>,
    ) -> Self {
        Self {
            discussions,
            sessions,
        }
    }

    /// Open the voting round. A session already in VOTING is accepted and
    /// any members still WAITING are brought along.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist
    /// - `ForbiddenTransition` once the session reached FINAL_VOTING or later
    /// - `Conflict` if a concurrent change moved the session or a member
    pub async fn start_voting_session(
        &self,
        session_id: &VotingSessionId,
    ) -> Result<PhaseChangeResult, GovernanceError> {
        let mut session = self.load(session_id).await?;
        let expected_status = session.status();
        session.start_voting()?;

        self.commit(session, expected_status, start_member).await
    }

    /// Close the rounds and move to FINAL_VOTING. A session already in
    /// FINAL_VOTING is left untouched.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist
    /// - `ForbiddenTransition` once the session is RESOLVED or ARCHIVED
    /// - `Conflict` if a concurrent change moved the session or a member
    pub async fn end_voting_session(
        &self,
        session_id: &VotingSessionId,
    ) -> Result<PhaseChangeResult, GovernanceError> {
        let mut session = self.load(session_id).await?;
        let expected_status = session.status();
        if session.end_voting()?.is_none() {
            tracing::info!(session_id = %session_id, "Session already in final voting");
            return Ok(PhaseChangeResult {
                session,
                advanced: Vec::new(),
                changed: false,
            });
        }

        self.commit(session, expected_status, end_member).await
    }

    async fn load(&self, session_id: &VotingSessionId) -> Result<VotingSession, GovernanceError> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| GovernanceError::session_not_found(session_id))
    }

    async fn commit(
        &self,
        session: VotingSession,
        expected_status: VotingSessionStatus,
        step: MemberStep,
    ) -> Result<PhaseChangeResult, GovernanceError> {
        let session_id = *session.id();
        let member_ids: Vec<DiscussionId> = session.discussion_ids().iter().copied().collect();
        let members = self.discussions.find_by_ids(&member_ids).await?;

        let now = Timestamp::now();
        let correlation_id = Uuid::new_v4().to_string();
        let mut changes = Vec::new();
        let mut events = Vec::new();
        for mut discussion in members {
            if let Some(previous) = step(&mut discussion)? {
                let event = DiscussionStatusChanged {
                    event_id: EventId::new(),
                    discussion_id: *discussion.id(),
                    from: previous,
                    to: discussion.status(),
                    changed_by: None,
                    changed_at: now,
                };
                events.push(envelope(&event, &correlation_id)?);
                changes.push(DiscussionPhaseChange {
                    discussion,
                    expected_status: previous,
                });
            }
        }

        let session_moved = session.status() != expected_status;
        if !session_moved && changes.is_empty() {
            tracing::info!(
                session_id = %session_id,
                status = %expected_status,
                "No phase change needed"
            );
            return Ok(PhaseChangeResult {
                session,
                advanced: Vec::new(),
                changed: false,
            });
        }

        let advanced: Vec<DiscussionId> = changes.iter().map(|c| *c.discussion.id()).collect();
        let event = VotingSessionPhaseChanged {
            event_id: EventId::new(),
            session_id,
            from: expected_status,
            to: session.status(),
            advanced_discussions: advanced.clone(),
            changed_at: now,
        };
        events.push(envelope(&event, &correlation_id)?);

        self.sessions
            .commit_phase(PhaseCommit {
                session: session.clone(),
                expected_status,
                discussions: changes,
                events,
            })
            .await?;

        tracing::info!(
            session_id = %session_id,
            from = %expected_status,
            to = %session.status(),
            advanced = advanced.len(),
            "Voting session phase changed"
        );

        Ok(PhaseChangeResult {
            session,
            advanced,
            changed: true,
        })
    }
}

fn envelope<E: SerializableDomainEvent>(
    event: &E,
    correlation_id: &str,
) -> Result<EventEnvelope, GovernanceError> {
    Ok(event.to_envelope()?.with_correlation_id(correlation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::World;
    use crate::domain::voting_session::SessionSchedule;

    fn handler(world: &World) -> AdvanceSessionPhaseHandler {
        let store = Arc::new(world.store.clone());
        AdvanceSessionPhaseHandler::new(store.clone(), store)
    }

    async fn session_over(world: &World, members: Vec<Discussion>) -> VotingSession {
        let session = VotingSession::new(
            VotingSessionId::new(),
            world.party,
            "Spring assembly".to_string(),
            SessionSchedule::default(),
            members.iter().map(|d| *d.id()),
        )
        .unwrap();
        let bound: Vec<Discussion> = members
            .into_iter()
            .map(|mut d| {
                d.bind_session(Some(*session.id()));
                d
            })
            .collect();
        VotingSessionRepository::save(&world.store, &session, &bound)
            .await
            .unwrap();
        session
    }

    async fn stored_session_status(world: &World, id: &VotingSessionId) -> VotingSessionStatus {
        VotingSessionRepository::find_by_id(&world.store, id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn start_moves_session_and_waiting_members_to_voting() {
        let world = World::new();
        let waiting = world.discussion_in(DiscussionStatus::Waiting).await;
        let resolved = world.discussion_in(DiscussionStatus::Resolved).await;
        let archived = world.discussion_in(DiscussionStatus::Archived).await;
        let session =
            session_over(&world, vec![waiting.clone(), resolved.clone(), archived.clone()]).await;

        let result = handler(&world)
            .start_voting_session(session.id())
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(result.advanced, vec![*waiting.id()]);
        assert_eq!(
            stored_session_status(&world, session.id()).await,
            VotingSessionStatus::Voting
        );
        assert_eq!(world.stored_status(waiting.id()), DiscussionStatus::Voting);
        assert_eq!(world.stored_status(resolved.id()), DiscussionStatus::Resolved);
        assert_eq!(world.stored_status(archived.id()), DiscussionStatus::Archived);
        assert_eq!(world.store.outbox_entries().len(), 2);
    }

    #[tokio::test]
    async fn start_on_voting_session_is_accepted() {
        let world = World::new();
        let member = world.discussion_in(DiscussionStatus::Waiting).await;
        let session = session_over(&world, vec![member.clone()]).await;
        let handler = handler(&world);

        handler.start_voting_session(session.id()).await.unwrap();
        let again = handler.start_voting_session(session.id()).await.unwrap();

        assert!(!again.changed);
        assert_eq!(world.stored_status(member.id()), DiscussionStatus::Voting);
    }

    #[tokio::test]
    async fn start_after_final_voting_is_forbidden() {
        let world = World::new();
        let session = session_over(&world, vec![]).await;
        let handler = handler(&world);
        handler.end_voting_session(session.id()).await.unwrap();

        let err = handler.start_voting_session(session.id()).await.unwrap_err();

        assert!(err.is_forbidden());
        assert_eq!(
            stored_session_status(&world, session.id()).await,
            VotingSessionStatus::FinalVoting
        );
    }

    #[tokio::test]
    async fn end_steps_members_through_voting_into_final_voting() {
        let world = World::new();
        let waiting = world.discussion_in(DiscussionStatus::Waiting).await;
        let voting = world.discussion_in(DiscussionStatus::Voting).await;
        let resolved = world.discussion_in(DiscussionStatus::Resolved).await;
        let session =
            session_over(&world, vec![waiting.clone(), voting.clone(), resolved.clone()]).await;

        let result = handler(&world).end_voting_session(session.id()).await.unwrap();

        assert_eq!(result.advanced.len(), 2);
        assert_eq!(world.stored_status(waiting.id()), DiscussionStatus::FinalVoting);
        assert_eq!(world.stored_status(voting.id()), DiscussionStatus::FinalVoting);
        assert_eq!(world.stored_status(resolved.id()), DiscussionStatus::Resolved);
        assert_eq!(
            stored_session_status(&world, session.id()).await,
            VotingSessionStatus::FinalVoting
        );
    }

    #[tokio::test]
    async fn end_is_idempotent_once_final() {
        let world = World::new();
        let session = session_over(&world, vec![]).await;
        let handler = handler(&world);
        handler.end_voting_session(session.id()).await.unwrap();
        let outbox_before = world.store.outbox_entries().len();

        let again = handler.end_voting_session(session.id()).await.unwrap();

        assert!(!again.changed);
        assert_eq!(world.store.outbox_entries().len(), outbox_before);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let world = World::new();

        let err = handler(&world)
            .start_voting_session(&VotingSessionId::new())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }
}
