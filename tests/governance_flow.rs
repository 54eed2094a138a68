//! Integration tests for schedule-driven voting sessions.
//!
//! A channel-backed notification source stands in for Postgres
//! `LISTEN`/`NOTIFY`, so the scheduler runs its real listener loop:
//! 1. A manager groups waiting discussions into a session
//! 2. A start notification opens the voting round for WAITING members
//! 3. An end notification moves every open member into FINAL_VOTING
//! 4. Ballots cast in either round count when the discussion resolves

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use veche_governance::adapters::InMemoryGovernanceStore;
use veche_governance::application::scheduler::{END_CHANNEL, SECOND_PHASE_CHANNEL, START_CHANNEL};
use veche_governance::application::{
    AdvanceSessionPhaseHandler, CastVoteCommand, CastVoteHandler, CreateDiscussionCommand,
    CreateDiscussionHandler, CreateVotingSessionCommand, CreateVotingSessionHandler,
    ResolveDiscussionCommand, ResolveDiscussionHandler, SchedulerConfig, SchedulerStats,
    SessionPhaseScheduler, TransitionDiscussionCommand, TransitionDiscussionHandler,
    UpdateVotingSessionCommand, UpdateVotingSessionHandler,
};
use veche_governance::domain::discussion::DiscussionStatus;
use veche_governance::domain::foundation::{
    CommandMetadata, DiscussionId, DomainError, PartyId, UserId, VotingSessionId,
};
use veche_governance::domain::vote::VoteValue;
use veche_governance::domain::voting_session::{
    SessionSchedule, VotingSessionChanges, VotingSessionStatus,
};
use veche_governance::ports::{Notification, NotificationSource, VotingSessionRepository};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Notification source fed from an unbounded channel.
struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Notification>,
}

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn connect(&mut self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn subscribe(&mut self, _channels: &[&str]) -> Result<(), DomainError> {
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Notification>, DomainError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(notification)) => Ok(Some(notification)),
            Ok(None) => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }
}

struct Fixture {
    store: Arc<InMemoryGovernanceStore>,
    party: PartyId,
    manager: UserId,
    members: Vec<UserId>,
    notify: mpsc::UnboundedSender<Notification>,
    shutdown: watch::Sender<bool>,
    scheduler: JoinHandle<SchedulerStats>,
}

impl Fixture {
    fn start() -> Self {
        let store = Arc::new(InMemoryGovernanceStore::new());
        let company = store.add_company("Acme");
        let party = store.add_party(company, "Builders");
        let manager = store.add_user(&[party], true);
        let members = (0..5).map(|_| store.add_user(&[party], false)).collect();

        let (notify, rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handler = Arc::new(AdvanceSessionPhaseHandler::new(store.clone(), store.clone()));
        let config = SchedulerConfig::default()
            .with_poll_timeout(Duration::from_millis(20))
            .with_retry_delay(Duration::from_millis(20));
        let scheduler = tokio::spawn(
            SessionPhaseScheduler::new(ChannelSource { rx }, handler, config).run(shutdown_rx),
        );

        Self {
            store,
            party,
            manager,
            members,
            notify,
            shutdown,
            scheduler,
        }
    }

    fn as_user(&self, user_id: UserId) -> CommandMetadata {
        CommandMetadata::new(user_id).with_correlation_id("integration")
    }

    async fn raise(&self, subject: &str) -> DiscussionId {
        let created = CreateDiscussionHandler::new(self.store.clone(), self.store.clone())
            .handle(
                CreateDiscussionCommand {
                    party_id: self.party,
                    subject: subject.to_string(),
                    content: "To be decided at the assembly.".to_string(),
                    attachment: None,
                },
                self.as_user(self.members[0]),
            )
            .await
            .unwrap();
        *created.discussion.id()
    }

    async fn schedule(&self, discussion_ids: Vec<DiscussionId>) -> VotingSessionId {
        let handler = CreateVotingSessionHandler::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
        );
        let created = handler
            .handle(
                CreateVotingSessionCommand {
                    party_id: self.party,
                    name: "Spring assembly".to_string(),
                    schedule: SessionSchedule::default(),
                    discussion_ids,
                },
                self.as_user(self.manager),
            )
            .await
            .unwrap();
        *created.session.id()
    }

    fn send(&self, channel: &str, payload: impl Into<String>) {
        self.notify.send(Notification::new(channel, payload)).unwrap();
    }

    async fn session_status(&self, id: &VotingSessionId) -> VotingSessionStatus {
        VotingSessionRepository::find_by_id(self.store.as_ref(), id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }

    fn discussion_status(&self, id: &DiscussionId) -> DiscussionStatus {
        self.store.stored_discussion(id).unwrap().status()
    }

    /// Wait for the scheduler to move a discussion into `status`.
    async fn await_discussion(&self, id: &DiscussionId, status: DiscussionStatus) {
        for _ in 0..200 {
            if self.discussion_status(id) == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "discussion {} stayed {} instead of reaching {}",
            id,
            self.discussion_status(id),
            status
        );
    }

    async fn vote(&self, discussion_id: DiscussionId, voter: UserId, value: VoteValue) {
        CastVoteHandler::new(self.store.clone(), self.store.clone(), self.store.clone())
            .handle(CastVoteCommand { discussion_id, value }, self.as_user(voter))
            .await
            .unwrap();
    }

    async fn stop(self) -> SchedulerStats {
        self.shutdown.send(true).unwrap();
        self.scheduler.await.unwrap()
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

/// start → end → vote → resolve, driven by notifications
#[tokio::test]
async fn scheduled_session_runs_discussions_to_resolution() {
    let fx = Fixture::start();
    let budget = fx.raise("Budget").await;
    let bylaws = fx.raise("Bylaws").await;
    let shelved = fx.raise("Shelved idea").await;
    TransitionDiscussionHandler::new(fx.store.clone(), fx.store.clone())
        .handle(TransitionDiscussionCommand::archive(shelved), fx.as_user(fx.manager))
        .await
        .unwrap();
    let session = fx.schedule(vec![budget, bylaws, shelved]).await;

    fx.send(START_CHANNEL, session.to_string());
    fx.await_discussion(&budget, DiscussionStatus::Voting).await;

    assert_eq!(fx.session_status(&session).await, VotingSessionStatus::Voting);
    assert_eq!(fx.discussion_status(&bylaws), DiscussionStatus::Voting);
    assert_eq!(fx.discussion_status(&shelved), DiscussionStatus::Archived);

    // First-round ballots carry into the final tally
    fx.vote(budget, fx.members[0], VoteValue::Agree).await;
    fx.vote(budget, fx.members[1], VoteValue::Disagree).await;

    fx.send(START_CHANNEL, "not-a-session-id");
    fx.send("voting_session_restart", session.to_string());
    fx.send(END_CHANNEL, session.to_string());
    fx.await_discussion(&budget, DiscussionStatus::FinalVoting).await;

    assert_eq!(fx.session_status(&session).await, VotingSessionStatus::FinalVoting);
    assert_eq!(fx.discussion_status(&bylaws), DiscussionStatus::FinalVoting);
    assert_eq!(fx.discussion_status(&shelved), DiscussionStatus::Archived);

    // Members[1] changes their mind in the final round
    fx.vote(budget, fx.members[1], VoteValue::Agree).await;
    fx.vote(budget, fx.members[2], VoteValue::Disagree).await;

    let resolved = ResolveDiscussionHandler::new(fx.store.clone(), fx.store.clone())
        .handle(
            ResolveDiscussionCommand {
                discussion_id: budget,
            },
            fx.as_user(fx.manager),
        )
        .await
        .unwrap();

    assert!(resolved.approved);
    assert_eq!((resolved.tally.agree, resolved.tally.disagree), (2, 1));
    assert_eq!(fx.discussion_status(&budget), DiscussionStatus::Resolved);

    let stats = fx.stop().await;
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.backoffs, 0);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.skipped, 2);
}

/// Discussions added after the round opened join at the second round
#[tokio::test]
async fn second_phase_brings_late_discussions_into_voting() {
    let fx = Fixture::start();
    let early = fx.raise("Early").await;
    let session = fx.schedule(vec![early]).await;

    fx.send(START_CHANNEL, session.to_string());
    fx.await_discussion(&early, DiscussionStatus::Voting).await;

    let late = fx.raise("Late").await;
    UpdateVotingSessionHandler::new(fx.store.clone(), fx.store.clone(), fx.store.clone())
        .handle(
            UpdateVotingSessionCommand {
                session_id: session,
                changes: VotingSessionChanges {
                    discussion_ids: Some([early, late].into_iter().collect()),
                    ..Default::default()
                },
            },
            fx.as_user(fx.manager),
        )
        .await
        .unwrap();
    assert_eq!(fx.discussion_status(&late), DiscussionStatus::Waiting);

    fx.send(SECOND_PHASE_CHANNEL, session.to_string());
    fx.await_discussion(&late, DiscussionStatus::Voting).await;

    assert_eq!(fx.discussion_status(&early), DiscussionStatus::Voting);
    assert_eq!(fx.session_status(&session).await, VotingSessionStatus::Voting);

    let stats = fx.stop().await;
    assert_eq!(stats.dispatched, 2);
}

/// A failed phase change is logged and the listener keeps serving
#[tokio::test]
async fn unknown_session_does_not_stop_the_listener() {
    let fx = Fixture::start();
    let discussion = fx.raise("Budget").await;
    let session = fx.schedule(vec![discussion]).await;

    fx.send(END_CHANNEL, VotingSessionId::new().to_string());
    fx.send(START_CHANNEL, session.to_string());
    fx.await_discussion(&discussion, DiscussionStatus::Voting).await;

    let stats = fx.stop().await;
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.skipped, 0);
}
