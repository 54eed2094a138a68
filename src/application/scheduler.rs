//! SessionPhaseScheduler - listens for schedule notifications and advances
//! voting sessions.
//!
//! The database emits a notification carrying a session id when a
//! session's first round, second round or end time arrives:
//!
//! | Channel | Action |
//! |---------|--------|
//! | `voting_session_start` | `start_voting_session` |
//! | `voting_session_second_phase` | `start_voting_session` |
//! | `voting_session_end` | `end_voting_session` |
//!
//! The listener is a small state machine:
//!
//! ```text
//! Connect -> Subscribe -> Poll (bounded wait) --error--> Backoff -> Connect
//!                           ^        |
//!                           +--------+ notification or timeout
//! ```
//!
//! Bad payloads, unknown channels and handler errors are logged and the
//! connection is kept. Connection errors are logged and retried forever
//! after a fixed delay. The shutdown signal is observed while polling and
//! while backing off.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::application::handlers::AdvanceSessionPhaseHandler;
use crate::domain::foundation::VotingSessionId;
use crate::ports::{Notification, NotificationSource};

pub const START_CHANNEL: &str = "voting_session_start";
pub const SECOND_PHASE_CHANNEL: &str = "voting_session_second_phase";
pub const END_CHANNEL: &str = "voting_session_end";

/// Every channel the scheduler subscribes to.
pub const CHANNELS: [&str; 3] = [START_CHANNEL, SECOND_PHASE_CHANNEL, END_CHANNEL];

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Longest single wait for a notification.
    pub poll_timeout: Duration,
    /// Fixed delay before reconnecting after a failure.
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(10),
        }
    }
}

impl SchedulerConfig {
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Connect,
    Subscribe,
    Poll,
    Backoff,
}

/// Counters reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub connects: u32,
    pub backoffs: u32,
    pub dispatched: u32,
    pub skipped: u32,
}

/// Background worker turning notifications into session phase changes.
pub struct SessionPhaseScheduler<S: NotificationSource> {
    source: S,
    handler: Arc<AdvanceSessionPhaseHandler>,
    config: SchedulerConfig,
    stats: SchedulerStats,
}

impl<S: NotificationSource> SessionPhaseScheduler<S> {
    pub fn new(
        source: S,
        handler: Arc<AdvanceSessionPhaseHandler>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            handler,
            config,
            stats: SchedulerStats::default(),
        }
    }

    /// Run until the shutdown signal flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        tracing::info!(
            channels = ?CHANNELS,
            poll_timeout_ms = self.config.poll_timeout.as_millis() as u64,
            retry_delay_ms = self.config.retry_delay.as_millis() as u64,
            "Session phase scheduler started"
        );

        let mut state = ListenerState::Connect;
        while !*shutdown.borrow() {
            state = match self.step(state, &mut shutdown).await {
                Some(next) => next,
                None => break,
            };
        }

        tracing::info!(
            connects = self.stats.connects,
            backoffs = self.stats.backoffs,
            dispatched = self.stats.dispatched,
            "Session phase scheduler stopped"
        );
        self.stats
    }

    /// Advance the listener by one state. `None` means stop.
    async fn step(
        &mut self,
        state: ListenerState,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<ListenerState> {
        match state {
            ListenerState::Connect => {
                self.stats.connects += 1;
                match self.source.connect().await {
                    Ok(()) => {
                        tracing::info!("Listener connection established");
                        Some(ListenerState::Subscribe)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Listener connection failed");
                        Some(ListenerState::Backoff)
                    }
                }
            }

            ListenerState::Subscribe => match self.source.subscribe(&CHANNELS).await {
                Ok(()) => Some(ListenerState::Poll),
                Err(e) => {
                    tracing::error!(error = %e, "Listener subscription failed");
                    Some(ListenerState::Backoff)
                }
            },

            ListenerState::Poll => {
                let received = tokio::select! {
                    changed = shutdown.changed() => {
                        return changed.ok().map(|_| ListenerState::Poll);
                    }
                    received = self.source.recv(self.config.poll_timeout) => received,
                };
                match received {
                    Ok(Some(notification)) => {
                        self.dispatch(notification).await;
                        Some(ListenerState::Poll)
                    }
                    Ok(None) => Some(ListenerState::Poll),
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            retry_in_ms = self.config.retry_delay.as_millis() as u64,
                            "Listener connection lost"
                        );
                        Some(ListenerState::Backoff)
                    }
                }
            }

            ListenerState::Backoff => {
                self.stats.backoffs += 1;
                tokio::select! {
                    changed = shutdown.changed() => changed.ok().map(|_| ListenerState::Backoff),
                    _ = tokio::time::sleep(self.config.retry_delay) => Some(ListenerState::Connect),
                }
            }
        }
    }

    async fn dispatch(&mut self, notification: Notification) {
        tracing::info!(
            channel = %notification.channel,
            payload = %notification.payload,
            "Notification received"
        );

        let session_id: VotingSessionId = match notification.payload.parse() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    channel = %notification.channel,
                    payload = %notification.payload,
                    error = %e,
                    "Ignoring notification with malformed session id"
                );
                self.stats.skipped += 1;
                return;
            }
        };

        let result = match notification.channel.as_str() {
            START_CHANNEL | SECOND_PHASE_CHANNEL => {
                self.handler.start_voting_session(&session_id).await
            }
            END_CHANNEL => self.handler.end_voting_session(&session_id).await,
            other => {
                tracing::warn!(channel = other, "Ignoring notification on unknown channel");
                self.stats.skipped += 1;
                return;
            }
        };

        self.stats.dispatched += 1;
        match result {
            Ok(change) => tracing::debug!(
                session_id = %session_id,
                status = %change.session.status(),
                changed = change.changed,
                "Notification handled"
            ),
            Err(e) => tracing::error!(
                session_id = %session_id,
                channel = %notification.channel,
                error = %e,
                "Failed to process notification"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryGovernanceStore;
    use crate::domain::discussion::{Discussion, DiscussionStatus};
    use crate::domain::foundation::{DiscussionId, DomainError, ErrorCode, PartyId, UserId};
    use crate::domain::voting_session::{SessionSchedule, VotingSession, VotingSessionStatus};
    use crate::ports::{DiscussionRepository, VotingSessionRepository};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SourceLog {
        connects: u32,
        subscriptions: Vec<Vec<String>>,
    }

    /// Replays scripted connect and receive results, then idles.
    struct ScriptedSource {
        connect_results: VecDeque<Result<(), DomainError>>,
        receive_results: VecDeque<Result<Option<Notification>, DomainError>>,
        log: Arc<Mutex<SourceLog>>,
    }

    impl ScriptedSource {
        fn new(receive_results: Vec<Result<Option<Notification>, DomainError>>) -> Self {
            Self {
                connect_results: VecDeque::new(),
                receive_results: receive_results.into(),
                log: Arc::new(Mutex::new(SourceLog::default())),
            }
        }
    }

    #[async_trait]
    impl NotificationSource for ScriptedSource {
        async fn connect(&mut self) -> Result<(), DomainError> {
            self.log.lock().unwrap().connects += 1;
            self.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn subscribe(&mut self, channels: &[&str]) -> Result<(), DomainError> {
            self.log
                .lock()
                .unwrap()
                .subscriptions
                .push(channels.iter().map(|c| c.to_string()).collect());
            Ok(())
        }

        async fn recv(&mut self, timeout: Duration) -> Result<Option<Notification>, DomainError> {
            match self.receive_results.pop_front() {
                Some(result) => result,
                None => {
                    tokio::time::sleep(timeout).await;
                    Ok(None)
                }
            }
        }
    }

    fn connection_lost() -> DomainError {
        DomainError::new(ErrorCode::DatabaseError, "connection reset")
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_poll_timeout(Duration::from_millis(10))
            .with_retry_delay(Duration::from_millis(20))
    }

    struct Fixture {
        store: InMemoryGovernanceStore,
        handler: Arc<AdvanceSessionPhaseHandler>,
    }

    fn fixture() -> Fixture {
        let store = InMemoryGovernanceStore::new();
        let handler = Arc::new(AdvanceSessionPhaseHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        ));
        Fixture { store, handler }
    }

    async fn waiting_session(store: &InMemoryGovernanceStore) -> (VotingSession, Discussion) {
        let party = PartyId::new();
        let mut discussion = Discussion::new(
            DiscussionId::new(),
            party,
            UserId::new(),
            "Subject".to_string(),
            "Content".to_string(),
            None,
        )
        .unwrap();
        DiscussionRepository::save(store, &discussion).await.unwrap();
        let session = VotingSession::new(
            VotingSessionId::new(),
            party,
            "Assembly".to_string(),
            SessionSchedule::default(),
            [*discussion.id()],
        )
        .unwrap();
        discussion.bind_session(Some(*session.id()));
        VotingSessionRepository::save(store, &session, &[discussion.clone()])
            .await
            .unwrap();
        (session, discussion)
    }

    async fn session_status(
        store: &InMemoryGovernanceStore,
        id: &VotingSessionId,
    ) -> VotingSessionStatus {
        VotingSessionRepository::find_by_id(store, id)
            .await
            .unwrap()
            .unwrap()
            .status()
    }

    async fn run_for(
        scheduler: SessionPhaseScheduler<ScriptedSource>,
        duration: Duration,
    ) -> SchedulerStats {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        tokio::time::sleep(duration).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn start_notification_moves_session_and_members_to_voting() {
        let fixture = fixture();
        let (session, discussion) = waiting_session(&fixture.store).await;
        let source = ScriptedSource::new(vec![Ok(Some(Notification::new(
            START_CHANNEL,
            session.id().to_string(),
        )))]);
        let log = source.log.clone();

        let stats = run_for(
            SessionPhaseScheduler::new(source, fixture.handler.clone(), fast_config()),
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(stats.dispatched, 1);
        assert_eq!(
            session_status(&fixture.store, session.id()).await,
            VotingSessionStatus::Voting
        );
        assert_eq!(
            fixture.store.stored_discussion(discussion.id()).unwrap().status(),
            DiscussionStatus::Voting
        );
        let expected: Vec<String> = CHANNELS.iter().map(|c| c.to_string()).collect();
        assert_eq!(log.lock().unwrap().subscriptions, vec![expected]);
    }

    #[tokio::test]
    async fn channel_error_backs_off_once_and_keeps_received_notifications() {
        let fixture = fixture();
        let (session, _) = waiting_session(&fixture.store).await;
        let source = ScriptedSource::new(vec![
            Ok(Some(Notification::new(START_CHANNEL, session.id().to_string()))),
            Err(connection_lost()),
            Ok(Some(Notification::new(END_CHANNEL, session.id().to_string()))),
        ]);
        let log = source.log.clone();

        let stats = run_for(
            SessionPhaseScheduler::new(source, fixture.handler.clone(), fast_config()),
            Duration::from_millis(150),
        )
        .await;

        assert_eq!(stats.backoffs, 1);
        assert_eq!(stats.connects, 2);
        assert_eq!(log.lock().unwrap().connects, 2);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(
            session_status(&fixture.store, session.id()).await,
            VotingSessionStatus::FinalVoting
        );
    }

    #[tokio::test]
    async fn bad_notifications_are_skipped_without_reconnecting() {
        let fixture = fixture();
        let (session, _) = waiting_session(&fixture.store).await;
        let source = ScriptedSource::new(vec![
            Ok(Some(Notification::new(START_CHANNEL, "not-a-uuid"))),
            Ok(Some(Notification::new("voting_session_unknown", session.id().to_string()))),
            Ok(Some(Notification::new(SECOND_PHASE_CHANNEL, session.id().to_string()))),
        ]);

        let stats = run_for(
            SessionPhaseScheduler::new(source, fixture.handler.clone(), fast_config()),
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.backoffs, 0);
        assert_eq!(
            session_status(&fixture.store, session.id()).await,
            VotingSessionStatus::Voting
        );
    }

    #[tokio::test]
    async fn handler_errors_do_not_drop_the_connection() {
        let fixture = fixture();
        let source = ScriptedSource::new(vec![Ok(Some(Notification::new(
            END_CHANNEL,
            VotingSessionId::new().to_string(),
        )))]);

        let stats = run_for(
            SessionPhaseScheduler::new(source, fixture.handler.clone(), fast_config()),
            Duration::from_millis(60),
        )
        .await;

        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.connects, 1);
        assert_eq!(stats.backoffs, 0);
    }

    #[tokio::test]
    async fn failed_connect_is_retried_after_backoff() {
        let fixture = fixture();
        let mut source = ScriptedSource::new(vec![]);
        source.connect_results.push_back(Err(connection_lost()));
        let log = source.log.clone();

        let stats = run_for(
            SessionPhaseScheduler::new(source, fixture.handler.clone(), fast_config()),
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(stats.backoffs, 1);
        assert_eq!(log.lock().unwrap().subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() {
        let fixture = fixture();
        let mut source = ScriptedSource::new(vec![]);
        source.connect_results.push_back(Err(connection_lost()));
        let config = fast_config().with_retry_delay(Duration::from_secs(60));

        let stats = run_for(
            SessionPhaseScheduler::new(source, fixture.handler.clone(), config),
            Duration::from_millis(30),
        )
        .await;

        assert_eq!(stats.backoffs, 1);
        assert_eq!(stats.connects, 1);
    }
}
