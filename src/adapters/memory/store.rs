//! InMemoryGovernanceStore - every governance port over one in-process state.
//!
//! Used by unit and integration tests, and for running the engine without a
//! database. Writes that the Postgres adapter performs in one transaction
//! happen here under one lock, so the same atomicity holds.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::organization::{CompanyRecord, OrgOp, Organization, PartyRecord, UserRecord};
use crate::domain::action::PendingAction;
use crate::domain::discussion::{Discussion, DiscussionStatus};
use crate::domain::foundation::{
    CompanyId, DiscussionId, DomainError, ErrorCode, EventEnvelope, EventId, PartyId,
    PendingActionId, Principal, UserId, VotingSessionId,
};
use crate::domain::vote::{Ballot, Tally};
use crate::domain::voting_session::VotingSession;
use crate::ports::{
    ActionExecution, DiscussionRepository, MembershipDirectory, OrganizationChanges, OutboxEntry,
    OutboxWriter, PendingActionStore, PhaseCommit, ProcessedEventStore, Resolution, VoteLedger,
    VotingSessionRepository,
};

type LockMap<K> = Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>;

#[derive(Default)]
struct State {
    org: Organization,
    discussions: HashMap<DiscussionId, Discussion>,
    ballots: HashMap<(DiscussionId, UserId), Ballot>,
    actions: Vec<PendingAction>,
    sessions: HashMap<VotingSessionId, VotingSession>,
    outbox: Vec<OutboxEntry>,
    processed: HashSet<(String, String)>,
}

impl State {
    fn append_outbox(&mut self, events: &[EventEnvelope]) {
        self.outbox.extend(events.iter().cloned().map(OutboxEntry::new));
    }

    fn live_discussion(&self, id: &DiscussionId) -> Option<&Discussion> {
        self.discussions.get(id).filter(|d| !d.is_deleted())
    }

    /// Conflict unless the live discussion is still in `expected`.
    fn expect_status(
        &self,
        id: &DiscussionId,
        expected: DiscussionStatus,
    ) -> Result<(), DomainError> {
        let stored = self.live_status(id)?;
        if stored != expected {
            return Err(conflict("discussion", id, expected));
        }
        Ok(())
    }

    fn live_status(&self, id: &DiscussionId) -> Result<DiscussionStatus, DomainError> {
        self.live_discussion(id)
            .map(Discussion::status)
            .ok_or_else(|| discussion_not_found(id))
    }

    /// Overwrite the lifecycle fields of a stored discussion, keeping its
    /// content and session pointer.
    fn write_lifecycle(&mut self, incoming: &Discussion) {
        if let Some(stored) = self.discussions.get_mut(incoming.id()) {
            *stored = Discussion::reconstitute(
                *stored.id(),
                *stored.party_id(),
                *stored.creator_id(),
                stored.subject().to_string(),
                stored.content().to_string(),
                stored.attachment().cloned(),
                incoming.status(),
                stored.session_id().copied(),
                *stored.created_at(),
                *incoming.updated_at(),
                incoming.deleted_at().copied(),
            );
        }
    }

    /// Overwrite the editable content of a stored discussion.
    fn write_content(&mut self, incoming: &Discussion) {
        if let Some(stored) = self.discussions.get_mut(incoming.id()) {
            *stored = Discussion::reconstitute(
                *stored.id(),
                *stored.party_id(),
                *stored.creator_id(),
                incoming.subject().to_string(),
                incoming.content().to_string(),
                incoming.attachment().cloned(),
                stored.status(),
                stored.session_id().copied(),
                *stored.created_at(),
                *incoming.updated_at(),
                stored.deleted_at().copied(),
            );
        }
    }
}

/// The async locks stand in for row locks: they are held across awaits by
/// open action executions and resolutions.
#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    action_locks: LockMap<PendingActionId>,
    discussion_locks: LockMap<DiscussionId>,
}

/// In-memory implementation of all governance ports.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryGovernanceStore {
    inner: Arc<Inner>,
}

fn conflict(
    what: &str,
    id: impl std::fmt::Display,
    expected: impl std::fmt::Display,
) -> DomainError {
    DomainError::new(
        ErrorCode::Conflict,
        format!("{} {} is no longer {}", what, id, expected),
    )
    .with_detail("expected", expected.to_string())
}

fn discussion_not_found(id: &DiscussionId) -> DomainError {
    DomainError::new(
        ErrorCode::DiscussionNotFound,
        format!("Discussion not found: {}", id),
    )
}

fn lock_for<K: std::hash::Hash + Eq + Copy>(
    locks: &LockMap<K>,
    key: &K,
) -> Arc<tokio::sync::Mutex<()>> {
    locks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(*key)
        .or_default()
        .clone()
}

impl InMemoryGovernanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn lock_action(&self, id: &PendingActionId) -> OwnedMutexGuard<()> {
        lock_for(&self.inner.action_locks, id).lock_owned().await
    }

    async fn lock_discussion(&self, id: &DiscussionId) -> OwnedMutexGuard<()> {
        lock_for(&self.inner.discussion_locks, id).lock_owned().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_company(&self, name: &str) -> CompanyId {
        let id = CompanyId::new();
        self.state().org.companies.insert(
            id,
            CompanyRecord {
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_party(&self, company_id: CompanyId, name: &str) -> PartyId {
        let id = PartyId::new();
        self.state().org.parties.insert(
            id,
            PartyRecord {
                company_id,
                name: name.to_string(),
                members: BTreeSet::new(),
                deleted_at: None,
            },
        );
        id
    }

    /// Register a user with the given parties as memberships.
    pub fn add_user(&self, parties: &[PartyId], can_manage_sessions: bool) -> UserId {
        let id = UserId::new();
        let mut state = self.state();
        let company_id = parties
            .first()
            .and_then(|p| state.org.parties.get(p))
            .map(|p| p.company_id);
        state.org.users.insert(
            id,
            UserRecord {
                company_id,
                can_manage_sessions,
            },
        );
        for party_id in parties {
            if let Some(party) = state.org.parties.get_mut(party_id) {
                party.members.insert(id);
            }
        }
        id
    }

    /// Store an action row as-is, bypassing payload validation and the
    /// status guard.
    pub fn insert_raw_action(&self, action: PendingAction) {
        self.state().actions.push(action);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn party(&self, id: &PartyId) -> Option<PartyRecord> {
        self.state().org.parties.get(id).cloned()
    }

    pub fn company_name(&self, id: &CompanyId) -> Option<String> {
        self.state().org.companies.get(id).map(|c| c.name.clone())
    }

    pub fn user_company(&self, id: &UserId) -> Option<CompanyId> {
        self.state().org.users.get(id).and_then(|u| u.company_id)
    }

    /// Stored discussion, tombstoned or not.
    pub fn stored_discussion(&self, id: &DiscussionId) -> Option<Discussion> {
        self.state().discussions.get(id).cloned()
    }

    pub fn actions_of(&self, discussion_id: &DiscussionId) -> Vec<PendingAction> {
        self.state()
            .actions
            .iter()
            .filter(|a| a.discussion_id() == discussion_id)
            .cloned()
            .collect()
    }

    pub fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.state().outbox.clone()
    }

    pub fn ballot_count(&self, discussion_id: &DiscussionId) -> usize {
        self.state()
            .ballots
            .keys()
            .filter(|(d, _)| d == discussion_id)
            .count()
    }

    /// Overwrite a stored discussion, simulating a concurrent writer.
    pub fn overwrite_discussion(&self, discussion: Discussion) {
        self.state().discussions.insert(*discussion.id(), discussion);
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryGovernanceStore {
    async fn principal(&self, user_id: &UserId) -> Result<Option<Principal>, DomainError> {
        Ok(self.state().org.principal(user_id))
    }
}

#[async_trait]
impl DiscussionRepository for InMemoryGovernanceStore {
    async fn save(&self, discussion: &Discussion) -> Result<(), DomainError> {
        self.state()
            .discussions
            .insert(*discussion.id(), discussion.clone());
        Ok(())
    }

    async fn update(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError> {
        let _row = self.lock_discussion(discussion.id()).await;
        let mut state = self.state();
        state.expect_status(discussion.id(), expected_status)?;

        state.write_lifecycle(discussion);
        state.append_outbox(events);
        Ok(())
    }

    async fn update_content(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        state.expect_status(discussion.id(), expected_status)?;

        state.write_content(discussion);
        Ok(())
    }

    async fn begin_resolution(
        &self,
        id: &DiscussionId,
        expected_status: DiscussionStatus,
    ) -> Result<Box<dyn Resolution>, DomainError> {
        let row = self.lock_discussion(id).await;

        let tally = {
            let state = self.state();
            state.expect_status(id, expected_status)?;
            Tally::from_ballots(state.ballots.values().filter(|b| &b.discussion_id == id))
        };

        Ok(Box::new(InMemoryResolution {
            store: self.clone(),
            discussion_id: *id,
            expected_status,
            tally,
            _row: row,
        }))
    }

    async fn find_by_id(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError> {
        Ok(self.state().live_discussion(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[DiscussionId]) -> Result<Vec<Discussion>, DomainError> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.live_discussion(id).cloned())
            .collect())
    }
}

/// Open resolution holding the discussion lock.
struct InMemoryResolution {
    store: InMemoryGovernanceStore,
    discussion_id: DiscussionId,
    expected_status: DiscussionStatus,
    tally: Tally,
    _row: OwnedMutexGuard<()>,
}

#[async_trait]
impl Resolution for InMemoryResolution {
    fn tally(&self) -> Tally {
        self.tally
    }

    async fn commit(
        self: Box<Self>,
        discussion: &Discussion,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError> {
        let mut state = self.store.state();
        state.expect_status(&self.discussion_id, self.expected_status)?;

        state.write_lifecycle(discussion);
        state.append_outbox(events);
        Ok(())
    }
}

#[async_trait]
impl VoteLedger for InMemoryGovernanceStore {
    async fn upsert(&self, ballot: &Ballot) -> Result<(), DomainError> {
        let _row = self.lock_discussion(&ballot.discussion_id).await;
        let mut state = self.state();
        state
            .live_status(&ballot.discussion_id)?
            .guard_ballot(&ballot.discussion_id)?;

        state
            .ballots
            .insert((ballot.discussion_id, ballot.voter_id), ballot.clone());
        Ok(())
    }

    async fn tally(&self, discussion_id: &DiscussionId) -> Result<Tally, DomainError> {
        let state = self.state();
        Ok(Tally::from_ballots(
            state
                .ballots
                .values()
                .filter(|b| &b.discussion_id == discussion_id),
        ))
    }

    async fn ballots_for(&self, discussion_id: &DiscussionId) -> Result<Vec<Ballot>, DomainError> {
        let mut ballots: Vec<Ballot> = self
            .state()
            .ballots
            .values()
            .filter(|b| &b.discussion_id == discussion_id)
            .cloned()
            .collect();
        ballots.sort_by_key(|b| b.cast_at);
        Ok(ballots)
    }
}

#[async_trait]
impl PendingActionStore for InMemoryGovernanceStore {
    async fn save(&self, action: &PendingAction) -> Result<(), DomainError> {
        let mut state = self.state();
        state
            .live_status(action.discussion_id())?
            .guard_new_action(action.discussion_id())?;

        state.actions.push(action.clone());
        Ok(())
    }

    async fn find_by_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<PendingAction>, DomainError> {
        Ok(self.actions_of(discussion_id))
    }

    async fn find_unexecuted(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<PendingAction>, DomainError> {
        Ok(self
            .actions_of(discussion_id)
            .into_iter()
            .filter(|a| !a.is_executed())
            .collect())
    }

    async fn begin_execution(
        &self,
        id: &PendingActionId,
    ) -> Result<Option<Box<dyn ActionExecution>>, DomainError> {
        let guard = self.lock_action(id).await;

        let (action, snapshot) = {
            let state = self.state();
            match state.actions.iter().find(|a| a.id() == id) {
                Some(action) if !action.is_executed() => (action.clone(), state.org.clone()),
                _ => return Ok(None),
            }
        };

        Ok(Some(Box::new(InMemoryActionExecution {
            store: self.clone(),
            action,
            snapshot,
            ops: Vec::new(),
            _guard: guard,
        })))
    }
}

/// Staged action transaction. Changes touch a private snapshot until commit.
struct InMemoryActionExecution {
    store: InMemoryGovernanceStore,
    action: PendingAction,
    snapshot: Organization,
    ops: Vec<OrgOp>,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryActionExecution {
    fn stage(&mut self, op: OrgOp) -> Result<bool, DomainError> {
        let changed = self.snapshot.apply(&op)?;
        self.ops.push(op);
        Ok(changed)
    }
}

#[async_trait]
impl OrganizationChanges for InMemoryActionExecution {
    async fn rename_party(
        &mut self,
        party_id: &PartyId,
        new_name: &str,
    ) -> Result<(), DomainError> {
        self.stage(OrgOp::RenameParty(*party_id, new_name.to_string()))
            .map(|_| ())
    }

    async fn rename_company(
        &mut self,
        company_id: &CompanyId,
        new_name: &str,
    ) -> Result<(), DomainError> {
        self.stage(OrgOp::RenameCompany(*company_id, new_name.to_string()))
            .map(|_| ())
    }

    async fn add_member(
        &mut self,
        party_id: &PartyId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        self.stage(OrgOp::AddMember(*party_id, *user_id))
    }

    async fn evict_member(
        &mut self,
        party_id: &PartyId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        self.stage(OrgOp::EvictMember(*party_id, *user_id))
    }

    async fn delete_party(&mut self, party_id: &PartyId) -> Result<bool, DomainError> {
        self.stage(OrgOp::DeleteParty(*party_id))
    }
}

#[async_trait]
impl ActionExecution for InMemoryActionExecution {
    fn action(&self) -> &PendingAction {
        &self.action
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut state = self.store.state();

        let mut org = state.org.clone();
        for op in &self.ops {
            org.apply(op)?;
        }

        let action = state
            .actions
            .iter_mut()
            .find(|a| a.id() == self.action.id())
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ActionNotFound,
                    format!("Pending action not found: {}", self.action.id()),
                )
            })?;
        action.mark_executed();
        state.org = org;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl VotingSessionRepository for InMemoryGovernanceStore {
    async fn save(
        &self,
        session: &VotingSession,
        members: &[Discussion],
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        for member in members {
            if let Some(stored) = state.discussions.get_mut(member.id()) {
                stored.bind_session(member.session_id().copied());
            }
        }
        state.sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn update(
        &self,
        session: &VotingSession,
        rebound: &[Discussion],
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        if !state.sessions.contains_key(session.id()) {
            return Err(DomainError::new(
                ErrorCode::VotingSessionNotFound,
                format!("Voting session not found: {}", session.id()),
            ));
        }
        for discussion in rebound {
            if let Some(stored) = state.discussions.get_mut(discussion.id()) {
                stored.bind_session(discussion.session_id().copied());
            }
        }
        state.sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    /// Membership is read back from the discussions' session pointers.
    async fn find_by_id(
        &self,
        id: &VotingSessionId,
    ) -> Result<Option<VotingSession>, DomainError> {
        let state = self.state();
        Ok(state.sessions.get(id).map(|session| {
            let members = state
                .discussions
                .values()
                .filter(|d| !d.is_deleted() && d.session_id() == Some(id))
                .map(|d| *d.id())
                .collect();
            VotingSession::reconstitute(
                *session.id(),
                *session.party_id(),
                session.name().to_string(),
                session.status(),
                *session.schedule(),
                members,
                *session.created_at(),
                *session.updated_at(),
            )
        }))
    }

    async fn commit_phase(&self, commit: PhaseCommit) -> Result<(), DomainError> {
        let mut state = self.state();

        let session_id = *commit.session.id();
        match state.sessions.get(&session_id) {
            None => {
                return Err(DomainError::new(
                    ErrorCode::VotingSessionNotFound,
                    format!("Voting session not found: {}", session_id),
                ))
            }
            Some(stored) if stored.status() != commit.expected_status => {
                return Err(conflict("voting session", session_id, commit.expected_status));
            }
            Some(_) => {}
        }
        for change in &commit.discussions {
            let id = change.discussion.id();
            match state.live_discussion(id) {
                Some(stored) if stored.status() == change.expected_status => {}
                _ => return Err(conflict("discussion", id, change.expected_status)),
            }
        }

        state.sessions.insert(session_id, commit.session);
        for change in &commit.discussions {
            state.write_lifecycle(&change.discussion);
        }
        state.append_outbox(&commit.events);
        Ok(())
    }
}

#[async_trait]
impl OutboxWriter for InMemoryGovernanceStore {
    async fn write(&self, event: &EventEnvelope) -> Result<OutboxEntry, DomainError> {
        let entry = OutboxEntry::new(event.clone());
        self.state().outbox.push(entry.clone());
        Ok(entry)
    }

    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        Ok(self
            .state()
            .outbox
            .iter()
            .filter(|e| e.status.is_deliverable())
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
        if let Some(entry) = self.state().outbox.iter_mut().find(|e| e.id == id) {
            entry.mark_published();
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        if let Some(entry) = self.state().outbox.iter_mut().find(|e| e.id == id) {
            entry.mark_failed(error);
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryGovernanceStore {
    async fn contains(&self, event_id: &EventId, handler_name: &str) -> Result<bool, DomainError> {
        let key = (event_id.as_str().to_string(), handler_name.to_string());
        Ok(self.state().processed.contains(&key))
    }

    async fn mark_processed(
        &self,
        event_id: &EventId,
        handler_name: &str,
    ) -> Result<(), DomainError> {
        let key = (event_id.as_str().to_string(), handler_name.to_string());
        self.state().processed.insert(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ActionPayload;
    use crate::domain::discussion::DiscussionChanges;
    use crate::domain::vote::VoteValue;
    use crate::domain::voting_session::SessionSchedule;
    use crate::ports::{DiscussionPhaseChange, OutboxStatus};
    use serde_json::json;
    use std::time::Duration;

    fn discussion(party: PartyId, creator: UserId) -> Discussion {
        Discussion::new(
            DiscussionId::new(),
            party,
            creator,
            "subject".to_string(),
            "content".to_string(),
            None,
        )
        .unwrap()
    }

    /// Save a discussion walked along the forward path up to `status`.
    async fn stored_in(store: &InMemoryGovernanceStore, status: DiscussionStatus) -> Discussion {
        let mut d = discussion(PartyId::new(), UserId::new());
        for step in [
            DiscussionStatus::Voting,
            DiscussionStatus::FinalVoting,
            DiscussionStatus::Resolved,
        ] {
            if d.status() == status {
                break;
            }
            d.advance_to(step).unwrap();
        }
        DiscussionRepository::save(store, &d).await.unwrap();
        d
    }

    fn status_changed(d: &Discussion) -> EventEnvelope {
        EventEnvelope::new(
            "discussion.status_changed.v1",
            d.id().to_string(),
            "Discussion",
            json!({}),
        )
    }

    fn stored_status(store: &InMemoryGovernanceStore, id: &DiscussionId) -> DiscussionStatus {
        store.stored_discussion(id).unwrap().status()
    }

    #[tokio::test]
    async fn principal_reflects_memberships() {
        let store = InMemoryGovernanceStore::new();
        let company = store.add_company("Acme");
        let party = store.add_party(company, "Builders");
        let user = store.add_user(&[party], true);

        let principal = store.principal(&user).await.unwrap().unwrap();

        assert!(principal.manages(&party));
        assert!(store.principal(&UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_with_stale_status_is_conflict_and_writes_nothing() {
        let store = InMemoryGovernanceStore::new();
        let mut d = stored_in(&store, DiscussionStatus::Waiting).await;
        d.advance_to(DiscussionStatus::Voting).unwrap();
        let event = status_changed(&d);

        let err = DiscussionRepository::update(&store, &d, DiscussionStatus::Voting, &[event])
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(stored_status(&store, d.id()), DiscussionStatus::Waiting);
        assert!(store.outbox_entries().is_empty());
    }

    #[tokio::test]
    async fn update_writes_row_and_outbox_together() {
        let store = InMemoryGovernanceStore::new();
        let mut d = stored_in(&store, DiscussionStatus::Waiting).await;
        d.advance_to(DiscussionStatus::Voting).unwrap();
        let event = status_changed(&d);

        DiscussionRepository::update(&store, &d, DiscussionStatus::Waiting, &[event])
            .await
            .unwrap();

        assert_eq!(stored_status(&store, d.id()), DiscussionStatus::Voting);
        assert_eq!(store.outbox_entries().len(), 1);
    }

    #[tokio::test]
    async fn status_write_keeps_session_pointer_and_content() {
        let store = InMemoryGovernanceStore::new();
        let mut snapshot = stored_in(&store, DiscussionStatus::Waiting).await;

        // A session binds the discussion and its creator edits it after the
        // snapshot was loaded.
        let session_id = VotingSessionId::new();
        let mut bound = snapshot.clone();
        bound.bind_session(Some(session_id));
        let session = VotingSession::new(
            session_id,
            *snapshot.party_id(),
            "Assembly".to_string(),
            SessionSchedule::default(),
            [*snapshot.id()],
        )
        .unwrap();
        VotingSessionRepository::save(&store, &session, &[bound]).await.unwrap();
        let mut edited = store.stored_discussion(snapshot.id()).unwrap();
        edited
            .update(
                DiscussionChanges {
                    content: Some("revised".to_string()),
                    ..Default::default()
                },
                &Principal::member(*snapshot.creator_id(), [*snapshot.party_id()]),
            )
            .unwrap();
        store
            .update_content(&edited, DiscussionStatus::Waiting)
            .await
            .unwrap();

        snapshot.advance_to(DiscussionStatus::Voting).unwrap();
        DiscussionRepository::update(&store, &snapshot, DiscussionStatus::Waiting, &[])
            .await
            .unwrap();

        let stored = store.stored_discussion(snapshot.id()).unwrap();
        assert_eq!(stored.status(), DiscussionStatus::Voting);
        assert_eq!(stored.session_id(), Some(&session_id));
        assert_eq!(stored.content(), "revised");
    }

    #[tokio::test]
    async fn content_edit_after_voting_started_is_conflict() {
        let store = InMemoryGovernanceStore::new();
        let d = stored_in(&store, DiscussionStatus::Voting).await;

        let err = store
            .update_content(&d, DiscussionStatus::Waiting)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn tombstoned_discussions_are_hidden() {
        let store = InMemoryGovernanceStore::new();
        let mut d = stored_in(&store, DiscussionStatus::Waiting).await;
        d.delete(&Principal::member(*d.creator_id(), [*d.party_id()]))
            .unwrap();
        DiscussionRepository::update(&store, &d, DiscussionStatus::Waiting, &[])
            .await
            .unwrap();

        assert!(DiscussionRepository::find_by_id(&store, d.id())
            .await
            .unwrap()
            .is_none());
        assert!(store.find_by_ids(&[*d.id()]).await.unwrap().is_empty());
        assert!(store.stored_discussion(d.id()).unwrap().is_deleted());
    }

    #[tokio::test]
    async fn upsert_keeps_one_ballot_per_voter() {
        let store = InMemoryGovernanceStore::new();
        let d = stored_in(&store, DiscussionStatus::Voting).await;
        let voter = UserId::new();

        for value in [VoteValue::Agree, VoteValue::Disagree] {
            store
                .upsert(&Ballot::new(*d.id(), voter, value))
                .await
                .unwrap();
        }

        assert_eq!(store.ballot_count(d.id()), 1);
        assert_eq!(store.tally(d.id()).await.unwrap(), Tally::new(0, 1));
    }

    #[tokio::test]
    async fn upsert_checks_status_at_write_time() {
        let store = InMemoryGovernanceStore::new();
        let waiting = stored_in(&store, DiscussionStatus::Waiting).await;
        let resolved = stored_in(&store, DiscussionStatus::Resolved).await;

        for d in [&waiting, &resolved] {
            let err = store
                .upsert(&Ballot::new(*d.id(), UserId::new(), VoteValue::Agree))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::Forbidden);
            assert_eq!(store.ballot_count(d.id()), 0);
        }

        let missing = DiscussionId::new();
        let err = store
            .upsert(&Ballot::new(missing, UserId::new(), VoteValue::Agree))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DiscussionNotFound);
    }

    #[tokio::test]
    async fn action_save_requires_waiting_at_write_time() {
        let store = InMemoryGovernanceStore::new();
        let d = stored_in(&store, DiscussionStatus::Voting).await;
        let action = PendingAction::new(
            *d.id(),
            &ActionPayload::DeleteParty {
                party_id: PartyId::new(),
            },
        )
        .unwrap();

        let err = PendingActionStore::save(&store, &action).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(store.actions_of(d.id()).is_empty());
    }

    #[tokio::test]
    async fn open_resolution_holds_back_ballots() {
        let store = InMemoryGovernanceStore::new();
        let mut d = stored_in(&store, DiscussionStatus::FinalVoting).await;
        store
            .upsert(&Ballot::new(*d.id(), UserId::new(), VoteValue::Agree))
            .await
            .unwrap();

        let resolution = store
            .begin_resolution(d.id(), DiscussionStatus::FinalVoting)
            .await
            .unwrap();
        let late = tokio::spawn({
            let store = store.clone();
            let ballot = Ballot::new(*d.id(), UserId::new(), VoteValue::Disagree);
            async move { store.upsert(&ballot).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!late.is_finished());

        d.advance_to(DiscussionStatus::Resolved).unwrap();
        let counted = resolution.tally();
        resolution.commit(&d, &[status_changed(&d)]).await.unwrap();

        let err = late.await.unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(counted, Tally::new(1, 0));
        assert_eq!(store.tally(d.id()).await.unwrap(), counted);
        assert_eq!(stored_status(&store, d.id()), DiscussionStatus::Resolved);
        assert_eq!(store.outbox_entries().len(), 1);
    }

    #[tokio::test]
    async fn dropped_resolution_writes_nothing_and_releases_the_lock() {
        let store = InMemoryGovernanceStore::new();
        let d = stored_in(&store, DiscussionStatus::FinalVoting).await;

        let resolution = store
            .begin_resolution(d.id(), DiscussionStatus::FinalVoting)
            .await
            .unwrap();
        drop(resolution);

        store
            .upsert(&Ballot::new(*d.id(), UserId::new(), VoteValue::Agree))
            .await
            .unwrap();
        assert_eq!(stored_status(&store, d.id()), DiscussionStatus::FinalVoting);
        assert!(store.outbox_entries().is_empty());
    }

    #[tokio::test]
    async fn resolution_on_moved_discussion_is_conflict() {
        let store = InMemoryGovernanceStore::new();
        let d = stored_in(&store, DiscussionStatus::Voting).await;

        let err = store
            .begin_resolution(d.id(), DiscussionStatus::FinalVoting)
            .await
            .err()
            .unwrap();

        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn rolled_back_execution_changes_nothing() {
        let store = InMemoryGovernanceStore::new();
        let company = store.add_company("Acme");
        let party = store.add_party(company, "Builders");
        let d = stored_in(&store, DiscussionStatus::Waiting).await;
        let action = PendingAction::new(
            *d.id(),
            &ActionPayload::RenameParty {
                party_id: party,
                new_name: "Makers".to_string(),
            },
        )
        .unwrap();
        PendingActionStore::save(&store, &action).await.unwrap();

        let mut execution = store.begin_execution(action.id()).await.unwrap().unwrap();
        execution.rename_party(&party, "Makers").await.unwrap();
        execution.rollback().await.unwrap();

        assert_eq!(store.party(&party).unwrap().name, "Builders");
        assert!(!store.actions_of(action.discussion_id())[0].is_executed());
    }

    #[tokio::test]
    async fn committed_execution_applies_changes_and_is_not_reopened() {
        let store = InMemoryGovernanceStore::new();
        let company = store.add_company("Acme");
        let party = store.add_party(company, "Builders");
        let d = stored_in(&store, DiscussionStatus::Waiting).await;
        let action =
            PendingAction::new(*d.id(), &ActionPayload::DeleteParty { party_id: party }).unwrap();
        PendingActionStore::save(&store, &action).await.unwrap();

        let mut execution = store.begin_execution(action.id()).await.unwrap().unwrap();
        assert!(execution.delete_party(&party).await.unwrap());
        execution.commit().await.unwrap();

        assert!(store.party(&party).unwrap().deleted_at.is_some());
        assert!(store.begin_execution(action.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_phase_rejects_moved_discussion() {
        let store = InMemoryGovernanceStore::new();
        let d = stored_in(&store, DiscussionStatus::Waiting).await;
        let session = VotingSession::new(
            VotingSessionId::new(),
            *d.party_id(),
            "Assembly".to_string(),
            SessionSchedule::default(),
            [*d.id()],
        )
        .unwrap();
        VotingSessionRepository::save(&store, &session, &[])
            .await
            .unwrap();

        let mut advanced_session = session.clone();
        advanced_session.start_voting().unwrap();
        let mut advanced = d.clone();
        advanced.advance_to(DiscussionStatus::Voting).unwrap();

        let err = store
            .commit_phase(PhaseCommit {
                session: advanced_session,
                expected_status: session.status(),
                discussions: vec![DiscussionPhaseChange {
                    discussion: advanced,
                    expected_status: DiscussionStatus::Voting,
                }],
                events: vec![],
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        let stored = VotingSessionRepository::find_by_id(&store, session.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status(), session.status());
    }

    #[tokio::test]
    async fn outbox_pending_skips_published_entries() {
        let store = InMemoryGovernanceStore::new();
        let first = store
            .write(&EventEnvelope::new("a.v1", "1", "T", json!({})))
            .await
            .unwrap();
        store
            .write(&EventEnvelope::new("b.v1", "2", "T", json!({})))
            .await
            .unwrap();

        store.mark_published(first.id).await.unwrap();
        let pending = store.get_pending(10).await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event.event_type, "b.v1");
        assert_eq!(store.outbox_entries()[0].status, OutboxStatus::Published);
    }

    #[tokio::test]
    async fn processed_events_are_tracked_per_handler() {
        let store = InMemoryGovernanceStore::new();
        let event_id = EventId::new();

        store.mark_processed(&event_id, "ActionExecutor").await.unwrap();

        assert!(store.contains(&event_id, "ActionExecutor").await.unwrap());
        assert!(!store.contains(&event_id, "Auditor").await.unwrap());
    }
}
