//! Shared fixture for handler tests.

use async_trait::async_trait;

use crate::adapters::memory::InMemoryGovernanceStore;
use crate::domain::discussion::{Discussion, DiscussionStatus};
use crate::domain::foundation::{
    CommandMetadata, CompanyId, DiscussionId, DomainError, EventEnvelope, PartyId, UserId,
};
use crate::ports::{DiscussionRepository, Resolution};

/// One company with one party, a manager, a plain member and an outsider
/// who belongs to a different party.
pub(crate) struct World {
    pub store: InMemoryGovernanceStore,
    pub company: CompanyId,
    pub party: PartyId,
    pub other_party: PartyId,
    pub manager: UserId,
    pub member: UserId,
    pub outsider: UserId,
}

impl World {
    pub fn new() -> Self {
        let store = InMemoryGovernanceStore::new();
        let company = store.add_company("Acme");
        let party = store.add_party(company, "Builders");
        let other_party = store.add_party(company, "Dreamers");
        let manager = store.add_user(&[party], true);
        let member = store.add_user(&[party], false);
        let outsider = store.add_user(&[other_party], true);
        Self {
            store,
            company,
            party,
            other_party,
            manager,
            member,
            outsider,
        }
    }

    pub fn metadata(&self, user_id: UserId) -> CommandMetadata {
        CommandMetadata::new(user_id).with_correlation_id("test-correlation")
    }

    /// Store a discussion created by `member` and walked to `status`.
    pub async fn discussion_in(&self, status: DiscussionStatus) -> Discussion {
        let mut discussion = Discussion::new(
            DiscussionId::new(),
            self.party,
            self.member,
            "Rename the party".to_string(),
            "We should pick a better name.".to_string(),
            None,
        )
        .unwrap();

        let path: &[DiscussionStatus] = match status {
            DiscussionStatus::Waiting => &[],
            DiscussionStatus::Voting => &[DiscussionStatus::Voting],
            DiscussionStatus::FinalVoting => {
                &[DiscussionStatus::Voting, DiscussionStatus::FinalVoting]
            }
            DiscussionStatus::Resolved => &[
                DiscussionStatus::Voting,
                DiscussionStatus::FinalVoting,
                DiscussionStatus::Resolved,
            ],
            DiscussionStatus::Archived => &[DiscussionStatus::Archived],
        };
        for step in path {
            discussion.advance_to(*step).unwrap();
        }

        DiscussionRepository::save(&self.store, &discussion)
            .await
            .unwrap();
        discussion
    }

    pub fn stored_status(&self, id: &DiscussionId) -> DiscussionStatus {
        self.store.stored_discussion(id).unwrap().status()
    }
}

/// Hands out the loaded snapshot, then commits a move to `then` before the
/// caller gets to write, as a concurrent manager would.
pub(crate) struct MovesAfterLoad {
    pub store: InMemoryGovernanceStore,
    pub then: DiscussionStatus,
}

#[async_trait]
impl DiscussionRepository for MovesAfterLoad {
    async fn save(&self, discussion: &Discussion) -> Result<(), DomainError> {
        DiscussionRepository::save(&self.store, discussion).await
    }

    async fn update(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError> {
        DiscussionRepository::update(&self.store, discussion, expected_status, events).await
    }

    async fn update_content(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
    ) -> Result<(), DomainError> {
        self.store.update_content(discussion, expected_status).await
    }

    async fn begin_resolution(
        &self,
        id: &DiscussionId,
        expected_status: DiscussionStatus,
    ) -> Result<Box<dyn Resolution>, DomainError> {
        self.store.begin_resolution(id, expected_status).await
    }

    async fn find_by_id(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError> {
        let snapshot = DiscussionRepository::find_by_id(&self.store, id).await?;
        if let Some(loaded) = &snapshot {
            let mut moved = loaded.clone();
            moved.advance_to(self.then).expect("status graph allows the move");
            DiscussionRepository::update(&self.store, &moved, loaded.status(), &[]).await?;
        }
        Ok(snapshot)
    }

    async fn find_by_ids(&self, ids: &[DiscussionId]) -> Result<Vec<Discussion>, DomainError> {
        self.store.find_by_ids(ids).await
    }
}
