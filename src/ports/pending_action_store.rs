//! PendingActionStore port - durable queue of organizational side effects.
//!
//! Execution is transactional per action: `begin_execution` opens a unit of
//! work that locks the action, exposes the organization changes it may
//! apply, and either commits them together with `executed = true` or rolls
//! everything back.

use async_trait::async_trait;

use crate::domain::action::PendingAction;
use crate::domain::foundation::{
    CompanyId, DiscussionId, DomainError, PartyId, PendingActionId, UserId,
};

/// Port for pending action persistence.
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    /// Insert a new pending action.
    ///
    /// The discussion's status is checked under a share lock held until the
    /// insert commits, so a concurrent status change cannot slip in between.
    ///
    /// # Errors
    ///
    /// - `DiscussionNotFound` if the discussion is gone or tombstoned
    /// - `Forbidden` unless the discussion is still WAITING
    async fn save(&self, action: &PendingAction) -> Result<(), DomainError>;

    /// All actions of a discussion in insertion order.
    async fn find_by_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<PendingAction>, DomainError>;

    /// Unexecuted actions of a discussion in insertion order.
    async fn find_unexecuted(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<PendingAction>, DomainError>;

    /// Open an independent transaction for one action.
    ///
    /// The action row is locked and re-read. Returns `None` when the action
    /// no longer exists or was already executed.
    async fn begin_execution(
        &self,
        id: &PendingActionId,
    ) -> Result<Option<Box<dyn ActionExecution>>, DomainError>;
}

/// One open action transaction.
///
/// Dropping an execution without committing discards its changes.
#[async_trait]
pub trait ActionExecution: OrganizationChanges {
    /// The locked action as re-read inside the transaction.
    fn action(&self) -> &PendingAction;

    /// Mark the action executed and commit every change made through it.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discard every change made through it; `executed` stays false.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Organization mutations available to an action transaction.
///
/// Membership and deletion changes are idempotent: they return `false` when
/// the organization is already in the requested state.
#[async_trait]
pub trait OrganizationChanges: Send {
    /// # Errors
    ///
    /// - `PartyNotFound` if the party does not exist
    async fn rename_party(&mut self, party_id: &PartyId, new_name: &str)
        -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `CompanyNotFound` if the company does not exist
    async fn rename_company(
        &mut self,
        company_id: &CompanyId,
        new_name: &str,
    ) -> Result<(), DomainError>;

    /// Add a user to a party, moving them into the party's company if needed.
    ///
    /// # Errors
    ///
    /// - `PartyNotFound` / `UserNotFound` if either side does not exist
    async fn add_member(&mut self, party_id: &PartyId, user_id: &UserId)
        -> Result<bool, DomainError>;

    /// Remove a user from a party.
    async fn evict_member(
        &mut self,
        party_id: &PartyId,
        user_id: &UserId,
    ) -> Result<bool, DomainError>;

    /// Tombstone a party.
    ///
    /// # Errors
    ///
    /// - `PartyNotFound` if the party never existed
    async fn delete_party(&mut self, party_id: &PartyId) -> Result<bool, DomainError>;
}
