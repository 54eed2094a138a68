//! MembershipDirectory port - resolves callers into principals.
//!
//! User, company and party administration live outside the governance
//! engine; this port is its only window onto them.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Principal, UserId};

/// Port for looking up who a caller is.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Resolve a user into party memberships and role flags.
    ///
    /// Returns `None` if the user does not exist.
    async fn principal(&self, user_id: &UserId) -> Result<Option<Principal>, DomainError>;
}
