//! PostgreSQL implementation of MembershipDirectory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, PartyId, Principal, UserId};
use crate::ports::MembershipDirectory;

/// Resolves callers from `users` and `party_members`, ignoring deleted
/// parties.
#[derive(Clone)]
pub struct PostgresMembershipDirectory {
    pool: PgPool,
}

impl PostgresMembershipDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipDirectory for PostgresMembershipDirectory {
    async fn principal(&self, user_id: &UserId) -> Result<Option<Principal>, DomainError> {
        let user: Option<(bool,)> =
            sqlx::query_as("SELECT can_manage_sessions FROM users WHERE id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to fetch user", e))?;

        let Some((can_manage_sessions,)) = user else {
            return Ok(None);
        };

        let parties: Vec<(uuid::Uuid,)> = sqlx::query_as(
            r#"
            SELECT m.party_id
            FROM party_members m
            JOIN parties p ON p.id = m.party_id
            WHERE m.user_id = $1 AND p.deleted_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch party memberships", e))?;

        Ok(Some(Principal::new(
            *user_id,
            parties.into_iter().map(|(id,)| PartyId::from_uuid(id)),
            can_manage_sessions,
        )))
    }
}
