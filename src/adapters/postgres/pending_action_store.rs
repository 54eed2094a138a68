//! PostgreSQL implementation of PendingActionStore.
//!
//! Inserts hold a share lock on the discussion row while checking it is
//! still WAITING. Each execution runs in its own transaction holding a row lock on the
//! action, so two executors racing on the same event serialize and the
//! loser sees `executed = true`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Transaction};

use super::support::{column, lock_discussion, RowLock};
use crate::domain::action::PendingAction;
use crate::domain::foundation::{
    CompanyId, DiscussionId, DomainError, ErrorCode, PartyId, PendingActionId, Timestamp, UserId,
};
use crate::ports::{ActionExecution, OrganizationChanges, PendingActionStore};

/// PostgreSQL implementation of PendingActionStore.
#[derive(Clone)]
pub struct PostgresPendingActionStore {
    pool: PgPool,
}

impl PostgresPendingActionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingActionStore for PostgresPendingActionStore {
    async fn save(&self, action: &PendingAction) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        lock_discussion(&mut tx, action.discussion_id(), RowLock::Share)
            .await?
            .guard_new_action(action.discussion_id())?;

        sqlx::query(
            r#"
            INSERT INTO pending_actions (id, discussion_id, payload, executed, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(action.id().as_uuid())
        .bind(action.discussion_id().as_uuid())
        .bind(action.raw_payload())
        .bind(action.is_executed())
        .bind(action.created_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert pending action", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit pending action", e))
    }

    async fn find_by_discussion(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<PendingAction>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, discussion_id, payload, executed, created_at
            FROM pending_actions
            WHERE discussion_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(discussion_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch pending actions", e))?;

        rows.iter().map(row_to_action).collect()
    }

    async fn find_unexecuted(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<Vec<PendingAction>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, discussion_id, payload, executed, created_at
            FROM pending_actions
            WHERE discussion_id = $1 AND executed = FALSE
            ORDER BY created_at, id
            "#,
        )
        .bind(discussion_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch unexecuted actions", e))?;

        rows.iter().map(row_to_action).collect()
    }

    async fn begin_execution(
        &self,
        id: &PendingActionId,
    ) -> Result<Option<Box<dyn ActionExecution>>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin action transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT id, discussion_id, payload, executed, created_at
            FROM pending_actions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to lock pending action", e))?;

        let action = match row.as_ref().map(row_to_action).transpose()? {
            Some(action) if !action.is_executed() => action,
            _ => {
                tx.rollback()
                    .await
                    .map_err(|e| DomainError::database("Failed to release action lock", e))?;
                return Ok(None);
            }
        };

        Ok(Some(Box::new(PostgresActionExecution { tx, action })))
    }
}

/// Open action transaction. Dropping it without commit rolls back.
struct PostgresActionExecution {
    tx: Transaction<'static, Postgres>,
    action: PendingAction,
}

#[async_trait]
impl OrganizationChanges for PostgresActionExecution {
    async fn rename_party(
        &mut self,
        party_id: &PartyId,
        new_name: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE parties SET name = $2, updated_at = now() WHERE id = $1")
            .bind(party_id.as_uuid())
            .bind(new_name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("Failed to rename party", e))?;

        if result.rows_affected() == 0 {
            return Err(party_not_found(party_id));
        }
        Ok(())
    }

    async fn rename_company(
        &mut self,
        company_id: &CompanyId,
        new_name: &str,
    ) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE companies SET name = $2, updated_at = now() WHERE id = $1")
                .bind(company_id.as_uuid())
                .bind(new_name)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| DomainError::database("Failed to rename company", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::CompanyNotFound,
                format!("Company not found: {}", company_id),
            ));
        }
        Ok(())
    }

    async fn add_member(
        &mut self,
        party_id: &PartyId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        let company: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT company_id FROM parties WHERE id = $1")
                .bind(party_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| DomainError::database("Failed to fetch party", e))?;
        let (company_id,) = company.ok_or_else(|| party_not_found(party_id))?;

        let (already_member,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM party_members WHERE party_id = $1 AND user_id = $2)",
        )
        .bind(party_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("Failed to check party membership", e))?;
        if already_member {
            return Ok(false);
        }

        // Joining a party moves the user into the party's company.
        let moved = sqlx::query("UPDATE users SET company_id = $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(company_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("Failed to update user company", e))?;
        if moved.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", user_id),
            ));
        }

        sqlx::query("INSERT INTO party_members (party_id, user_id) VALUES ($1, $2)")
            .bind(party_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("Failed to add party member", e))?;

        Ok(true)
    }

    async fn evict_member(
        &mut self,
        party_id: &PartyId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM party_members WHERE party_id = $1 AND user_id = $2")
            .bind(party_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("Failed to evict party member", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_party(&mut self, party_id: &PartyId) -> Result<bool, DomainError> {
        let deleted: Option<(Option<chrono::DateTime<chrono::Utc>>,)> =
            sqlx::query_as("SELECT deleted_at FROM parties WHERE id = $1")
                .bind(party_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(|e| DomainError::database("Failed to fetch party", e))?;

        match deleted {
            None => Err(party_not_found(party_id)),
            Some((Some(_),)) => Ok(false),
            Some((None,)) => {
                sqlx::query("UPDATE parties SET deleted_at = now() WHERE id = $1")
                    .bind(party_id.as_uuid())
                    .execute(&mut *self.tx)
                    .await
                    .map_err(|e| DomainError::database("Failed to delete party", e))?;
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl ActionExecution for PostgresActionExecution {
    fn action(&self) -> &PendingAction {
        &self.action
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let PostgresActionExecution { mut tx, action } = *self;

        sqlx::query("UPDATE pending_actions SET executed = TRUE WHERE id = $1")
            .bind(action.id().as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to mark action executed", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit action", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DomainError::database("Failed to roll back action", e))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn party_not_found(id: &PartyId) -> DomainError {
    DomainError::new(ErrorCode::PartyNotFound, format!("Party not found: {}", id))
}

fn row_to_action(row: &PgRow) -> Result<PendingAction, DomainError> {
    Ok(PendingAction::reconstitute(
        PendingActionId::from_uuid(column(row, "id")?),
        DiscussionId::from_uuid(column(row, "discussion_id")?),
        column(row, "payload")?,
        column(row, "executed")?,
        Timestamp::from_datetime(column(row, "created_at")?),
    ))
}
