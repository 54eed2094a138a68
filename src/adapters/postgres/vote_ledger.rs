//! PostgreSQL implementation of VoteLedger.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use super::support::{column, count_ballots, lock_discussion, parse_column, RowLock};
use crate::domain::foundation::{DiscussionId, DomainError, Timestamp, UserId};
use crate::domain::vote::{Ballot, Tally};
use crate::ports::VoteLedger;

/// PostgreSQL implementation of VoteLedger.
///
/// One row per (discussion, voter); re-casting replaces the row in place.
/// Each write holds a share lock on the discussion row, so it either lands
/// before a status change or sees the new status.
#[derive(Clone)]
pub struct PostgresVoteLedger {
    pool: PgPool,
}

impl PostgresVoteLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteLedger for PostgresVoteLedger {
    async fn upsert(&self, ballot: &Ballot) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        lock_discussion(&mut tx, &ballot.discussion_id, RowLock::Share)
            .await?
            .guard_ballot(&ballot.discussion_id)?;

        sqlx::query(
            r#"
            INSERT INTO discussion_votes (discussion_id, user_id, value, cast_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (discussion_id, user_id)
            DO UPDATE SET value = EXCLUDED.value, cast_at = EXCLUDED.cast_at
            "#,
        )
        .bind(ballot.discussion_id.as_uuid())
        .bind(ballot.voter_id.as_uuid())
        .bind(ballot.value.as_str())
        .bind(ballot.cast_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to upsert ballot", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit ballot", e))
    }

    async fn tally(&self, discussion_id: &DiscussionId) -> Result<Tally, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;
        count_ballots(&mut conn, discussion_id).await
    }

    async fn ballots_for(&self, discussion_id: &DiscussionId) -> Result<Vec<Ballot>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT discussion_id, user_id, value, cast_at
            FROM discussion_votes
            WHERE discussion_id = $1
            ORDER BY cast_at
            "#,
        )
        .bind(discussion_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch ballots", e))?;

        rows.iter().map(row_to_ballot).collect()
    }
}

fn row_to_ballot(row: &PgRow) -> Result<Ballot, DomainError> {
    Ok(Ballot {
        discussion_id: DiscussionId::from_uuid(column(row, "discussion_id")?),
        voter_id: UserId::from_uuid(column(row, "user_id")?),
        value: parse_column(row, "value")?,
        cast_at: Timestamp::from_datetime(column(row, "cast_at")?),
    })
}
