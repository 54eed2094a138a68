//! PostgreSQL implementation of VotingSessionRepository.
//!
//! Membership is not stored on the session row; it is read back from the
//! `discussions.session_id` pointers.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool};

use super::support::{column, conflict, insert_outbox, parse_column};
use crate::domain::discussion::Discussion;
use crate::domain::foundation::{
    DiscussionId, DomainError, ErrorCode, PartyId, Timestamp, VotingSessionId,
};
use crate::domain::voting_session::{SessionSchedule, VotingSession, VotingSessionStatus};
use crate::ports::{PhaseCommit, VotingSessionRepository};

/// PostgreSQL implementation of VotingSessionRepository.
#[derive(Clone)]
pub struct PostgresVotingSessionRepository {
    pool: PgPool,
}

impl PostgresVotingSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VotingSessionRepository for PostgresVotingSessionRepository {
    async fn save(
        &self,
        session: &VotingSession,
        members: &[Discussion],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let schedule = session.schedule();
        sqlx::query(
            r#"
            INSERT INTO voting_sessions (
                id, party_id, name, status, first_round_starts_at, second_round_starts_at,
                ends_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.party_id().as_uuid())
        .bind(session.name())
        .bind(session.status().as_str())
        .bind(schedule.first_round_starts_at.map(|t| *t.as_datetime()))
        .bind(schedule.second_round_starts_at.map(|t| *t.as_datetime()))
        .bind(schedule.ends_at.map(|t| *t.as_datetime()))
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert voting session", e))?;

        rebind(&mut tx, members).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit voting session", e))
    }

    async fn update(
        &self,
        session: &VotingSession,
        rebound: &[Discussion],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let schedule = session.schedule();
        let result = sqlx::query(
            r#"
            UPDATE voting_sessions SET
                name = $2,
                first_round_starts_at = $3,
                second_round_starts_at = $4,
                ends_at = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.name())
        .bind(schedule.first_round_starts_at.map(|t| *t.as_datetime()))
        .bind(schedule.second_round_starts_at.map(|t| *t.as_datetime()))
        .bind(schedule.ends_at.map(|t| *t.as_datetime()))
        .bind(session.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to update voting session", e))?;

        if result.rows_affected() == 0 {
            return Err(session_not_found(session.id()));
        }

        rebind(&mut tx, rebound).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit voting session", e))
    }

    async fn find_by_id(&self, id: &VotingSessionId) -> Result<Option<VotingSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT s.id, s.party_id, s.name, s.status, s.first_round_starts_at,
                   s.second_round_starts_at, s.ends_at, s.created_at, s.updated_at,
                   COALESCE(
                       array_agg(d.id) FILTER (WHERE d.id IS NOT NULL), '{}'
                   ) AS discussion_ids
            FROM voting_sessions s
            LEFT JOIN discussions d ON d.session_id = s.id AND d.deleted_at IS NULL
            WHERE s.id = $1
            GROUP BY s.id
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch voting session", e))?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn commit_phase(&self, commit: PhaseCommit) -> Result<(), DomainError> {
        let session_id = *commit.session.id();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let result = sqlx::query(
            "UPDATE voting_sessions SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(session_id.as_uuid())
        .bind(commit.expected_status.as_str())
        .bind(commit.session.status().as_str())
        .bind(commit.session.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to update voting session status", e))?;

        if result.rows_affected() == 0 {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT status FROM voting_sessions WHERE id = $1")
                    .bind(session_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| DomainError::database("Failed to read voting session", e))?;
            return Err(match exists {
                None => session_not_found(&session_id),
                Some(_) => conflict("Voting session", session_id, commit.expected_status),
            });
        }

        for change in &commit.discussions {
            let discussion = &change.discussion;
            let result = sqlx::query(
                r#"
                UPDATE discussions SET status = $3, updated_at = $4
                WHERE id = $1 AND status = $2 AND deleted_at IS NULL
                "#,
            )
            .bind(discussion.id().as_uuid())
            .bind(change.expected_status.as_str())
            .bind(discussion.status().as_str())
            .bind(discussion.updated_at().as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to advance discussion", e))?;

            // Dropping the transaction rolls back the session row as well.
            if result.rows_affected() == 0 {
                return Err(conflict("Discussion", discussion.id(), change.expected_status));
            }
        }

        insert_outbox(&mut tx, &commit.events).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit phase change", e))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn session_not_found(id: &VotingSessionId) -> DomainError {
    DomainError::new(
        ErrorCode::VotingSessionNotFound,
        format!("Voting session not found: {}", id),
    )
}

/// Write the session pointer of each given discussion.
async fn rebind(conn: &mut PgConnection, discussions: &[Discussion]) -> Result<(), DomainError> {
    for discussion in discussions {
        sqlx::query("UPDATE discussions SET session_id = $2 WHERE id = $1")
            .bind(discussion.id().as_uuid())
            .bind(discussion.session_id().map(|id| *id.as_uuid()))
            .execute(&mut *conn)
            .await
            .map_err(|e| DomainError::database("Failed to bind discussion to session", e))?;
    }
    Ok(())
}

fn row_to_session(row: &PgRow) -> Result<VotingSession, DomainError> {
    let optional_timestamp = |name: &str| -> Result<Option<Timestamp>, DomainError> {
        let value: Option<chrono::DateTime<chrono::Utc>> = column(row, name)?;
        Ok(value.map(Timestamp::from_datetime))
    };
    let schedule = SessionSchedule {
        first_round_starts_at: optional_timestamp("first_round_starts_at")?,
        second_round_starts_at: optional_timestamp("second_round_starts_at")?,
        ends_at: optional_timestamp("ends_at")?,
    };
    let discussion_ids: Vec<uuid::Uuid> = column(row, "discussion_ids")?;
    let status: VotingSessionStatus = parse_column(row, "status")?;

    Ok(VotingSession::reconstitute(
        VotingSessionId::from_uuid(column(row, "id")?),
        PartyId::from_uuid(column(row, "party_id")?),
        column(row, "name")?,
        status,
        schedule,
        discussion_ids
            .into_iter()
            .map(DiscussionId::from_uuid)
            .collect(),
        Timestamp::from_datetime(column(row, "created_at")?),
        Timestamp::from_datetime(column(row, "updated_at")?),
    ))
}
