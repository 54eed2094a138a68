//! PostgreSQL implementation of DiscussionRepository.
//!
//! Status writes are conditional on the stored status and share a
//! transaction with the outbox rows of the emitted events. Lifecycle and
//! content are written by separate statements, and neither touches
//! `session_id`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::support::{
    column, conflict, count_ballots, insert_outbox, lock_discussion, parse_column, RowLock,
};
use crate::domain::discussion::{Attachment, Discussion, DiscussionStatus};
use crate::domain::foundation::{
    DiscussionId, DomainError, ErrorCode, EventEnvelope, PartyId, Timestamp, UserId,
    VotingSessionId,
};
use crate::domain::vote::Tally;
use crate::ports::{DiscussionRepository, Resolution};

const SELECT_DISCUSSION: &str = r#"
    SELECT id, party_id, creator_id, subject, content, file_url, file_name, file_size,
           status, session_id, created_at, updated_at, deleted_at
    FROM discussions
"#;

/// PostgreSQL implementation of DiscussionRepository.
#[derive(Clone)]
pub struct PostgresDiscussionRepository {
    pool: PgPool,
}

impl PostgresDiscussionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiscussionRepository for PostgresDiscussionRepository {
    async fn save(&self, discussion: &Discussion) -> Result<(), DomainError> {
        let attachment = discussion.attachment();
        sqlx::query(
            r#"
            INSERT INTO discussions (
                id, party_id, creator_id, subject, content, file_url, file_name, file_size,
                status, session_id, created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(discussion.id().as_uuid())
        .bind(discussion.party_id().as_uuid())
        .bind(discussion.creator_id().as_uuid())
        .bind(discussion.subject())
        .bind(discussion.content())
        .bind(attachment.map(|a| a.file_url.clone()))
        .bind(attachment.and_then(|a| a.file_name.clone()))
        .bind(attachment.and_then(|a| a.file_size))
        .bind(discussion.status().as_str())
        .bind(discussion.session_id().map(|id| *id.as_uuid()))
        .bind(discussion.created_at().as_datetime())
        .bind(discussion.updated_at().as_datetime())
        .bind(discussion.deleted_at().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert discussion", e))?;

        Ok(())
    }

    async fn update(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE discussions SET status = $3, updated_at = $4, deleted_at = $5
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(discussion.id().as_uuid())
        .bind(expected_status.as_str())
        .bind(discussion.status().as_str())
        .bind(discussion.updated_at().as_datetime())
        .bind(discussion.deleted_at().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to update discussion", e))?;

        if result.rows_affected() == 0 {
            return Err(missing_or_moved(&mut tx, discussion.id(), expected_status).await);
        }

        insert_outbox(&mut tx, events).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit discussion update", e))
    }

    async fn update_content(
        &self,
        discussion: &Discussion,
        expected_status: DiscussionStatus,
    ) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;

        let attachment = discussion.attachment();
        let result = sqlx::query(
            r#"
            UPDATE discussions SET
                subject = $3,
                content = $4,
                file_url = $5,
                file_name = $6,
                file_size = $7,
                updated_at = $8
            WHERE id = $1 AND status = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(discussion.id().as_uuid())
        .bind(expected_status.as_str())
        .bind(discussion.subject())
        .bind(discussion.content())
        .bind(attachment.map(|a| a.file_url.clone()))
        .bind(attachment.and_then(|a| a.file_name.clone()))
        .bind(attachment.and_then(|a| a.file_size))
        .bind(discussion.updated_at().as_datetime())
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::database("Failed to update discussion content", e))?;

        if result.rows_affected() == 0 {
            return Err(missing_or_moved(&mut conn, discussion.id(), expected_status).await);
        }
        Ok(())
    }

    async fn begin_resolution(
        &self,
        id: &DiscussionId,
        expected_status: DiscussionStatus,
    ) -> Result<Box<dyn Resolution>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin resolution", e))?;

        let stored = lock_discussion(&mut tx, id, RowLock::Update).await?;
        if stored != expected_status {
            return Err(conflict("Discussion", id, expected_status));
        }
        let tally = count_ballots(&mut tx, id).await?;

        Ok(Box::new(PostgresResolution {
            tx,
            discussion_id: *id,
            tally,
        }))
    }

    async fn find_by_id(&self, id: &DiscussionId) -> Result<Option<Discussion>, DomainError> {
        let row = sqlx::query(&format!(
            "{} WHERE id = $1 AND deleted_at IS NULL",
            SELECT_DISCUSSION
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch discussion", e))?;

        row.as_ref().map(row_to_discussion).transpose()
    }

    async fn find_by_ids(&self, ids: &[DiscussionId]) -> Result<Vec<Discussion>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query(&format!(
            "{} WHERE id = ANY($1) AND deleted_at IS NULL ORDER BY created_at",
            SELECT_DISCUSSION
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch discussions", e))?;

        rows.iter().map(row_to_discussion).collect()
    }
}

/// Open resolution holding `FOR UPDATE` on the discussion row. Dropping it
/// rolls back.
struct PostgresResolution {
    tx: Transaction<'static, Postgres>,
    discussion_id: DiscussionId,
    tally: Tally,
}

#[async_trait]
impl Resolution for PostgresResolution {
    fn tally(&self) -> Tally {
        self.tally
    }

    async fn commit(
        self: Box<Self>,
        discussion: &Discussion,
        events: &[EventEnvelope],
    ) -> Result<(), DomainError> {
        let PostgresResolution {
            mut tx,
            discussion_id,
            ..
        } = *self;

        sqlx::query("UPDATE discussions SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(discussion_id.as_uuid())
            .bind(discussion.status().as_str())
            .bind(discussion.updated_at().as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to resolve discussion", e))?;

        insert_outbox(&mut tx, events).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit resolution", e))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

/// Explain a conditional write that matched no row.
async fn missing_or_moved(
    conn: &mut PgConnection,
    id: &DiscussionId,
    expected_status: DiscussionStatus,
) -> DomainError {
    let stored: Result<Option<(String,)>, _> =
        sqlx::query_as("SELECT status FROM discussions WHERE id = $1 AND deleted_at IS NULL")
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await;

    match stored {
        Ok(None) => DomainError::new(
            ErrorCode::DiscussionNotFound,
            format!("Discussion not found: {}", id),
        ),
        Ok(Some(_)) => conflict("Discussion", id, expected_status),
        Err(e) => DomainError::database("Failed to read discussion status", e),
    }
}

fn row_to_discussion(row: &PgRow) -> Result<Discussion, DomainError> {
    let file_url: Option<String> = column(row, "file_url")?;
    let attachment = match file_url {
        Some(file_url) => Some(Attachment {
            file_url,
            file_name: column(row, "file_name")?,
            file_size: column(row, "file_size")?,
        }),
        None => None,
    };
    let session_id: Option<uuid::Uuid> = column(row, "session_id")?;
    let deleted_at: Option<chrono::DateTime<chrono::Utc>> = column(row, "deleted_at")?;

    Ok(Discussion::reconstitute(
        DiscussionId::from_uuid(column(row, "id")?),
        PartyId::from_uuid(column(row, "party_id")?),
        UserId::from_uuid(column(row, "creator_id")?),
        column(row, "subject")?,
        column(row, "content")?,
        attachment,
        parse_column(row, "status")?,
        session_id.map(VotingSessionId::from_uuid),
        Timestamp::from_datetime(column(row, "created_at")?),
        Timestamp::from_datetime(column(row, "updated_at")?),
        deleted_at.map(Timestamp::from_datetime),
    ))
}
