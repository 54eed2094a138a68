//! `event_outbox` table, relay side.
//!
//! Repositories insert rows inside their own transactions through
//! `support::insert_outbox`; this adapter reads deliverable rows back and
//! records each delivery attempt.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use uuid::Uuid;

use super::support::{column, insert_outbox_entry, parse_column};
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{OutboxEntry, OutboxWriter};

#[derive(Clone)]
pub struct PostgresOutboxWriter {
    pool: PgPool,
}

impl PostgresOutboxWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxWriter for PostgresOutboxWriter {
    async fn write(&self, event: &EventEnvelope) -> Result<OutboxEntry, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;
        let entry = OutboxEntry::new(event.clone());
        insert_outbox_entry(&mut conn, &entry).await?;
        Ok(entry)
    }

    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, envelope, status, attempts, last_error, created_at, processed_at
            FROM event_outbox
            WHERE status <> 'published'
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch pending outbox entries", e))?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE event_outbox
            SET status = 'published', processed_at = now(), attempts = attempts + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark outbox entry published", e))?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE event_outbox
            SET status = 'failed', processed_at = now(), attempts = attempts + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark outbox entry failed", e))?;

        Ok(())
    }
}

fn row_to_entry(row: &PgRow) -> Result<OutboxEntry, DomainError> {
    let envelope: serde_json::Value = column(row, "envelope")?;
    let event = serde_json::from_value::<EventEnvelope>(envelope).map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Undecodable outbox envelope: {}", e))
    })?;
    let attempts: i32 = column(row, "attempts")?;

    Ok(OutboxEntry {
        id: column(row, "id")?,
        event,
        status: parse_column(row, "status")?,
        created_at: column(row, "created_at")?,
        processed_at: column(row, "processed_at")?,
        attempts: u32::try_from(attempts).unwrap_or(0),
        last_error: column(row, "last_error")?,
    })
}
