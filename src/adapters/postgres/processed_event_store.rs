//! `processed_events` table.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, EventId};
use crate::ports::ProcessedEventStore;

/// Rows keyed by `(event_id, handler_name)`.
#[derive(Clone)]
pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn contains(&self, event_id: &EventId, handler_name: &str) -> Result<bool, DomainError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM processed_events WHERE event_id = $1 AND handler_name = $2)",
        )
        .bind(event_id.as_str())
        .bind(handler_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check processed event", e))?;

        Ok(exists)
    }

    async fn mark_processed(
        &self,
        event_id: &EventId,
        handler_name: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, handler_name, processed_at)
            VALUES ($1, $2, now())
            ON CONFLICT (event_id, handler_name) DO NOTHING
            "#,
        )
        .bind(event_id.as_str())
        .bind(handler_name)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record processed event", e))?;

        Ok(())
    }
}
