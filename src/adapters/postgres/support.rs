//! Row decoding and outbox helpers shared by the PostgreSQL adapters.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use std::fmt;
use std::str::FromStr;

use crate::domain::discussion::DiscussionStatus;
use crate::domain::foundation::{
    DiscussionId, DomainError, ErrorCode, EventEnvelope, ValidationError,
};
use crate::domain::vote::Tally;
use crate::ports::OutboxEntry;

/// Row lock taken on a discussion before a guarded write.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RowLock {
    /// Held by ballot and action inserts; blocks status changes only.
    Share,
    /// Held by resolution; blocks ballots as well.
    Update,
}

/// Read a column, mapping decode failures to `DatabaseError`.
pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

/// Parse a stored enum column such as a status or vote value.
pub(crate) fn parse_column<T>(row: &PgRow, name: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: String = column(row, name)?;
    raw.parse().map_err(|e: T::Err| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} '{}': {}", name, raw, e),
        )
    })
}

pub(crate) fn conflict(
    what: &str,
    id: impl fmt::Display,
    expected: impl fmt::Display,
) -> DomainError {
    DomainError::new(
        ErrorCode::Conflict,
        format!("{} {} is no longer {}", what, id, expected),
    )
    .with_detail("expected_status", expected.to_string())
}

/// Append events to the outbox on the caller's connection, typically an
/// open transaction, so they commit or roll back with the state change.
pub(crate) async fn insert_outbox(
    conn: &mut PgConnection,
    events: &[EventEnvelope],
) -> Result<(), DomainError> {
    for event in events {
        insert_outbox_entry(conn, &OutboxEntry::new(event.clone())).await?;
    }
    Ok(())
}

pub(crate) async fn insert_outbox_entry(
    conn: &mut PgConnection,
    entry: &OutboxEntry,
) -> Result<(), DomainError> {
    let envelope = serde_json::to_value(&entry.event).map_err(|e| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Failed to serialize event envelope: {}", e),
        )
    })?;

    sqlx::query(
        r#"
        INSERT INTO event_outbox (id, event_id, event_type, envelope, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.id)
    .bind(entry.event.event_id.as_str())
    .bind(&entry.event.event_type)
    .bind(envelope)
    .bind(entry.status.as_str())
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to write outbox entry", e))?;

    Ok(())
}

/// Lock a live discussion row and read its status.
///
/// Returns `DiscussionNotFound` if the row is gone or tombstoned.
pub(crate) async fn lock_discussion(
    conn: &mut PgConnection,
    id: &DiscussionId,
    lock: RowLock,
) -> Result<DiscussionStatus, DomainError> {
    let sql = match lock {
        RowLock::Share => {
            "SELECT status FROM discussions WHERE id = $1 AND deleted_at IS NULL FOR SHARE"
        }
        RowLock::Update => {
            "SELECT status FROM discussions WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        }
    };
    let row: Option<(String,)> = sqlx::query_as(sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DomainError::database("Failed to lock discussion", e))?;

    let (status,) = row.ok_or_else(|| {
        DomainError::new(
            ErrorCode::DiscussionNotFound,
            format!("Discussion not found: {}", id),
        )
    })?;
    status.parse().map_err(|e: ValidationError| {
        DomainError::new(ErrorCode::DatabaseError, e.to_string())
    })
}

/// Count the current ballots of a discussion.
pub(crate) async fn count_ballots(
    conn: &mut PgConnection,
    discussion_id: &DiscussionId,
) -> Result<Tally, DomainError> {
    let (agree, disagree): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FILTER (WHERE value = 'AGREE'),
               COUNT(*) FILTER (WHERE value = 'DISAGREE')
        FROM discussion_votes
        WHERE discussion_id = $1
        "#,
    )
    .bind(discussion_id.as_uuid())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to tally ballots", e))?;

    Ok(Tally::new(agree.max(0) as u64, disagree.max(0) as u64))
}
