//! OutboxWriter port.
//!
//! Aggregate writes append their envelopes to the outbox inside the same
//! transaction. The relay reads the rows back through this port once they
//! are committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EventEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Published,
    /// The last attempt failed; the row is retried.
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Published => "published",
            OutboxStatus::Failed => "failed",
        }
    }

    pub fn is_deliverable(&self) -> bool {
        *self != OutboxStatus::Published
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "published" => Ok(OutboxStatus::Published),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status {other}")),
        }
    }
}

/// An `event_outbox` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub event: EventEnvelope,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    /// Time of the latest delivery attempt.
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn new(event: EventEnvelope) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
        }
    }

    fn attempted(&mut self, status: OutboxStatus) {
        self.status = status;
        self.processed_at = Some(Utc::now());
        self.attempts += 1;
    }

    pub fn mark_published(&mut self) {
        self.attempted(OutboxStatus::Published);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.attempted(OutboxStatus::Failed);
        self.last_error = Some(error.into());
    }
}

#[async_trait]
pub trait OutboxWriter: Send + Sync {
    /// Append a row on its own, outside any aggregate write.
    async fn write(&self, event: &EventEnvelope) -> Result<OutboxEntry, DomainError>;

    /// Deliverable rows, oldest first, at most `limit`.
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError>;

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError>;

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips() {
        for status in [OutboxStatus::Pending, OutboxStatus::Published, OutboxStatus::Failed] {
            assert_eq!(status.as_str().parse::<OutboxStatus>(), Ok(status));
        }
        assert!("dead".parse::<OutboxStatus>().is_err());
    }

    #[test]
    fn publishing_counts_as_an_attempt() {
        let mut entry = OutboxEntry::new(EventEnvelope::test_fixture());
        assert!(entry.status.is_deliverable());

        entry.mark_published();

        assert_eq!((entry.status, entry.attempts), (OutboxStatus::Published, 1));
        assert!(entry.processed_at.is_some());
        assert!(!entry.status.is_deliverable());
    }

    #[test]
    fn failures_accumulate_and_keep_the_row_deliverable() {
        let mut entry = OutboxEntry::new(EventEnvelope::test_fixture());

        entry.mark_failed("bus unavailable");
        entry.mark_failed("bus still unavailable");

        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.last_error.as_deref(), Some("bus still unavailable"));
        assert!(entry.status.is_deliverable());
    }
}
