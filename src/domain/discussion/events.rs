//! Discussion domain events.
//!
//! - `DiscussionStatusChanged` - A discussion moved along its lifecycle
//! - `DiscussionResolved` - Final vote tallied; drives pending action execution

use serde::{Deserialize, Serialize};

use super::DiscussionStatus;
use crate::domain::foundation::{domain_event, DiscussionId, EventId, Timestamp, UserId};

/// Event type the action executor subscribes to.
pub const DISCUSSION_RESOLVED: &str = "discussion.resolved.v1";

// ════════════════════════════════════════════════════════════════════════════
// DiscussionStatusChanged
// ════════════════════════════════════════════════════════════════════════════

/// Published when a discussion changes status outside of resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionStatusChanged {
    pub event_id: EventId,
    pub discussion_id: DiscussionId,
    pub from: DiscussionStatus,
    pub to: DiscussionStatus,

    /// `None` when the scheduler drove the change.
    pub changed_by: Option<UserId>,

    pub changed_at: Timestamp,
}

domain_event!(
    DiscussionStatusChanged,
    "discussion.status_changed.v1",
    Discussion(discussion_id),
    changed_at
);

// ════════════════════════════════════════════════════════════════════════════
// DiscussionResolved
// ════════════════════════════════════════════════════════════════════════════

/// Published (via the outbox) once a discussion is durably RESOLVED.
///
/// `approved` is true when AGREE strictly outnumbers DISAGREE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionResolved {
    pub event_id: EventId,
    pub discussion_id: DiscussionId,
    pub approved: bool,
    pub agree_count: u64,
    pub disagree_count: u64,
    pub resolved_at: Timestamp,
}

domain_event!(DiscussionResolved, "discussion.resolved.v1", Discussion(discussion_id), resolved_at);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    #[test]
    fn resolved_event_type_matches_constant() {
        let event = DiscussionResolved {
            event_id: EventId::new(),
            discussion_id: DiscussionId::new(),
            approved: true,
            agree_count: 3,
            disagree_count: 2,
            resolved_at: Timestamp::now(),
        };
        assert_eq!(event.event_type(), DISCUSSION_RESOLVED);
    }

    #[test]
    fn resolved_envelope_carries_tally() {
        let discussion_id = DiscussionId::new();
        let event = DiscussionResolved {
            event_id: EventId::new(),
            discussion_id,
            approved: false,
            agree_count: 2,
            disagree_count: 2,
            resolved_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();

        assert_eq!(envelope.aggregate_id, discussion_id.to_string());
        assert_eq!(envelope.payload["approved"], false);
        assert_eq!(envelope.payload["agree_count"], 2);
        assert_eq!(envelope.payload["disagree_count"], 2);
        assert_eq!(
            envelope.payload["discussion_id"],
            serde_json::json!(discussion_id.to_string())
        );
    }

    #[test]
    fn status_change_serializes_statuses_in_wire_form() {
        let event = DiscussionStatusChanged {
            event_id: EventId::new(),
            discussion_id: DiscussionId::new(),
            from: DiscussionStatus::Waiting,
            to: DiscussionStatus::Voting,
            changed_by: None,
            changed_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();

        assert_eq!(envelope.payload["from"], "WAITING");
        assert_eq!(envelope.payload["to"], "VOTING");
    }
}
