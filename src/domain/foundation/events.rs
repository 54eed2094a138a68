//! Domain events and the envelope they travel in.
//!
//! Events are serialized into an [`EventEnvelope`] inside the same write
//! that changes the aggregate; the outbox relay later hands the envelope to
//! subscribers. Event type strings end in `.vN`, and that suffix is the
//! schema version.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::{DomainError, ErrorCode, Timestamp};

/// Something that happened to an aggregate.
pub trait DomainEvent: Send + Sync {
    /// Routing key, e.g. `discussion.resolved.v1`.
    fn event_type(&self) -> &'static str;

    fn aggregate_id(&self) -> String;

    fn aggregate_type(&self) -> &'static str;

    fn occurred_at(&self) -> Timestamp;

    fn event_id(&self) -> EventId;

    fn schema_version(&self) -> u32 {
        schema_version_of(self.event_type())
    }
}

/// `to_envelope()` for every serializable event.
pub trait SerializableDomainEvent: DomainEvent + Serialize {
    fn to_envelope(&self) -> Result<EventEnvelope, DomainError> {
        EventEnvelope::from_event(self)
    }
}

impl<T: DomainEvent + Serialize> SerializableDomainEvent for T {}

/// Implements [`DomainEvent`] for a struct with an `event_id: EventId` field.
///
/// ```ignore
/// domain_event!(DiscussionResolved, "discussion.resolved.v1", Discussion(discussion_id), resolved_at);
/// ```
///
/// The aggregate name is used verbatim as `aggregate_type`; the field in
/// parentheses is its id and the last argument is the timestamp field.
#[macro_export]
macro_rules! domain_event {
    ($event:ident, $event_type:literal, $aggregate:ident($id:ident), $at:ident) => {
        impl $crate::domain::foundation::DomainEvent for $event {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn aggregate_id(&self) -> String {
                self.$id.to_string()
            }

            fn aggregate_type(&self) -> &'static str {
                stringify!($aggregate)
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$at
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.event_id.clone()
            }
        }
    };
}

pub use domain_event;

fn schema_version_of(event_type: &str) -> u32 {
    match event_type.rsplit_once(".v") {
        Some((_, suffix)) => suffix.parse().unwrap_or(1),
        None => 1,
    }
}

/// Identity of one emitted event; the deduplication key for consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request context copied from the command that caused the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Acting user. Absent for scheduler-driven events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Serialized event as stored in `event_outbox.envelope` and delivered to
/// subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub schema_version: u32,
    pub aggregate_id: String,
    pub aggregate_type: String,
    pub occurred_at: Timestamp,
    pub payload: JsonValue,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Envelope around a raw JSON payload, stamped now with a fresh id.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        let event_type = event_type.into();
        Self {
            event_id: EventId::new(),
            schema_version: schema_version_of(&event_type),
            event_type,
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
            metadata: EventMetadata::default(),
        }
    }

    pub fn from_event<T>(event: &T) -> Result<Self, DomainError>
    where
        T: DomainEvent + Serialize + ?Sized,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("cannot serialize {}: {}", event.event_type(), e),
            )
        })?;

        Ok(Self {
            event_id: event.event_id(),
            event_type: event.event_type().to_string(),
            schema_version: event.schema_version(),
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            occurred_at: event.occurred_at(),
            payload,
            metadata: EventMetadata::default(),
        })
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.user_id = Some(id.into());
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.trace_id = Some(id.into());
        self
    }

    /// Decode the payload back into the concrete event.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

#[cfg(test)]
impl EventEnvelope {
    pub fn test_fixture() -> Self {
        Self::new(
            "discussion.status_changed.v1",
            "fixture-discussion",
            "Discussion",
            serde_json::json!({ "from": "WAITING", "to": "VOTING" }),
        )
    }
}
