//! Caller context passed to every command handler.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Who is acting, plus the request identifiers copied onto emitted events.
///
/// ```ignore
/// let metadata = CommandMetadata::new(user_id).with_correlation_id("req-42");
/// cast_vote.handle(cmd, metadata).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub user_id: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
}

impl CommandMetadata {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            correlation_id: None,
            trace_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// The caller's correlation id, or a fresh one when none was supplied.
    ///
    /// Each call without an explicit id yields a different value, so read
    /// it once per command.
    pub fn correlation_id(&self) -> String {
        match &self.correlation_id {
            Some(id) => id.clone(),
            None => Uuid::new_v4().to_string(),
        }
    }

    pub fn explicit_correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}
