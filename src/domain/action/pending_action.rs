//! PendingAction entity - one queued organizational change.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ActionPayload;
use crate::domain::errors::GovernanceError;
use crate::domain::foundation::{DiscussionId, PendingActionId, Timestamp};

/// A side effect attached to a discussion, applied once the discussion is
/// resolved in favour.
///
/// The payload is kept in its stored JSON form; decoding happens at
/// execution time so a row written by an older build cannot poison the
/// whole batch.
///
/// # Invariants
///
/// - `executed` flips from false to true at most once and never back
/// - the payload is immutable after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    id: PendingActionId,
    discussion_id: DiscussionId,
    payload: JsonValue,
    executed: bool,
    created_at: Timestamp,
}

impl PendingAction {
    /// Queue a validated payload.
    ///
    /// # Errors
    ///
    /// - `Validation` if the payload fails its own checks
    /// - `Infrastructure` if it cannot be serialized
    pub fn new(
        discussion_id: DiscussionId,
        payload: &ActionPayload,
    ) -> Result<Self, GovernanceError> {
        payload.validate()?;
        let payload = payload
            .to_json()
            .map_err(|e| GovernanceError::infrastructure(format!("encode payload: {}", e)))?;

        Ok(Self {
            id: PendingActionId::new(),
            discussion_id,
            payload,
            executed: false,
            created_at: Timestamp::now(),
        })
    }

    pub fn reconstitute(
        id: PendingActionId,
        discussion_id: DiscussionId,
        payload: JsonValue,
        executed: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            discussion_id,
            payload,
            executed,
            created_at,
        }
    }

    pub fn id(&self) -> &PendingActionId {
        &self.id
    }

    pub fn discussion_id(&self) -> &DiscussionId {
        &self.discussion_id
    }

    pub fn raw_payload(&self) -> &JsonValue {
        &self.payload
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Decode the stored payload.
    ///
    /// # Errors
    ///
    /// - `Fatal` if the stored JSON is not a known payload
    pub fn payload(&self) -> Result<ActionPayload, GovernanceError> {
        ActionPayload::from_json(self.payload.clone()).map_err(|e| {
            GovernanceError::fatal(format!("pending action {}: {}", self.id, e))
        })
    }

    pub fn mark_executed(&mut self) {
        self.executed = true;
    }
}
