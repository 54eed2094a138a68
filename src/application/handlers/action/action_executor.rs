//! ActionExecutor - Event handler that applies approved pending actions.
//!
//! Subscribed to `discussion.resolved.v1`. Each unexecuted action of an
//! approved discussion runs in its own transaction:
//!
//! 1. Lock the action row and re-check `executed`
//! 2. Decode the stored payload
//! 3. Apply the organization change
//! 4. Mark executed and commit, or roll back and log
//!
//! A failing action never affects its siblings or the resolution that
//! triggered it. It stays unexecuted; nothing retries it automatically.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::action::ActionPayload;
use crate::domain::discussion::DiscussionResolved;
use crate::domain::foundation::{
    DiscussionId, DomainError, ErrorCode, EventEnvelope, PendingActionId,
};
use crate::domain::GovernanceError;
use crate::ports::{ActionExecution, EventHandler, PendingActionStore};

/// What happened to one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Executed,
    /// Already executed (or gone) by the time the lock was taken.
    Skipped,
    Failed,
}

/// Per-discussion summary of an executor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecutionReport {
    fn record(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Executed => self.executed += 1,
            ActionOutcome::Skipped => self.skipped += 1,
            ActionOutcome::Failed => self.failed += 1,
        }
    }
}

/// Applies the pending actions of approved discussions.
pub struct ActionExecutor {
    actions: Arc<dyn PendingActionStore>,
}

impl ActionExecutor {
    pub fn new(actions: Arc<dyn PendingActionStore>) -> Self {
        Self { actions }
    }

    /// Run every unexecuted action of `discussion_id` in insertion order.
    ///
    /// # Errors
    ///
    /// Only when the action list itself cannot be loaded. Per-action
    /// failures are logged and counted in the report.
    pub async fn execute_all(
        &self,
        discussion_id: &DiscussionId,
    ) -> Result<ExecutionReport, DomainError> {
        let pending = self.actions.find_unexecuted(discussion_id).await?;
        let mut report = ExecutionReport::default();

        for action in &pending {
            report.record(self.execute_one(action.id()).await);
        }

        tracing::info!(
            discussion_id = %discussion_id,
            executed = report.executed,
            skipped = report.skipped,
            failed = report.failed,
            "Pending actions processed"
        );
        Ok(report)
    }

    /// Run one action in its own transaction.
    pub async fn execute_one(&self, id: &PendingActionId) -> ActionOutcome {
        let mut execution = match self.actions.begin_execution(id).await {
            Ok(Some(execution)) => execution,
            Ok(None) => {
                tracing::debug!(action_id = %id, "Action already executed, skipping");
                return ActionOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(action_id = %id, error = %e, "Failed to open action transaction");
                return ActionOutcome::Failed;
            }
        };

        match apply(execution.as_mut()).await {
            Ok(()) => match execution.commit().await {
                Ok(()) => {
                    tracing::info!(action_id = %id, "Action executed");
                    ActionOutcome::Executed
                }
                Err(e) => {
                    tracing::error!(action_id = %id, error = %e, "Failed to commit action");
                    ActionOutcome::Failed
                }
            },
            Err(e) => {
                tracing::error!(
                    action_id = %id,
                    error_code = ?e.code(),
                    error = %e,
                    "Action failed, rolling back"
                );
                if let Err(rollback) = execution.rollback().await {
                    tracing::warn!(action_id = %id, error = %rollback, "Rollback failed");
                }
                ActionOutcome::Failed
            }
        }
    }
}

/// Decode the locked action and dispatch it to the organization change.
async fn apply(execution: &mut dyn ActionExecution) -> Result<(), GovernanceError> {
    let payload = execution.action().payload()?;
    let action_id = *execution.action().id();

    match payload {
        ActionPayload::RenameParty { party_id, new_name } => {
            execution.rename_party(&party_id, &new_name).await?;
        }
        ActionPayload::RenameCompany {
            company_id,
            new_name,
        } => {
            execution.rename_company(&company_id, &new_name).await?;
        }
        ActionPayload::AddUserToParty { party_id, user_id } => {
            if !execution.add_member(&party_id, &user_id).await? {
                tracing::warn!(
                    action_id = %action_id,
                    party_id = %party_id,
                    user_id = %user_id,
                    "User already in party, nothing to add"
                );
            }
        }
        ActionPayload::EvictUserFromParty { party_id, user_id } => {
            if !execution.evict_member(&party_id, &user_id).await? {
                tracing::warn!(
                    action_id = %action_id,
                    party_id = %party_id,
                    user_id = %user_id,
                    "User not in party, nothing to evict"
                );
            }
        }
        ActionPayload::DeleteParty { party_id } => {
            if !execution.delete_party(&party_id).await? {
                tracing::info!(
                    action_id = %action_id,
                    party_id = %party_id,
                    "Party already deleted"
                );
            }
        }
    }
    Ok(())
}

#[async_trait]
impl EventHandler for ActionExecutor {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let resolved: DiscussionResolved = event.payload_as().map_err(|e| {
            DomainError::new(
                ErrorCode::MalformedPayload,
                format!("{} payload: {}", event.event_type, e),
            )
        })?;

        if !resolved.approved {
            tracing::info!(
                discussion_id = %resolved.discussion_id,
                agree = resolved.agree_count,
                disagree = resolved.disagree_count,
                "Discussion rejected, pending actions left untouched"
            );
            return Ok(());
        }

        self.execute_all(&resolved.discussion_id).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ActionExecutor"
    }
}
