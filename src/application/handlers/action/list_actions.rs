//! ListActionsHandler - Query handler for a discussion's pending actions.

use std::sync::Arc;

use crate::application::handlers::caller::{load_discussion, load_principal};
use crate::domain::action::PendingAction;
use crate::domain::foundation::{CommandMetadata, DiscussionId};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory, PendingActionStore};

#[derive(Debug, Clone)]
pub struct ListActionsQuery {
    pub discussion_id: DiscussionId,
}

/// Handler listing actions in insertion order, executed ones included.
pub struct ListActionsHandler {
    directory: Arc<dyn MembershipDirectory>,
    discussions: Arc<dyn DiscussionRepository>,
    actions: Arc<dyn PendingActionStore>,
}

impl ListActionsHandler {
    pub fn new(
        directory: Arc<dyn MembershipDirectory>,
        discussions: Arc<dyn DiscussionRepository>,
        actions: Arc<dyn PendingActionStore>,
    ) -> Self {
        Self {
            directory,
            discussions,
            actions,
        }
    }

    pub async fn handle(
        &self,
        query: ListActionsQuery,
        metadata: CommandMetadata,
    ) -> Result<Vec<PendingAction>, GovernanceError> {
        let discussion = load_discussion(self.discussions.as_ref(), &query.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;
        discussion.ensure_member(&principal)?;

        Ok(self.actions.find_by_discussion(&query.discussion_id).await?)
    }
}
