//! UpdateDiscussionHandler - Command handler for editing discussion content.

use std::sync::Arc;

use crate::application::handlers::caller::{load_discussion, load_principal};
use crate::domain::discussion::{Discussion, DiscussionChanges};
use crate::domain::foundation::{CommandMetadata, DiscussionId};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory};

/// Command to edit a discussion. Unset fields keep their current value.
#[derive(Debug, Clone)]
pub struct UpdateDiscussionCommand {
    pub discussion_id: DiscussionId,
    pub changes: DiscussionChanges,
}

#[derive(Debug, Clone)]
pub struct UpdateDiscussionResult {
    pub discussion: Discussion,
}

/// Handler for editing discussions.
pub struct UpdateDiscussionHandler {
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn DiscussionRepository>,
}

impl UpdateDiscussionHandler {
    pub fn new(
        directory: Arc<dyn MembershipDirectory>,
        repository: Arc<dyn DiscussionRepository>,
    ) -> Self {
        Self {
            directory,
            repository,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateDiscussionCommand,
        metadata: CommandMetadata,
    ) -> Result<UpdateDiscussionResult, GovernanceError> {
        // 1. Load
        let mut discussion = load_discussion(self.repository.as_ref(), &cmd.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        // 2. Edit - creator only, WAITING only
        let loaded_status = discussion.status();
        discussion.update(cmd.changes, &principal)?;

        // 3. Persist, still WAITING at write time
        self.repository
            .update_content(&discussion, loaded_status)
            .await?;

        tracing::info!(
            discussion_id = %cmd.discussion_id,
            user_id = %principal.user_id,
            "Discussion updated"
        );

        Ok(UpdateDiscussionResult { discussion })
    }
}
