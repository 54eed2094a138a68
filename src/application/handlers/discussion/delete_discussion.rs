//! DeleteDiscussionHandler - Command handler for tombstoning discussions.

use std::sync::Arc;

use crate::application::handlers::caller::{load_discussion, load_principal};
use crate::domain::foundation::{CommandMetadata, DiscussionId};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory};

#[derive(Debug, Clone)]
pub struct DeleteDiscussionCommand {
    pub discussion_id: DiscussionId,
}

/// Handler for deleting discussions. Rows are kept with a tombstone.
pub struct DeleteDiscussionHandler {
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn DiscussionRepository>,
}

impl DeleteDiscussionHandler {
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
        cmd: DeleteDiscussionCommand,
        metadata: CommandMetadata,
    ) -> Result<(), GovernanceError> {
        let mut discussion = load_discussion(self.repository.as_ref(), &cmd.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        let loaded_status = discussion.status();
        discussion.delete(&principal)?;
        self.repository
            .update(&discussion, loaded_status, &[])
            .await?;

        tracing::info!(
            discussion_id = %cmd.discussion_id,
            user_id = %principal.user_id,
            "Discussion deleted"
        );
        Ok(())
    }
}
