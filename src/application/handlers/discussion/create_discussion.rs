//! CreateDiscussionHandler - Command handler for raising discussions.

use std::sync::Arc;

use crate::application::handlers::caller::load_principal;
use crate::domain::discussion::{Attachment, Discussion};
use crate::domain::foundation::{CommandMetadata, DiscussionId, PartyId};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory};

/// Command to raise a discussion in a party.
#[derive(Debug, Clone)]
pub struct CreateDiscussionCommand {
    pub party_id: PartyId,
    pub subject: String,
    pub content: String,
    pub attachment: Option<Attachment>,
}

/// Result of successful discussion creation.
#[derive(Debug, Clone)]
pub struct CreateDiscussionResult {
    pub discussion: Discussion,
}

/// Handler for creating discussions.
pub struct CreateDiscussionHandler {
    directory: Arc<dyn MembershipDirectory>,
    repository: Arc<dyn DiscussionRepository>,
}

impl CreateDiscussionHandler {
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
        cmd: CreateDiscussionCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateDiscussionResult, GovernanceError> {
        // 1. Authorize - caller must belong to the party
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;
        if !principal.belongs_to(&cmd.party_id) {
            return Err(GovernanceError::forbidden(format!(
                "user {} is not a member of party {}",
                principal.user_id, cmd.party_id
            )));
        }

        // 2. Create (validates subject, content and attachment)
        let discussion = Discussion::new(
            DiscussionId::new(),
            cmd.party_id,
            principal.user_id,
            cmd.subject,
            cmd.content,
            cmd.attachment,
        )?;

        // 3. Persist
        self.repository.save(&discussion).await?;

        tracing::info!(
            discussion_id = %discussion.id(),
            party_id = %cmd.party_id,
            creator_id = %principal.user_id,
            correlation_id = metadata.explicit_correlation_id(),
            "Discussion created"
        );

        Ok(CreateDiscussionResult { discussion })
    }
}
