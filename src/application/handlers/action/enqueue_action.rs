//! EnqueueActionHandler - Command handler for attaching organizational
//! changes to a discussion.

use std::sync::Arc;

use crate::application::handlers::caller::{load_discussion, load_principal};
use crate::domain::action::{ActionPayload, PendingAction};
use crate::domain::foundation::{CommandMetadata, DiscussionId};
use crate::domain::GovernanceError;
use crate::ports::{DiscussionRepository, MembershipDirectory, PendingActionStore};

#[derive(Debug, Clone)]
pub struct EnqueueActionCommand {
    pub discussion_id: DiscussionId,
    pub payload: ActionPayload,
}

#[derive(Debug, Clone)]
pub struct EnqueueActionResult {
    pub action: PendingAction,
}

/// Handler for queueing pending actions. Actions can only be added while
/// the discussion is still WAITING.
pub struct EnqueueActionHandler {
    directory: Arc<dyn MembershipDirectory>,
    discussions: Arc<dyn DiscussionRepository>,
    actions: Arc<dyn PendingActionStore>,
}

impl EnqueueActionHandler {
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
        cmd: EnqueueActionCommand,
        metadata: CommandMetadata,
    ) -> Result<EnqueueActionResult, GovernanceError> {
        // 1. Load
        let discussion = load_discussion(self.discussions.as_ref(), &cmd.discussion_id).await?;
        let principal = load_principal(self.directory.as_ref(), &metadata).await?;

        // 2. Authorize - party member, discussion still WAITING
        discussion.ensure_member(&principal)?;
        discussion.status().guard_new_action(&cmd.discussion_id)?;

        // 3. Validate and store; the store re-checks WAITING under its lock
        let action = PendingAction::new(cmd.discussion_id, &cmd.payload)?;
        self.actions.save(&action).await?;

        tracing::info!(
            action_id = %action.id(),
            discussion_id = %cmd.discussion_id,
            action_type = %cmd.payload.action_type(),
            "Pending action queued"
        );

        Ok(EnqueueActionResult { action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::{MovesAfterLoad, World};
    use crate::domain::discussion::DiscussionStatus;

    fn handler(world: &World) -> EnqueueActionHandler {
        let store = Arc::new(world.store.clone());
        EnqueueActionHandler::new(store.clone(), store.clone(), store)
    }

    fn rename(world: &World, discussion_id: DiscussionId, new_name: &str) -> EnqueueActionCommand {
        EnqueueActionCommand {
            discussion_id,
            payload: ActionPayload::RenameParty {
                party_id: world.party,
                new_name: new_name.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn member_queues_action_on_waiting_discussion() {
        let world = World::new();
        let discussion = world.discussion_in(DiscussionStatus::Waiting).await;

        let result = handler(&world)
            .handle(
                rename(&world, *discussion.id(), "Makers"),
                world.metadata(world.member),
            )
            .await
            .unwrap();

        assert!(!result.action.is_executed());
        assert_eq!(world.store.actions_of(discussion.id()).len(), 1);
    }

    #[tokio::test]
    async fn queueing_after_voting_started_is_forbidden_and_keeps_earlier_actions() {
        let world = World::new();
        let discussion = world.discussion_in(DiscussionStatus::Waiting).await;
        let handler = handler(&world);
        handler
            .handle(
                rename(&world, *discussion.id(), "Makers"),
                world.metadata(world.member),
            )
            .await
            .unwrap();
        let before = world.store.actions_of(discussion.id());

        let mut voting = discussion.clone();
        voting.advance_to(DiscussionStatus::Voting).unwrap();
        world.store.overwrite_discussion(voting);

        let err = handler
            .handle(
                rename(&world, *discussion.id(), "Shapers"),
                world.metadata(world.member),
            )
            .await
            .unwrap_err();

        assert!(err.is_forbidden());
        assert_eq!(world.store.actions_of(discussion.id()), before);
    }

    #[tokio::test]
    async fn voting_opened_after_load_still_refuses_the_action() {
        let world = World::new();
        let discussion = world.discussion_in(DiscussionStatus::Waiting).await;
        let store = Arc::new(world.store.clone());
        let discussions = Arc::new(MovesAfterLoad {
            store: world.store.clone(),
            then: DiscussionStatus::Voting,
        });

        let err = EnqueueActionHandler::new(store.clone(), discussions, store)
            .handle(
                rename(&world, *discussion.id(), "Makers"),
                world.metadata(world.member),
            )
            .await
            .unwrap_err();

        assert!(err.is_forbidden());
        assert_eq!(world.stored_status(discussion.id()), DiscussionStatus::Voting);
        assert!(world.store.actions_of(discussion.id()).is_empty());
    }

    #[tokio::test]
    async fn blank_new_name_fails_validation() {
        let world = World::new();
        let discussion = world.discussion_in(DiscussionStatus::Waiting).await;

        let err = handler(&world)
            .handle(
                rename(&world, *discussion.id(), " "),
                world.metadata(world.member),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GovernanceError::Validation(_)));
        assert!(world.store.actions_of(discussion.id()).is_empty());
    }

    #[tokio::test]
    async fn outsider_cannot_queue_actions() {
        let world = World::new();
        let discussion = world.discussion_in(DiscussionStatus::Waiting).await;

        let err = handler(&world)
            .handle(
                EnqueueActionCommand {
                    discussion_id: *discussion.id(),
                    payload: ActionPayload::DeleteParty {
                        party_id: world.party,
                    },
                },
                world.metadata(world.outsider),
            )
            .await
            .unwrap_err();

        assert!(err.is_forbidden());
    }
}
