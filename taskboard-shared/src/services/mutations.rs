//! Column and card mutations
//!
//! Each operation authorizes, checks that the columns and cards it touches
//! belong to the board named in the call, writes through the store and
//! then broadcasts one [`BoardEvent`] to the board's live connections.
//! Broadcast results are never reported back to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{normalize_title, ServiceError, ServiceResult};
use crate::auth::authorization::{authorize, BoardAction};
use crate::events::{BoardEvent, ColumnSummary};
use crate::live::Broadcaster;
use crate::models::card::{Card, CreateCard, UpdateCard};
use crate::models::column::{Column, CreateColumn, UpdateColumn};
use crate::store::BoardStore;

/// Input for [`MutationService::create_card`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Create/update/move/delete for columns and cards
#[derive(Clone)]
pub struct MutationService {
    store: Arc<dyn BoardStore>,
    broadcaster: Broadcaster,
}

impl MutationService {
    pub fn new(store: Arc<dyn BoardStore>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    async fn publish(&self, board_id: Uuid, event: BoardEvent) {
        let delivered = self.broadcaster.broadcast(board_id, &event, None).await;
        debug!(board_id = %board_id, kind = event.kind(), delivered, "Mutation published");
    }

    /// Loads a column and checks it belongs to `board_id`
    async fn column_in_board(&self, board_id: Uuid, column_id: Uuid) -> ServiceResult<Column> {
        self.store
            .find_column(column_id)
            .await?
            .filter(|column| column.board_id == board_id)
            .ok_or(ServiceError::NotFound("Column"))
    }

    /// Loads a card and checks its column belongs to `board_id`
    async fn card_in_board(&self, board_id: Uuid, card_id: Uuid) -> ServiceResult<Card> {
        let card = self
            .store
            .find_card(card_id)
            .await?
            .ok_or(ServiceError::NotFound("Card"))?;

        match self.store.find_column(card.column_id).await? {
            Some(column) if column.board_id == board_id => Ok(card),
            _ => Err(ServiceError::NotFound("Card")),
        }
    }

    /// Appends a column after the board's existing columns
    pub async fn create_column(&self, board_id: Uuid, user_id: Uuid, title: &str) -> ServiceResult<Column> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::CreateColumn).await?;
        let title = normalize_title(title)?;

        let column = self.store.create_column(CreateColumn { board_id, title }).await?;

        info!(board_id = %board_id, column_id = %column.id, position = column.position, "Column created");
        self.publish(board_id, BoardEvent::ColumnCreated(ColumnSummary::from(&column)))
            .await;
        Ok(column)
    }

    /// Partial column update; `position` is stored as given
    pub async fn update_column(
        &self,
        board_id: Uuid,
        column_id: Uuid,
        user_id: Uuid,
        mut changes: UpdateColumn,
    ) -> ServiceResult<Column> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::UpdateColumn).await?;
        self.column_in_board(board_id, column_id).await?;

        changes.title = changes.title.as_deref().map(normalize_title).transpose()?;

        let column = self
            .store
            .update_column(column_id, changes)
            .await?
            .ok_or(ServiceError::NotFound("Column"))?;

        info!(board_id = %board_id, column_id = %column_id, "Column updated");
        self.publish(board_id, BoardEvent::ColumnUpdated(ColumnSummary::from(&column)))
            .await;
        Ok(column)
    }

    /// Deletes a column and its cards
    pub async fn delete_column(&self, board_id: Uuid, column_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::DeleteColumn).await?;
        self.column_in_board(board_id, column_id).await?;

        if !self.store.delete_column(column_id).await? {
            return Err(ServiceError::NotFound("Column"));
        }

        info!(board_id = %board_id, column_id = %column_id, "Column deleted");
        self.publish(board_id, BoardEvent::ColumnDeleted { column_id }).await;
        Ok(())
    }

    /// Appends a card to the bottom of a column, created by `user_id`
    pub async fn create_card(&self, board_id: Uuid, user_id: Uuid, card: NewCard) -> ServiceResult<Card> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::CreateCard).await?;
        self.column_in_board(board_id, card.column_id).await?;
        let title = normalize_title(&card.title)?;

        let card = self
            .store
            .create_card(CreateCard {
                column_id: card.column_id,
                title,
                description: card.description,
                created_by: user_id,
            })
            .await?;

        info!(
            board_id = %board_id,
            card_id = %card.id,
            column_id = %card.column_id,
            position = card.position,
            "Card created"
        );
        self.publish(board_id, BoardEvent::CardCreated(card.clone())).await;
        Ok(card)
    }

    /// Partial card update
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `assigned_to` names a user who is not a member
    /// of the board.
    pub async fn update_card(
        &self,
        board_id: Uuid,
        card_id: Uuid,
        user_id: Uuid,
        mut changes: UpdateCard,
    ) -> ServiceResult<Card> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::UpdateCard).await?;
        self.card_in_board(board_id, card_id).await?;

        changes.title = changes.title.as_deref().map(normalize_title).transpose()?;

        if let Some(assignee) = changes.assigned_to {
            if self.store.find_membership(board_id, assignee).await?.is_none() {
                return Err(ServiceError::InvalidArgument(
                    "Assignee must be a member of the board".to_string(),
                ));
            }
        }

        let card = self
            .store
            .update_card(card_id, changes)
            .await?
            .ok_or(ServiceError::NotFound("Card"))?;

        info!(board_id = %board_id, card_id = %card_id, "Card updated");
        self.publish(board_id, BoardEvent::CardUpdated(card.clone())).await;
        Ok(card)
    }

    /// Moves a card to `target_column_id` at `position`
    ///
    /// The position is taken verbatim. Other cards in the source and
    /// target columns keep their positions.
    pub async fn move_card(
        &self,
        board_id: Uuid,
        card_id: Uuid,
        user_id: Uuid,
        target_column_id: Uuid,
        position: i32,
    ) -> ServiceResult<Card> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::MoveCard).await?;
        let current = self.card_in_board(board_id, card_id).await?;
        self.column_in_board(board_id, target_column_id).await?;

        let card = self
            .store
            .move_card(card_id, target_column_id, position)
            .await?
            .ok_or(ServiceError::NotFound("Card"))?;

        info!(
            board_id = %board_id,
            card_id = %card_id,
            from_column = %current.column_id,
            to_column = %target_column_id,
            position,
            "Card moved"
        );
        self.publish(
            board_id,
            BoardEvent::CardMoved {
                card_id,
                from_column: current.column_id,
                to_column: target_column_id,
                position: card.position,
            },
        )
        .await;
        Ok(card)
    }

    pub async fn delete_card(&self, board_id: Uuid, card_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::DeleteCard).await?;
        self.card_in_board(board_id, card_id).await?;

        if !self.store.delete_card(card_id).await? {
            return Err(ServiceError::NotFound("Card"));
        }

        info!(board_id = %board_id, card_id = %card_id, "Card deleted");
        self.publish(board_id, BoardEvent::CardDeleted { card_id }).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::board::CreateBoard;
    use crate::models::membership::{BoardRole, CreateMembership};
    use crate::models::user::{CreateUser, User};
    use crate::store::MemoryBoardStore;

    struct Fixture {
        store: Arc<MemoryBoardStore>,
        broadcaster: Broadcaster,
        service: MutationService,
        owner: User,
        editor: User,
        viewer: User,
        board_id: Uuid,
    }

    async fn user(store: &MemoryBoardStore, name: &str) -> User {
        store
            .create_user(CreateUser {
                email: format!("{name}@example.com"),
                display_name: name.to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryBoardStore::new());
        let owner = user(&store, "owner").await;
        let editor = user(&store, "editor").await;
        let viewer = user(&store, "viewer").await;

        let (board, _) = store
            .create_board(CreateBoard {
                title: "Team".to_string(),
                owner_id: owner.id,
            })
            .await
            .unwrap();
        for (member, role) in [(&editor, BoardRole::Editor), (&viewer, BoardRole::Viewer)] {
            store
                .add_member(CreateMembership {
                    board_id: board.id,
                    user_id: member.id,
                    role,
                })
                .await
                .unwrap();
        }

        let broadcaster = Broadcaster::new(16);
        Fixture {
            service: MutationService::new(store.clone(), broadcaster.clone()),
            store,
            broadcaster,
            owner,
            editor,
            viewer,
            board_id: board.id,
        }
    }

    fn new_card(column_id: Uuid, title: &str) -> NewCard {
        NewCard {
            column_id,
            title: title.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_positions_follow_creation_order() {
        let f = fixture().await;
        let backlog = f.service.create_column(f.board_id, f.owner.id, "Backlog").await.unwrap();
        let doing = f.service.create_column(f.board_id, f.editor.id, "Doing").await.unwrap();
        assert_eq!((backlog.position, doing.position), (0, 1));

        let first = f.service.create_card(f.board_id, f.owner.id, new_card(backlog.id, "Task 1")).await.unwrap();
        let second = f.service.create_card(f.board_id, f.owner.id, new_card(backlog.id, "Task 2")).await.unwrap();
        assert_eq!((first.position, second.position), (0, 1));
        assert_eq!(first.created_by, Some(f.owner.id));

        let other = f.service.create_card(f.board_id, f.owner.id, new_card(doing.id, "Other")).await.unwrap();
        assert_eq!(other.position, 0);
    }

    #[tokio::test]
    async fn test_viewer_cannot_mutate() {
        let f = fixture().await;
        let column = f.service.create_column(f.board_id, f.owner.id, "Todo").await.unwrap();
        let card = f.service.create_card(f.board_id, f.owner.id, new_card(column.id, "Card")).await.unwrap();
        let v = f.viewer.id;

        let results = [
            f.service.create_column(f.board_id, v, "Nope").await.map(|_| ()),
            f.service
                .update_column(f.board_id, column.id, v, UpdateColumn { title: Some("x".into()), position: None })
                .await
                .map(|_| ()),
            f.service.delete_column(f.board_id, column.id, v).await,
            f.service.create_card(f.board_id, v, new_card(column.id, "Nope")).await.map(|_| ()),
            f.service.update_card(f.board_id, card.id, v, UpdateCard::default()).await.map(|_| ()),
            f.service.move_card(f.board_id, card.id, v, column.id, 5).await.map(|_| ()),
            f.service.delete_card(f.board_id, card.id, v).await,
        ];

        for result in results {
            assert!(matches!(
                result,
                Err(ServiceError::InsufficientRole { actual: BoardRole::Viewer, .. })
            ));
        }
        assert_eq!(f.store.list_columns(f.board_id).await.unwrap().len(), 1);
        assert_eq!(f.store.find_card(card.id).await.unwrap().unwrap().position, 0);
    }

    #[tokio::test]
    async fn test_non_member_is_distinct_from_viewer() {
        let f = fixture().await;
        let stranger = user(&f.store, "stranger").await;

        assert!(matches!(
            f.service.create_column(f.board_id, stranger.id, "Todo").await,
            Err(ServiceError::NotAMember(id)) if id == f.board_id
        ));
    }

    #[tokio::test]
    async fn test_move_card_leaves_siblings_untouched() {
        let f = fixture().await;
        let a = f.service.create_column(f.board_id, f.owner.id, "A").await.unwrap();
        let b = f.service.create_column(f.board_id, f.owner.id, "B").await.unwrap();
        let mut in_a = Vec::new();
        for title in ["a0", "a1", "a2"] {
            in_a.push(f.service.create_card(f.board_id, f.owner.id, new_card(a.id, title)).await.unwrap());
        }
        let b0 = f.service.create_card(f.board_id, f.owner.id, new_card(b.id, "b0")).await.unwrap();

        let moved = f
            .service
            .move_card(f.board_id, in_a[1].id, f.editor.id, b.id, 0)
            .await
            .unwrap();
        assert_eq!((moved.column_id, moved.position), (b.id, 0));

        let after = f.store.list_cards(f.board_id).await.unwrap();
        let position_of = |id: Uuid| after.iter().find(|c| c.id == id).unwrap().position;
        assert_eq!(position_of(in_a[0].id), 0);
        assert_eq!(position_of(in_a[2].id), 2);
        assert_eq!(position_of(b0.id), 0);
    }

    #[tokio::test]
    async fn test_move_card_accepts_out_of_range_position() {
        let f = fixture().await;
        let a = f.service.create_column(f.board_id, f.owner.id, "A").await.unwrap();
        let card = f.service.create_card(f.board_id, f.owner.id, new_card(a.id, "c")).await.unwrap();

        let moved = f.service.move_card(f.board_id, card.id, f.owner.id, a.id, 42).await.unwrap();
        assert_eq!(moved.position, 42);
    }

    #[tokio::test]
    async fn test_foreign_column_and_card_are_not_found() {
        let f = fixture().await;
        let (other_board, _) = f
            .store
            .create_board(CreateBoard {
                title: "Other".to_string(),
                owner_id: f.owner.id,
            })
            .await
            .unwrap();
        let foreign_column = f
            .service
            .create_column(other_board.id, f.owner.id, "Elsewhere")
            .await
            .unwrap();
        let foreign_card = f
            .service
            .create_card(other_board.id, f.owner.id, new_card(foreign_column.id, "x"))
            .await
            .unwrap();
        let local = f.service.create_column(f.board_id, f.owner.id, "Here").await.unwrap();

        assert!(matches!(
            f.service.create_card(f.board_id, f.owner.id, new_card(foreign_column.id, "x")).await,
            Err(ServiceError::NotFound("Column"))
        ));
        assert!(matches!(
            f.service.move_card(f.board_id, foreign_card.id, f.owner.id, local.id, 0).await,
            Err(ServiceError::NotFound("Card"))
        ));
        assert!(matches!(
            f.service.delete_column(f.board_id, foreign_column.id, f.owner.id).await,
            Err(ServiceError::NotFound("Column"))
        ));
        assert!(f.store.find_column(foreign_column.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_card_requires_member_assignee() {
        let f = fixture().await;
        let column = f.service.create_column(f.board_id, f.owner.id, "Todo").await.unwrap();
        let card = f.service.create_card(f.board_id, f.owner.id, new_card(column.id, "Card")).await.unwrap();
        let stranger = user(&f.store, "stranger").await;

        let err = f
            .service
            .update_card(
                f.board_id,
                card.id,
                f.owner.id,
                UpdateCard {
                    assigned_to: Some(stranger.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let updated = f
            .service
            .update_card(
                f.board_id,
                card.id,
                f.editor.id,
                UpdateCard {
                    description: Some("details".to_string()),
                    assigned_to: Some(f.viewer.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Card");
        assert_eq!(updated.description.as_deref(), Some("details"));
        assert_eq!(updated.assigned_to, Some(f.viewer.id));
    }

    #[tokio::test]
    async fn test_mutations_broadcast_to_board() {
        let f = fixture().await;
        let mut live = f.broadcaster.register(f.board_id).await;
        let mut elsewhere = f.broadcaster.register(Uuid::new_v4()).await;

        let a = f.service.create_column(f.board_id, f.owner.id, "A").await.unwrap();
        let b = f.service.create_column(f.board_id, f.owner.id, "B").await.unwrap();
        let card = f.service.create_card(f.board_id, f.owner.id, new_card(a.id, "c")).await.unwrap();
        f.service.move_card(f.board_id, card.id, f.editor.id, b.id, 3).await.unwrap();
        f.service.delete_card(f.board_id, card.id, f.owner.id).await.unwrap();

        let mut kinds = Vec::new();
        let mut moved = None;
        while let Ok(event) = live.receiver.try_recv() {
            kinds.push(event.kind());
            if let BoardEvent::CardMoved { .. } = event {
                moved = Some(event);
            }
        }
        assert_eq!(
            kinds,
            vec!["column_created", "column_created", "card_created", "card_moved", "card_deleted"]
        );
        assert_eq!(
            moved,
            Some(BoardEvent::CardMoved {
                card_id: card.id,
                from_column: a.id,
                to_column: b.id,
                position: 3,
            })
        );
        assert!(elsewhere.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_mutation_broadcasts_nothing() {
        let f = fixture().await;
        let mut live = f.broadcaster.register(f.board_id).await;

        let _ = f.service.create_column(f.board_id, f.viewer.id, "Nope").await;

        assert!(live.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_connection_does_not_fail_mutation() {
        let f = fixture().await;
        let gone = f.broadcaster.register(f.board_id).await;
        drop(gone);

        f.service.create_column(f.board_id, f.owner.id, "Todo").await.unwrap();
        assert_eq!(f.broadcaster.connection_count(f.board_id).await, 0);
    }
}
