//! Board lifecycle and the aggregated board view

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{normalize_title, ServiceError, ServiceResult};
use crate::auth::authorization::{authorize, BoardAction};
use crate::models::board::{Board, CreateBoard};
use crate::models::card::Card;
use crate::models::column::Column;
use crate::models::membership::{BoardMember, BoardRole, CreateMembership, MemberView};
use crate::store::BoardStore;

/// Column with its cards, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWithCards {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub cards: Vec<Card>,
}

/// Everything a client needs to render a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDetail {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub columns: Vec<ColumnWithCards>,
    pub members: Vec<MemberView>,
}

impl BoardDetail {
    fn assemble(board: Board, columns: Vec<Column>, cards: Vec<Card>, members: Vec<MemberView>) -> Self {
        let mut by_column: HashMap<Uuid, Vec<Card>> = HashMap::new();
        for card in cards {
            by_column.entry(card.column_id).or_default().push(card);
        }

        let columns = columns
            .into_iter()
            .map(|column| ColumnWithCards {
                cards: by_column.remove(&column.id).unwrap_or_default(),
                id: column.id,
                title: column.title,
                position: column.position,
            })
            .collect();

        Self {
            id: board.id,
            title: board.title,
            owner_id: board.owner_id,
            created_at: board.created_at,
            updated_at: board.updated_at,
            columns,
            members,
        }
    }
}

/// Board create/rename/delete, invites and reads
#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn BoardStore>,
}

impl BoardService {
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store }
    }

    /// Creates a board owned by `owner_id`
    ///
    /// The board and its owner membership are written as one unit.
    pub async fn create_board(&self, owner_id: Uuid, title: &str) -> ServiceResult<Board> {
        let title = normalize_title(title)?;

        let (board, _owner) = self
            .store
            .create_board(CreateBoard { title, owner_id })
            .await?;

        info!(board_id = %board.id, owner_id = %owner_id, "Board created");
        Ok(board)
    }

    /// Boards the user belongs to, oldest first
    pub async fn list_boards(&self, user_id: Uuid) -> ServiceResult<Vec<Board>> {
        Ok(self.store.list_boards_for_user(user_id).await?)
    }

    /// Board metadata, ordered columns with ordered cards, and members
    pub async fn get_board_detail(&self, board_id: Uuid, user_id: Uuid) -> ServiceResult<BoardDetail> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::ViewBoard).await?;

        let board = self
            .store
            .find_board(board_id)
            .await?
            .ok_or(ServiceError::NotFound("Board"))?;

        let columns = self.store.list_columns(board_id).await?;
        let cards = self.store.list_cards(board_id).await?;
        let members = self.store.list_members(board_id).await?;

        Ok(BoardDetail::assemble(board, columns, cards, members))
    }

    /// Replaces the board title (owner only)
    pub async fn update_board(&self, board_id: Uuid, user_id: Uuid, title: &str) -> ServiceResult<Board> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::RenameBoard).await?;
        let title = normalize_title(title)?;

        let board = self
            .store
            .update_board_title(board_id, &title)
            .await?
            .ok_or(ServiceError::NotFound("Board"))?;

        info!(board_id = %board_id, "Board renamed");
        Ok(board)
    }

    /// Deletes the board with its columns, cards and memberships (owner only)
    pub async fn delete_board(&self, board_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::DeleteBoard).await?;

        if !self.store.delete_board(board_id).await? {
            return Err(ServiceError::NotFound("Board"));
        }

        info!(board_id = %board_id, user_id = %user_id, "Board deleted");
        Ok(())
    }

    /// Adds a user to the board by email (owner only)
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` unless `role` is `editor` or `viewer`
    /// - `NotFound` if no user has that email
    /// - `AlreadyExists` if the user is already a member
    pub async fn invite_member(
        &self,
        board_id: Uuid,
        user_id: Uuid,
        invitee_email: &str,
        role: &str,
    ) -> ServiceResult<BoardMember> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::InviteMember).await?;

        let role = role
            .parse::<BoardRole>()
            .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?;
        if !role.is_invitable() {
            return Err(ServiceError::InvalidArgument(format!(
                "Role must be editor or viewer, got {role}"
            )));
        }

        let invitee = self
            .store
            .find_user_by_email(invitee_email.trim())
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if self.store.find_membership(board_id, invitee.id).await?.is_some() {
            return Err(ServiceError::AlreadyExists(
                "User is already a member of this board".to_string(),
            ));
        }

        let member = self
            .store
            .add_member(CreateMembership {
                board_id,
                user_id: invitee.id,
                role,
            })
            .await?;

        info!(board_id = %board_id, invitee_id = %invitee.id, role = %role, "Member invited");
        Ok(member)
    }

    /// Members with display names
    pub async fn list_members(&self, board_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<MemberView>> {
        authorize(self.store.as_ref(), board_id, user_id, BoardAction::ListMembers).await?;
        Ok(self.store.list_members(board_id).await?)
    }
}
