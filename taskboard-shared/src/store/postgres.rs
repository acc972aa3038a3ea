//! PostgreSQL-backed [`BoardStore`]

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{BoardStore, StoreError, StoreResult};
use crate::db::pool;
use crate::models::board::{Board, CreateBoard};
use crate::models::card::{Card, CreateCard, UpdateCard};
use crate::models::column::{Column, CreateColumn, UpdateColumn};
use crate::models::membership::{BoardMember, BoardRole, CreateMembership, MemberView};
use crate::models::user::{CreateUser, User};
use crate::ordering::PositionScope;

/// Store over a sqlx connection pool
#[derive(Debug, Clone)]
pub struct PgBoardStore {
    pool: PgPool,
}

impl PgBoardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for shutdown and migrations
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| StoreError::from_insert(e, "email already registered"))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn create_board(&self, data: CreateBoard) -> StoreResult<(Board, BoardMember)> {
        let mut tx = self.pool.begin().await?;

        let owner_id = data.owner_id;
        let board = Board::create(&mut *tx, data).await?;
        let owner = BoardMember::create(
            &mut *tx,
            CreateMembership {
                board_id: board.id,
                user_id: owner_id,
                role: BoardRole::Owner,
            },
        )
        .await?;

        tx.commit().await?;

        debug!(board_id = %board.id, owner_id = %owner_id, "Board created with owner membership");
        Ok((board, owner))
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(Board::find_by_id(&self.pool, id).await?)
    }

    async fn list_boards_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Board>> {
        Ok(Board::list_by_member(&self.pool, user_id).await?)
    }

    async fn update_board_title(&self, id: Uuid, title: &str) -> StoreResult<Option<Board>> {
        Ok(Board::update_title(&self.pool, id, title).await?)
    }

    async fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Board::delete(&self.pool, id).await?)
    }

    async fn find_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BoardMember>> {
        Ok(BoardMember::find(&self.pool, board_id, user_id).await?)
    }

    async fn add_member(&self, data: CreateMembership) -> StoreResult<BoardMember> {
        BoardMember::create(&self.pool, data)
            .await
            .map_err(|e| StoreError::from_insert(e, "user is already a member of this board"))
    }

    async fn list_members(&self, board_id: Uuid) -> StoreResult<Vec<MemberView>> {
        Ok(BoardMember::list_by_board(&self.pool, board_id).await?)
    }

    async fn count_members(&self, board_id: Uuid) -> StoreResult<i64> {
        Ok(BoardMember::count_by_board(&self.pool, board_id).await?)
    }

    async fn create_column(&self, data: CreateColumn) -> StoreResult<Column> {
        let mut tx = self.pool.begin().await?;

        // Concurrent creates on the same board queue up behind this lock
        if !Board::lock_for_update(&mut *tx, data.board_id).await? {
            return Err(StoreError::MissingParent {
                entity: "board",
                id: data.board_id,
            });
        }

        let position = Column::next_position(&mut *tx, data.board_id).await?;
        let column = Column::create(&mut *tx, data, position).await?;

        tx.commit().await?;
        Ok(column)
    }

    async fn find_column(&self, id: Uuid) -> StoreResult<Option<Column>> {
        Ok(Column::find_by_id(&self.pool, id).await?)
    }

    async fn list_columns(&self, board_id: Uuid) -> StoreResult<Vec<Column>> {
        Ok(Column::list_by_board(&self.pool, board_id).await?)
    }

    async fn update_column(&self, id: Uuid, data: UpdateColumn) -> StoreResult<Option<Column>> {
        Ok(Column::update(&self.pool, id, data).await?)
    }

    async fn delete_column(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Column::delete(&self.pool, id).await?)
    }

    async fn create_card(&self, data: CreateCard) -> StoreResult<Card> {
        let mut tx = self.pool.begin().await?;

        if !Column::lock_for_update(&mut *tx, data.column_id).await? {
            return Err(StoreError::MissingParent {
                entity: "column",
                id: data.column_id,
            });
        }

        let position = Card::next_position(&mut *tx, data.column_id).await?;
        let card = Card::create(&mut *tx, data, position).await?;

        tx.commit().await?;
        Ok(card)
    }

    async fn find_card(&self, id: Uuid) -> StoreResult<Option<Card>> {
        Ok(Card::find_by_id(&self.pool, id).await?)
    }

    async fn list_cards(&self, board_id: Uuid) -> StoreResult<Vec<Card>> {
        Ok(Card::list_by_board(&self.pool, board_id).await?)
    }

    async fn update_card(&self, id: Uuid, data: UpdateCard) -> StoreResult<Option<Card>> {
        Ok(Card::update(&self.pool, id, data).await?)
    }

    async fn move_card(
        &self,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> StoreResult<Option<Card>> {
        Ok(Card::move_to(&self.pool, id, column_id, position).await?)
    }

    async fn delete_card(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Card::delete(&self.pool, id).await?)
    }

    async fn next_position(&self, scope: PositionScope) -> StoreResult<i32> {
        let position = match scope {
            PositionScope::Board(board_id) => Column::next_position(&self.pool, board_id).await?,
            PositionScope::Column(column_id) => Card::next_position(&self.pool, column_id).await?,
        };

        Ok(position)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(pool::health_check(&self.pool).await?)
    }
}
