//! Transactional record store
//!
//! [`BoardStore`] is the persistence seam for the services. Each method is
//! one atomic unit of work: it either fully applies or leaves no trace.
//!
//! Two implementations ship with the crate:
//!
//! - [`postgres::PgBoardStore`]: sqlx over PostgreSQL; multi-row writes run
//!   in a transaction, cascades come from foreign keys
//! - [`memory::MemoryBoardStore`]: a single `tokio::sync::RwLock` over
//!   in-process maps; cascades are applied in code
//!
//! New columns and cards get their position inside the same unit of work
//! as the insert (see [`crate::ordering`]).

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::board::{Board, CreateBoard};
use crate::models::card::{Card, CreateCard, UpdateCard};
use crate::models::column::{Column, CreateColumn, UpdateColumn};
use crate::models::membership::{BoardMember, CreateMembership, MemberView};
use crate::models::user::{CreateUser, User};
use crate::ordering::PositionScope;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBoardStore;
pub use postgres::PgBoardStore;

/// Record store failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A parent row the write depends on does not exist
    #[error("Missing {entity} {id}")]
    MissingParent { entity: &'static str, id: Uuid },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Maps unique violations to [`StoreError::Conflict`], passing everything else through
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        let is_unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());

        if is_unique {
            StoreError::Conflict(what.to_string())
        } else {
            StoreError::Database(err)
        }
    }
}

/// Persistence operations used by the board services
///
/// Lookups return `Ok(None)` (or `false` for deletes) when the row does not
/// exist; errors are reserved for constraint and infrastructure failures.
#[async_trait]
pub trait BoardStore: Send + Sync {
    // Users

    /// Inserts a user; [`StoreError::Conflict`] if the email is taken (case-insensitive)
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    // Boards

    /// Inserts the board and its owner membership as one unit
    async fn create_board(&self, data: CreateBoard) -> StoreResult<(Board, BoardMember)>;

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>>;

    /// Boards the user belongs to, ordered by `(created_at, id)`
    async fn list_boards_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Board>>;

    async fn update_board_title(&self, id: Uuid, title: &str) -> StoreResult<Option<Board>>;

    /// Deletes the board with its members, columns and cards
    async fn delete_board(&self, id: Uuid) -> StoreResult<bool>;

    // Memberships

    async fn find_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BoardMember>>;

    /// Adds a member; [`StoreError::Conflict`] if the pair already exists
    async fn add_member(&self, data: CreateMembership) -> StoreResult<BoardMember>;

    /// Members with display names, ordered by `(invited_at, user_id)`
    async fn list_members(&self, board_id: Uuid) -> StoreResult<Vec<MemberView>>;

    async fn count_members(&self, board_id: Uuid) -> StoreResult<i64>;

    // Columns

    /// Inserts a column after its siblings
    async fn create_column(&self, data: CreateColumn) -> StoreResult<Column>;

    async fn find_column(&self, id: Uuid) -> StoreResult<Option<Column>>;

    /// Columns of a board in display order
    async fn list_columns(&self, board_id: Uuid) -> StoreResult<Vec<Column>>;

    async fn update_column(&self, id: Uuid, data: UpdateColumn) -> StoreResult<Option<Column>>;

    /// Deletes the column with its cards
    async fn delete_column(&self, id: Uuid) -> StoreResult<bool>;

    // Cards

    /// Inserts a card after its siblings
    async fn create_card(&self, data: CreateCard) -> StoreResult<Card>;

    async fn find_card(&self, id: Uuid) -> StoreResult<Option<Card>>;

    /// Every card on a board; within a column, in display order
    async fn list_cards(&self, board_id: Uuid) -> StoreResult<Vec<Card>>;

    async fn update_card(&self, id: Uuid, data: UpdateCard) -> StoreResult<Option<Card>>;

    /// Sets column and position together
    async fn move_card(
        &self,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> StoreResult<Option<Card>>;

    async fn delete_card(&self, id: Uuid) -> StoreResult<bool>;

    // Misc

    /// Position the next sibling created in `scope` would get
    async fn next_position(&self, scope: PositionScope) -> StoreResult<i32>;

    /// Cheap connectivity probe
    async fn health_check(&self) -> StoreResult<()>;
}
