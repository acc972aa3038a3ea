/// Database models for the board service
///
/// Each model is a `sqlx::FromRow` struct with associated async query
/// functions. Every query function is generic over
/// [`sqlx::postgres::PgExecutor`] so it runs equally against the pool or
/// inside a transaction.
///
/// # Models
///
/// - `user`: accounts and credential hashes
/// - `board`: board workspaces
/// - `membership`: (board, user) -> role
/// - `column`: ordered columns within a board
/// - `card`: ordered cards within a column
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::board::{Board, CreateBoard};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let board = Board::create(&pool, CreateBoard {
///     title: "Team".to_string(),
///     owner_id,
/// }).await?;
///
/// let boards = Board::list_by_member(&pool, owner_id).await?;
/// # let _ = (board, boards);
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod card;
pub mod column;
pub mod membership;
pub mod user;
