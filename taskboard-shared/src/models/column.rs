/// Column model and database operations
///
/// Columns belong to one board and carry an integer `position` that orders
/// them among their siblings. Positions may have gaps or duplicates; reads
/// order by `(position, created_at, id)`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE board_columns (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::ordering::{next_position_after, Positioned};

/// Column within a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Column {
    /// Unique column ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Column title
    pub title: String,

    /// Display order among sibling columns
    pub position: i32,

    /// When the column was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a column; the position is assigned by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateColumn {
    /// Owning board
    pub board_id: Uuid,

    /// Column title
    pub title: String,
}

/// Partial column update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateColumn {
    /// New title
    pub title: Option<String>,

    /// New position, stored verbatim
    pub position: Option<i32>,
}

impl Positioned for Column {
    fn position(&self) -> i32 {
        self.position
    }

    fn tie_break(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

impl Column {
    /// Inserts a column at the given position
    pub async fn create<'e, E>(
        executor: E,
        data: CreateColumn,
        position: i32,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Column>(
            r#"
            INSERT INTO board_columns (board_id, title, position)
            VALUES ($1, $2, $3)
            RETURNING id, board_id, title, position, created_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.title)
        .bind(position)
        .fetch_one(executor)
        .await
    }

    /// Finds a column by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Column>(
            r#"
            SELECT id, board_id, title, position, created_at
            FROM board_columns
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Locks the column row until the surrounding transaction ends
    ///
    /// Serializes position assignment for new cards in this column.
    pub async fn lock_for_update<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM board_columns WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(row.is_some())
    }

    /// Lists a board's columns in display order
    pub async fn list_by_board<'e, E>(executor: E, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Column>(
            r#"
            SELECT id, board_id, title, position, created_at
            FROM board_columns
            WHERE board_id = $1
            ORDER BY position ASC, created_at ASC, id ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(executor)
        .await
    }

    /// Position after every existing column of the board (0 when empty)
    pub async fn next_position<'e, E>(executor: E, board_id: Uuid) -> Result<i32, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let max = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(position) FROM board_columns WHERE board_id = $1",
        )
        .bind(board_id)
        .fetch_one(executor)
        .await?;

        Ok(next_position_after(max))
    }

    /// Applies a partial update
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateColumn,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Column>(
            r#"
            UPDATE board_columns
            SET title = COALESCE($2, title),
                position = COALESCE($3, position)
            WHERE id = $1
            RETURNING id, board_id, title, position, created_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.position)
        .fetch_optional(executor)
        .await
    }

    /// Deletes a column; cards cascade
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM board_columns WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
