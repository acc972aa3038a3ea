/// Card model and database operations
///
/// A card is the unit of work. It lives in exactly one column at a time and
/// is ordered among that column's cards by `position`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     column_id UUID NOT NULL REFERENCES board_columns(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     position INTEGER NOT NULL DEFAULT 0,
///     assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::ordering::{next_position_after, Positioned};

/// Card within a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    /// Unique card ID
    pub id: Uuid,

    /// Column the card currently lives in
    pub column_id: Uuid,

    /// Card title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Display order among sibling cards
    pub position: i32,

    /// Assigned user, if any
    pub assigned_to: Option<Uuid>,

    /// User who created the card
    pub created_by: Option<Uuid>,

    /// When the card was created
    pub created_at: DateTime<Utc>,

    /// When the card last changed
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a card; the position is assigned by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCard {
    /// Target column
    pub column_id: Uuid,

    /// Card title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Creating user
    pub created_by: Uuid,
}

/// Partial card update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCard {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New assignee
    pub assigned_to: Option<Uuid>,
}

impl Positioned for Card {
    fn position(&self) -> i32 {
        self.position
    }

    fn tie_break(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

const CARD_COLUMNS: &str = "id, column_id, title, description, position, assigned_to, created_by, created_at, updated_at";

impl Card {
    /// Inserts a card at the given position
    pub async fn create<'e, E>(executor: E, data: CreateCard, position: i32) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO cards (column_id, title, description, position, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CARD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Card>(&sql)
            .bind(data.column_id)
            .bind(data.title)
            .bind(data.description)
            .bind(position)
            .bind(data.created_by)
            .fetch_one(executor)
            .await
    }

    /// Finds a card by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1");

        sqlx::query_as::<_, Card>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists every card on a board, grouped by nothing, in per-column display order
    pub async fn list_by_board<'e, E>(executor: E, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT c.id, c.column_id, c.title, c.description, c.position,
                   c.assigned_to, c.created_by, c.created_at, c.updated_at
            FROM cards c
            JOIN board_columns col ON col.id = c.column_id
            WHERE col.board_id = $1
            ORDER BY c.column_id, c.position ASC, c.created_at ASC, c.id ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(executor)
        .await
    }

    /// Position after every existing card of the column (0 when empty)
    pub async fn next_position<'e, E>(executor: E, column_id: Uuid) -> Result<i32, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let max = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(position) FROM cards WHERE column_id = $1",
        )
        .bind(column_id)
        .fetch_one(executor)
        .await?;

        Ok(next_position_after(max))
    }

    /// Applies a partial update
    pub async fn update<'e, E>(executor: E, id: Uuid, data: UpdateCard) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            UPDATE cards
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                assigned_to = COALESCE($4, assigned_to),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Card>(&sql)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.assigned_to)
            .fetch_optional(executor)
            .await
    }

    /// Reassigns column and position in one statement
    pub async fn move_to<'e, E>(
        executor: E,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            UPDATE cards
            SET column_id = $2, position = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Card>(&sql)
            .bind(id)
            .bind(column_id)
            .bind(position)
            .fetch_optional(executor)
            .await
    }

    /// Deletes a card
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
