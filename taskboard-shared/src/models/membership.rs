/// Board membership model and database operations
///
/// A membership joins a user to a board with exactly one role. The owner
/// membership is written together with the board; every other membership
/// comes from an invite.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE board_role AS ENUM ('owner', 'editor', 'viewer');
///
/// CREATE TABLE board_members (
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role board_role NOT NULL,
///     invited_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (board_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: rename, delete and invite, plus everything an editor can do
/// - **editor**: create, update, move and delete columns and cards
/// - **viewer**: read-only access
///
/// Roles are a closed set. Permissions are not derived from a hierarchy;
/// see [`crate::auth::authorization::BoardAction`] for the policy table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role a user holds on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    /// Creator of the board
    Owner,

    /// Can change columns and cards
    Editor,

    /// Read-only access
    Viewer,
}

impl BoardRole {
    /// Converts role to its wire/storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardRole::Owner => "owner",
            BoardRole::Editor => "editor",
            BoardRole::Viewer => "viewer",
        }
    }

    /// Whether an owner may hand this role out through an invite
    ///
    /// There is exactly one owner per board, fixed at creation.
    pub fn is_invitable(&self) -> bool {
        matches!(self, BoardRole::Editor | BoardRole::Viewer)
    }
}

impl fmt::Display for BoardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the three roles
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role '{0}': expected owner, editor or viewer")]
pub struct ParseRoleError(pub String);

impl FromStr for BoardRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(BoardRole::Owner),
            "editor" => Ok(BoardRole::Editor),
            "viewer" => Ok(BoardRole::Viewer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Membership record: (board, user) -> role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardMember {
    /// Board ID
    pub board_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the board
    pub role: BoardRole,

    /// When the membership was created
    pub invited_at: DateTime<Utc>,
}

/// Input for creating a membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Board ID
    pub board_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role to assign
    pub role: BoardRole,
}

/// Member listing entry with the user's display name resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberView {
    /// User ID
    pub user_id: Uuid,

    /// Role within the board
    pub role: BoardRole,

    /// User's display name
    pub display_name: String,
}

impl BoardMember {
    /// Adds a user to a board
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the (board, user) pair already exists.
    pub async fn create<'e, E>(executor: E, data: CreateMembership) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BoardMember>(
            r#"
            INSERT INTO board_members (board_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING board_id, user_id, role, invited_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(executor)
        .await
    }

    /// Finds the membership for a (board, user) pair
    pub async fn find<'e, E>(
        executor: E,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BoardMember>(
            r#"
            SELECT board_id, user_id, role, invited_at
            FROM board_members
            WHERE board_id = $1 AND user_id = $2
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Lists all members of a board with display names, oldest first
    pub async fn list_by_board<'e, E>(
        executor: E,
        board_id: Uuid,
    ) -> Result<Vec<MemberView>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, MemberView>(
            r#"
            SELECT m.user_id, m.role, u.display_name
            FROM board_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.board_id = $1
            ORDER BY m.invited_at ASC, m.user_id ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(executor)
        .await
    }

    /// Counts members of a board
    pub async fn count_by_board<'e, E>(executor: E, board_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM board_members WHERE board_id = $1")
                .bind(board_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }
}
