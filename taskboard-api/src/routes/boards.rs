/// Board endpoints
///
/// - `POST /v1/boards` - Create a board (caller becomes owner)
/// - `GET /v1/boards` - Boards the caller belongs to
/// - `GET /v1/boards/:board_id` - Board with columns, cards and members
/// - `PUT /v1/boards/:board_id` - Rename (owner)
/// - `DELETE /v1/boards/:board_id` - Delete with everything on it (owner)
/// - `POST /v1/boards/:board_id/invite` - Add a member by email (owner)
/// - `GET /v1/boards/:board_id/members` - Members with display names

use crate::{app::AppState, error::ApiResult, extract::AppJson};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{
        board::Board,
        membership::{BoardMember, MemberView},
    },
    services::BoardDetail,
};
use uuid::Uuid;
use validator::Validate;

/// Create or rename request
#[derive(Debug, Deserialize, Validate)]
pub struct BoardTitleRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
}

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// `editor` or `viewer`
    #[serde(default = "default_invite_role")]
    pub role: String,
}

fn default_invite_role() -> String {
    "editor".to_string()
}

pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(req): AppJson<BoardTitleRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;
    let board = state.boards.create_board(auth.user_id, &req.title).await?;

    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn list_boards(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Board>>> {
    Ok(Json(state.boards.list_boards(auth.user_id).await?))
}

pub async fn get_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<BoardDetail>> {
    Ok(Json(state.boards.get_board_detail(board_id, auth.user_id).await?))
}

pub async fn update_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    AppJson(req): AppJson<BoardTitleRequest>,
) -> ApiResult<Json<Board>> {
    req.validate()?;
    let board = state
        .boards
        .update_board(board_id, auth.user_id, &req.title)
        .await?;

    Ok(Json(board))
}

pub async fn delete_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.boards.delete_board(board_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Invite a registered user
///
/// # Errors
///
/// - `400 Bad Request`: role other than `editor` or `viewer`
/// - `403 Forbidden`: caller is not the owner
/// - `404 Not Found`: no user with that email
/// - `409 Conflict`: already a member
pub async fn invite_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    AppJson(req): AppJson<InviteRequest>,
) -> ApiResult<(StatusCode, Json<BoardMember>)> {
    req.validate()?;
    let member = state
        .boards
        .invite_member(board_id, auth.user_id, &req.email, &req.role)
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberView>>> {
    Ok(Json(state.boards.list_members(board_id, auth.user_id).await?))
}
