/// Card endpoints (owner or editor)
///
/// - `POST /v1/boards/:board_id/cards`
/// - `PUT /v1/boards/:board_id/cards/:card_id`
/// - `PUT /v1/boards/:board_id/cards/:card_id/move`
/// - `DELETE /v1/boards/:board_id/cards/:card_id`
///
/// Each successful call is broadcast to the board's live connections.

use crate::{app::AppState, error::ApiResult, extract::AppJson};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::card::{Card, UpdateCard},
    services::NewCard,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    pub column_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,
}

/// Partial update; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCardRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// Must be a member of the board
    pub assigned_to: Option<Uuid>,
}

/// Target column and position, taken as given
#[derive(Debug, Deserialize)]
pub struct MoveCardRequest {
    pub column_id: Uuid,
    pub position: i32,
}

pub async fn create_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    AppJson(req): AppJson<CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    req.validate()?;
    let card = state
        .mutations
        .create_card(
            board_id,
            auth.user_id,
            NewCard {
                column_id: req.column_id,
                title: req.title,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, card_id)): Path<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdateCardRequest>,
) -> ApiResult<Json<Card>> {
    req.validate()?;
    let changes = UpdateCard {
        title: req.title,
        description: req.description,
        assigned_to: req.assigned_to,
    };

    let card = state
        .mutations
        .update_card(board_id, card_id, auth.user_id, changes)
        .await?;

    Ok(Json(card))
}

pub async fn move_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, card_id)): Path<(Uuid, Uuid)>,
    AppJson(req): AppJson<MoveCardRequest>,
) -> ApiResult<Json<Card>> {
    let card = state
        .mutations
        .move_card(board_id, card_id, auth.user_id, req.column_id, req.position)
        .await?;

    Ok(Json(card))
}

pub async fn delete_card(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, card_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .mutations
        .delete_card(board_id, card_id, auth.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
