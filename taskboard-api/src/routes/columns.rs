/// Column endpoints (owner or editor)
///
/// - `POST /v1/boards/:board_id/columns`
/// - `PUT /v1/boards/:board_id/columns/:column_id`
/// - `DELETE /v1/boards/:board_id/columns/:column_id`
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
    models::column::{Column, UpdateColumn},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateColumnRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
}

/// Partial update; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateColumnRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,

    pub position: Option<i32>,
}

pub async fn create_column(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    AppJson(req): AppJson<CreateColumnRequest>,
) -> ApiResult<(StatusCode, Json<Column>)> {
    req.validate()?;
    let column = state
        .mutations
        .create_column(board_id, auth.user_id, &req.title)
        .await?;

    Ok((StatusCode::CREATED, Json(column)))
}

pub async fn update_column(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, column_id)): Path<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdateColumnRequest>,
) -> ApiResult<Json<Column>> {
    req.validate()?;
    let changes = UpdateColumn {
        title: req.title,
        position: req.position,
    };

    let column = state
        .mutations
        .update_column(board_id, column_id, auth.user_id, changes)
        .await?;

    Ok(Json(column))
}

pub async fn delete_column(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, column_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .mutations
        .delete_column(board_id, column_id, auth.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
