use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, UpdateChannelRequest};
use crate::store::{self, channels::ChannelUpdate};
use crate::AppState;

/// PATCH /api/channels/:channelId
pub async fn update_channel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    Json(body): Json<UpdateChannelRequest>,
) -> AppResult<impl IntoResponse> {
    if body.name.is_none() && body.parent_id.is_none() {
        return Err(AppError::Validation("Nothing to update".into()));
    }

    let channel = store::channels::update_channel(
        &state.db,
        &user,
        &channel_id,
        ChannelUpdate {
            name: body.name,
            parent_id: body.parent_id.map(|p| p.filter(|p| !p.is_empty())),
        },
    )
    .await?;

    Ok(Json(channel))
}

/// DELETE /api/channels/:channelId
pub async fn delete_channel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    store::channels::delete_channel(&state.db, &user, &channel_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
