mod update;

pub use update::*;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use huddle_shared::hierarchy::build_hierarchy;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, CreateChannelRequest};
use crate::store::{self, channels::NewChannel};
use crate::AppState;

async fn require_workspace_member(
    state: &AppState,
    workspace_id: &str,
    user: &AuthUser,
) -> AppResult<()> {
    if store::is_workspace_member(&state.db, workspace_id, &user.id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not a member of this workspace".into()))
    }
}

/// GET /api/workspaces/:workspaceId/channels
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(workspace_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_workspace_member(&state, &workspace_id, &user).await?;
    let channels = store::channels::list_channels(&state.db, &workspace_id, &user.id).await?;
    Ok(Json(channels))
}

/// GET /api/workspaces/:workspaceId/channels/tree
pub async fn channel_tree(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(workspace_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_workspace_member(&state, &workspace_id, &user).await?;
    let channels = store::channels::list_channels(&state.db, &workspace_id, &user.id).await?;
    Ok(Json(build_hierarchy(channels)))
}

/// POST /api/channels
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateChannelRequest>,
) -> AppResult<impl IntoResponse> {
    let workspace_id = body
        .workspace_id
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| AppError::Validation("workspaceId is required".into()))?;
    let name = body
        .name
        .ok_or_else(|| AppError::Validation("Channel name is required".into()))?;

    let channel = store::channels::create_channel(
        &state.db,
        &user,
        NewChannel {
            workspace_id,
            name,
            description: body.description,
            parent_id: body.parent_id.filter(|p| !p.is_empty()),
            is_private: body.is_private,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(channel)))
}
