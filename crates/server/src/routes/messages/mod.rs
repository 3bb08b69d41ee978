mod edit;
mod reactions;

pub use edit::*;
pub use reactions::*;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use huddle_shared::constants::{MAX_MESSAGE_PAGE_SIZE, MESSAGE_PAGE_SIZE};
use huddle_shared::validation::{validate_message_content, validate_timezone};

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, Message, PaginatedResponse, PostMessageRequest};
use crate::store;
use crate::AppState;

#[derive(Deserialize)]
pub struct MessageQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// Deleted messages keep their row but never their text.
fn redact(mut message: Message) -> Message {
    if message.is_deleted {
        message.content.clear();
    }
    message
}

/// GET /api/channels/:channelId/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query
        .limit
        .unwrap_or(MESSAGE_PAGE_SIZE)
        .clamp(1, MAX_MESSAGE_PAGE_SIZE);

    store::channels::visible_channel(&state.db, &channel_id, &user.id).await?;

    let items = if let Some(cursor) = &query.cursor {
        sqlx::query_as::<_, Message>(
            r#"SELECT * FROM messages
               WHERE channel_id = ?
                 AND (created_at, rowid) < (SELECT created_at, rowid FROM messages WHERE id = ?)
               ORDER BY created_at DESC, rowid DESC LIMIT ?"#,
        )
        .bind(&channel_id)
        .bind(cursor)
        .bind(limit + 1)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE channel_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(&channel_id)
        .bind(limit + 1)
        .fetch_all(&state.db)
        .await?
    };

    let has_more = items.len() as i64 > limit;
    let mut items = items;
    if has_more {
        items.pop();
    }
    items.reverse(); // chronological order

    // Id of the oldest message on the page; ties on created_at fall back to rowid.
    let cursor = items.first().map(|m| m.id.clone());
    let items = items.into_iter().map(redact).collect();

    Ok(Json(PaginatedResponse {
        items,
        cursor,
        has_more,
    }))
}

/// POST /api/channels/:channelId/messages
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(channel_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let content = body
        .content
        .ok_or_else(|| AppError::Validation("Message content is required".into()))?;
    validate_message_content(&content).map_err(AppError::Validation)?;
    if let Some(ref tz) = body.sender_timezone {
        validate_timezone(tz).map_err(AppError::Validation)?;
    }

    store::channels::visible_channel(&state.db, &channel_id, &user.id).await?;

    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        channel_id,
        user_id: user.id.clone(),
        content,
        created_at: chrono::Utc::now().to_rfc3339(),
        edited_at: None,
        is_deleted: false,
        sender_timezone: body.sender_timezone,
    };

    sqlx::query(
        r#"INSERT INTO messages (id, channel_id, user_id, content, created_at, edited_at, is_deleted, sender_timezone)
           VALUES (?, ?, ?, ?, ?, NULL, 0, ?)"#,
    )
    .bind(&message.id)
    .bind(&message.channel_id)
    .bind(&message.user_id)
    .bind(&message.content)
    .bind(&message.created_at)
    .bind(&message.sender_timezone)
    .execute(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
