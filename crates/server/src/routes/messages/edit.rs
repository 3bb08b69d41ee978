use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use huddle_shared::messages::is_editable_at;
use huddle_shared::validation::validate_message_content;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, EditMessageRequest, Message};
use crate::AppState;

async fn fetch_message(db: &sqlx::SqlitePool, message_id: &str) -> AppResult<Message> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
        .bind(message_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".into()))
}

/// PATCH /api/messages/:messageId
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let content = body
        .content
        .ok_or_else(|| AppError::Validation("Message content is required".into()))?;
    validate_message_content(&content).map_err(AppError::Validation)?;

    let message = fetch_message(&state.db, &message_id).await?;
    let now = chrono::Utc::now();

    if message.user_id != user.id {
        return Err(AppError::Forbidden("You can only edit your own messages".into()));
    }
    if !is_editable_at(&message.user_id, &user.id, message.is_deleted, &message.created_at, now) {
        return Err(AppError::Forbidden("This message can no longer be edited".into()));
    }

    let edited_at = now.to_rfc3339();
    let result = sqlx::query(
        "UPDATE messages SET content = ?, edited_at = ? WHERE id = ? AND user_id = ? AND is_deleted = 0",
    )
    .bind(&content)
    .bind(&edited_at)
    .bind(&message_id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Forbidden("This message can no longer be edited".into()));
    }

    Ok(Json(Message {
        content,
        edited_at: Some(edited_at),
        ..message
    }))
}

/// DELETE /api/messages/:messageId
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let result = sqlx::query(
        "UPDATE messages SET is_deleted = 1 WHERE id = ? AND user_id = ? AND is_deleted = 0",
    )
    .bind(&message_id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        let message = fetch_message(&state.db, &message_id).await?;
        if message.user_id != user.id {
            return Err(AppError::Forbidden("You can only delete your own messages".into()));
        }
        // Already deleted by its author
    }

    Ok(StatusCode::NO_CONTENT)
}
