mod messages;

pub use messages::*;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use huddle_shared::validation::validate_message_content;

use crate::error::{AppError, AppResult};
use crate::models::{
    AuthUser, ConversationResponse, DirectMessage, PublicUser, SendDirectMessageRequest,
};
use crate::AppState;

/// Conversations store the lower id first.
pub(crate) fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

pub(crate) async fn fetch_public_user(
    db: &sqlx::SqlitePool,
    user_id: &str,
) -> AppResult<PublicUser> {
    sqlx::query_as::<_, PublicUser>(
        r#"SELECT id, username, display_name, avatar_url FROM "users" WHERE id = ?"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// GET /api/dms
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let rows = sqlx::query_as::<_, (String, String, Option<String>, Option<String>)>(
        r#"SELECT user1_id, user2_id, last_message_id, last_message_at FROM conversations
           WHERE user1_id = ? OR user2_id = ?
           ORDER BY last_message_at DESC"#,
    )
    .bind(&user.id)
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut result = Vec::with_capacity(rows.len());
    for (user1_id, user2_id, last_message_id, last_message_at) in rows {
        let other_user_id = if user1_id == user.id {
            &user2_id
        } else {
            &user1_id
        };

        let other_user = match fetch_public_user(&state.db, other_user_id).await {
            Ok(u) => u,
            Err(AppError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };

        let unread_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM direct_messages WHERE sender_id = ? AND recipient_id = ? AND is_read = 0",
        )
        .bind(other_user_id)
        .bind(&user.id)
        .fetch_one(&state.db)
        .await?;

        result.push(ConversationResponse {
            other_user,
            last_message_id,
            last_message_at,
            unread_count,
        });
    }

    Ok(Json(result))
}

/// POST /api/dms/:userId/messages
pub async fn send_direct_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(other_user_id): Path<String>,
    Json(body): Json<SendDirectMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let content = body
        .content
        .ok_or_else(|| AppError::Validation("Message content is required".into()))?;
    validate_message_content(&content).map_err(AppError::Validation)?;

    if other_user_id == user.id {
        return Err(AppError::Validation("Cannot send a direct message to yourself".into()));
    }
    fetch_public_user(&state.db, &other_user_id).await?;

    let message = DirectMessage {
        id: uuid::Uuid::new_v4().to_string(),
        sender_id: user.id.clone(),
        recipient_id: other_user_id.clone(),
        content,
        created_at: chrono::Utc::now().to_rfc3339(),
        is_read: false,
    };

    sqlx::query(
        "INSERT INTO direct_messages (id, sender_id, recipient_id, content, created_at, is_read) VALUES (?, ?, ?, ?, ?, 0)",
    )
    .bind(&message.id)
    .bind(&message.sender_id)
    .bind(&message.recipient_id)
    .bind(&message.content)
    .bind(&message.created_at)
    .execute(&state.db)
    .await?;

    // One row per unordered pair; the upsert only moves the last-message pointer.
    let (id1, id2) = ordered_pair(&user.id, &other_user_id);
    if let Err(e) = sqlx::query(
        r#"INSERT INTO conversations (user1_id, user2_id, last_message_id, last_message_at, created_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(user1_id, user2_id) DO UPDATE SET
             last_message_id = excluded.last_message_id,
             last_message_at = excluded.last_message_at"#,
    )
    .bind(id1)
    .bind(id2)
    .bind(&message.id)
    .bind(&message.created_at)
    .bind(&message.created_at)
    .execute(&state.db)
    .await
    {
        tracing::warn!("Direct message {} stored but conversation upsert failed: {}", message.id, e);
    }

    Ok((StatusCode::CREATED, Json(message)))
}
