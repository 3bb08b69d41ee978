use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use huddle_shared::validation::validate_emoji;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, Reaction, ReactionRequest};
use crate::store;
use crate::AppState;

#[derive(Deserialize)]
pub struct ReactionQuery {
    pub ids: Option<String>,
}

/// POST /api/messages/:messageId/reactions
///
/// Adds the reaction, or removes it if the user already reacted with that emoji.
pub async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Json(body): Json<ReactionRequest>,
) -> AppResult<impl IntoResponse> {
    let emoji = body
        .emoji
        .ok_or_else(|| AppError::Validation("Emoji is required".into()))?;
    validate_emoji(&emoji).map_err(AppError::Validation)?;
    let emoji = emoji.trim().to_string();

    let channel_id = sqlx::query_scalar::<_, String>(
        "SELECT channel_id FROM messages WHERE id = ? AND is_deleted = 0",
    )
    .bind(&message_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Message not found".into()))?;

    store::channels::visible_channel(&state.db, &channel_id, &user.id).await?;

    let removed = sqlx::query(
        "DELETE FROM message_reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
    )
    .bind(&message_id)
    .bind(&user.id)
    .bind(&emoji)
    .execute(&state.db)
    .await?
    .rows_affected()
        > 0;

    if !removed {
        sqlx::query(
            "INSERT INTO message_reactions (id, message_id, user_id, emoji, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&message_id)
        .bind(&user.id)
        .bind(&emoji)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&state.db)
        .await?;
    }

    let reactions = sqlx::query_as::<_, Reaction>(
        "SELECT * FROM message_reactions WHERE message_id = ? ORDER BY created_at ASC",
    )
    .bind(&message_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(serde_json::json!({
        "added": !removed,
        "reactions": reactions,
    })))
}

/// GET /api/messages/reactions
pub async fn get_reactions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ReactionQuery>,
) -> AppResult<impl IntoResponse> {
    let ids: Vec<String> = query
        .ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    if ids.is_empty() {
        return Ok(Json(Vec::<Reaction>::new()));
    }

    let placeholders: Vec<String> = ids.iter().map(|_| "?".to_string()).collect();
    let in_clause = placeholders.join(",");
    let sql = format!(
        r#"SELECT r.* FROM message_reactions r
           JOIN messages m ON m.id = r.message_id
           JOIN channels c ON c.id = m.channel_id
           JOIN workspace_members w ON w.workspace_id = c.workspace_id AND w.user_id = ?
           WHERE r.message_id IN ({})
           ORDER BY r.created_at ASC"#,
        in_clause
    );

    let mut query_builder = sqlx::query_as::<_, Reaction>(&sql).bind(&user.id);
    for id in &ids {
        query_builder = query_builder.bind(id);
    }

    let items = query_builder.fetch_all(&state.db).await?;

    Ok(Json(items))
}
