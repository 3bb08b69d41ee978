use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use huddle_shared::constants::{MAX_MESSAGE_PAGE_SIZE, MESSAGE_PAGE_SIZE};

use crate::error::AppResult;
use crate::models::{AuthUser, DirectMessage, PaginatedResponse};
use crate::AppState;

use super::fetch_public_user;

#[derive(Deserialize)]
pub struct DirectMessageQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

const PAIR_FILTER: &str =
    "((sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?))";

/// GET /api/dms/:userId/messages
pub async fn list_direct_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(other_user_id): Path<String>,
    Query(query): Query<DirectMessageQuery>,
) -> AppResult<impl IntoResponse> {
    fetch_public_user(&state.db, &other_user_id).await?;
    let limit = query
        .limit
        .unwrap_or(MESSAGE_PAGE_SIZE)
        .clamp(1, MAX_MESSAGE_PAGE_SIZE);

    let items = if let Some(cursor) = &query.cursor {
        let sql = format!(
            "SELECT * FROM direct_messages WHERE {} \
             AND (created_at, rowid) < (SELECT created_at, rowid FROM direct_messages WHERE id = ?) \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
            PAIR_FILTER
        );
        sqlx::query_as::<_, DirectMessage>(&sql)
            .bind(&user.id)
            .bind(&other_user_id)
            .bind(&other_user_id)
            .bind(&user.id)
            .bind(cursor)
            .bind(limit + 1)
            .fetch_all(&state.db)
            .await?
    } else {
        let sql = format!(
            "SELECT * FROM direct_messages WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?",
            PAIR_FILTER
        );
        sqlx::query_as::<_, DirectMessage>(&sql)
            .bind(&user.id)
            .bind(&other_user_id)
            .bind(&other_user_id)
            .bind(&user.id)
            .bind(limit + 1)
            .fetch_all(&state.db)
            .await?
    };

    let has_more = items.len() as i64 > limit;
    let mut items = items;
    if has_more {
        items.pop();
    }
    items.reverse();

    let cursor = items.first().map(|m| m.id.clone());

    Ok(Json(PaginatedResponse {
        items,
        cursor,
        has_more,
    }))
}

/// GET /api/dms/:userId/messages/latest
///
/// An empty conversation is not an error: the body is `{"message": null}`.
pub async fn latest_direct_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(other_user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let sql = format!(
        "SELECT * FROM direct_messages WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT 1",
        PAIR_FILTER
    );
    let message = sqlx::query_as::<_, DirectMessage>(&sql)
        .bind(&user.id)
        .bind(&other_user_id)
        .bind(&other_user_id)
        .bind(&user.id)
        .fetch_optional(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "message": message })))
}

/// POST /api/dms/:userId/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(other_user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let updated = sqlx::query(
        "UPDATE direct_messages SET is_read = 1 WHERE sender_id = ? AND recipient_id = ? AND is_read = 0",
    )
    .bind(&other_user_id)
    .bind(&user.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    tracing::debug!("Marked {} direct messages from {} as read", updated, other_user_id);
    Ok(StatusCode::NO_CONTENT)
}
