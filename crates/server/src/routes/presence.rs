use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{AuthUser, UserPresence};
use crate::AppState;

async fn set_presence(db: &sqlx::SqlitePool, user_id: &str, online: bool) -> AppResult<()> {
    sqlx::query(
        r#"INSERT INTO user_presence (user_id, is_online, last_seen) VALUES (?, ?, ?)
           ON CONFLICT(user_id) DO UPDATE SET
             is_online = excluded.is_online,
             last_seen = excluded.last_seen"#,
    )
    .bind(user_id)
    .bind(online)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(db)
    .await?;
    Ok(())
}

/// POST /api/presence/heartbeat
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    set_presence(&state.db, &user.id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/presence/offline
pub async fn go_offline(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    set_presence(&state.db, &user.id, false).await?;
    tracing::debug!("User {} went offline", user.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/presence
///
/// Users that stopped sending heartbeats without going offline are reported
/// offline once `last_seen` is older than three heartbeat intervals.
pub async fn list_presence(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let stale_after = chrono::Duration::milliseconds(
        3 * huddle_shared::constants::PRESENCE_HEARTBEAT_INTERVAL_MS as i64,
    );
    let now = chrono::Utc::now();

    let items: Vec<UserPresence> = sqlx::query_as::<_, UserPresence>(
        "SELECT user_id, is_online, last_seen FROM user_presence ORDER BY last_seen DESC",
    )
    .fetch_all(&state.db)
    .await?
    .into_iter()
    .map(|mut p| {
        let fresh = chrono::DateTime::parse_from_rfc3339(&p.last_seen)
            .map(|seen| now - seen.with_timezone(&chrono::Utc) < stale_after)
            .unwrap_or(false);
        p.is_online = p.is_online && fresh;
        p
    })
    .collect();

    Ok(Json(items))
}
