use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::AuthUser;
use crate::AppState;

pub const SESSION_COOKIE: &str = "huddle.session_token";

/// Bearer token first, then the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let row = sqlx::query_as::<_, (String, String)>(
            r#"SELECT u.id, s.expires_at
               FROM "sessions" s
               JOIN "users" u ON u.id = s.user_id
               WHERE s.token = ?"#,
        )
        .bind(&token)
        .fetch_optional(&state.db)
        .await?;

        let (user_id, expires_at) =
            row.ok_or_else(|| AppError::Unauthorized("Invalid session".into()))?;

        let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
            .map(|e| e < chrono::Utc::now())
            .unwrap_or(true);
        if expired {
            return Err(AppError::Unauthorized("Session expired".into()));
        }

        Ok(AuthUser { id: user_id })
    }
}
