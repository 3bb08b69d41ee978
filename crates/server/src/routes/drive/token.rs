use chrono::{DateTime, Duration, Utc};

use huddle_shared::constants::{GOOGLE_DRIVE_PROVIDER, TOKEN_REFRESH_SKEW_SECS};

use crate::error::{AppError, AppResult};
use crate::models::GoogleTokenResponse;
use crate::AppState;

/// Missing or unparsable expiry counts as expired, and so does anything
/// within the refresh skew of `now`.
pub fn is_token_expired(expires_at: Option<&str>, now: DateTime<Utc>) -> bool {
    match expires_at.filter(|e| !e.is_empty()) {
        Some(e) => DateTime::parse_from_rfc3339(e)
            .map(|e| now > e - Duration::seconds(TOKEN_REFRESH_SKEW_SECS))
            .unwrap_or(true),
        None => true,
    }
}

/// Access token for the user's Drive integration, refreshed first if it has expired.
pub async fn get_valid_token(state: &AppState, user_id: &str) -> AppResult<String> {
    let (token, expires_at) = sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT access_token, expires_at FROM user_integrations WHERE user_id = ? AND provider = ?",
    )
    .bind(user_id)
    .bind(GOOGLE_DRIVE_PROVIDER)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Google Drive not linked".into()))?;

    if is_token_expired(expires_at.as_deref(), Utc::now()) {
        refresh_user_token(state, user_id).await
    } else {
        Ok(token)
    }
}

async fn refresh_user_token(state: &AppState, user_id: &str) -> AppResult<String> {
    let refresh_token = sqlx::query_scalar::<_, Option<String>>(
        "SELECT refresh_token FROM user_integrations WHERE user_id = ? AND provider = ?",
    )
    .bind(user_id)
    .bind(GOOGLE_DRIVE_PROVIDER)
    .fetch_optional(&state.db)
    .await?
    .flatten()
    .ok_or_else(|| AppError::Upstream("Google Drive token expired and no refresh token is stored".into()))?;

    let google = &state.config.google;
    let res = state
        .http
        .post(&google.token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Network error: {}", e)))?;

    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        tracing::error!("Google token refresh failed ({}): {}", status, body);
        return Err(AppError::Upstream(format!("Token refresh failed ({})", status)));
    }

    let token_data: GoogleTokenResponse = res
        .json()
        .await
        .map_err(|_| AppError::Upstream("Failed to parse token response".into()))?;

    store_tokens(&state.db, user_id, &token_data).await?;
    tracing::info!("Refreshed Google Drive token for user {}", user_id);

    Ok(token_data.access_token)
}

/// Insert or update the integration row. A response without a refresh token
/// keeps the one already stored.
pub async fn store_tokens(
    db: &sqlx::SqlitePool,
    user_id: &str,
    token_data: &GoogleTokenResponse,
) -> AppResult<()> {
    let expires_at = Utc::now() + Duration::seconds(token_data.expires_in);
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO user_integrations
           (user_id, provider, access_token, refresh_token, expires_at, scope, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(user_id, provider) DO UPDATE SET
             access_token = excluded.access_token,
             refresh_token = COALESCE(excluded.refresh_token, user_integrations.refresh_token),
             expires_at = excluded.expires_at,
             scope = CASE WHEN excluded.scope = '' THEN user_integrations.scope ELSE excluded.scope END,
             updated_at = excluded.updated_at"#,
    )
    .bind(user_id)
    .bind(GOOGLE_DRIVE_PROVIDER)
    .bind(&token_data.access_token)
    .bind(&token_data.refresh_token)
    .bind(expires_at.to_rfc3339())
    .bind(&token_data.scope)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(())
}
