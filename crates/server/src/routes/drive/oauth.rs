use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use huddle_shared::constants::APP_NAME;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, GoogleTokenResponse};
use crate::AppState;

use super::token::store_tokens;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn callback_page(title: &str, detail: &str) -> Html<String> {
    Html(format!(
        r#"<html><head><title>{}: Google Drive</title></head>
<body style="background:#1a1a2e;color:#fff;font-family:system-ui;display:flex;align-items:center;justify-content:center;height:100vh;margin:0">
<div style="text-align:center"><h2>{}</h2><p>{}</p><p>You can close this tab.</p></div></body></html>"#,
        APP_NAME,
        escape_html(title),
        escape_html(detail)
    ))
}

/// GET /api/drive/oauth/start
pub async fn oauth_start(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let google = &state.config.google;
    if !google.is_configured() {
        return Err(AppError::Internal("Google Drive integration is not configured".into()));
    }

    let nonce = uuid::Uuid::new_v4().to_string();
    {
        let mut pending = state.drive_auth_pending.write().await;
        pending.retain(|_, uid| uid != &user.id);
        pending.insert(nonce.clone(), user.id.clone());
    }

    let url = url::Url::parse_with_params(
        &google.auth_url,
        &[
            ("client_id", google.client_id.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", DRIVE_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", nonce.as_str()),
        ],
    )
    .map_err(|e| AppError::Internal(format!("Invalid GOOGLE_AUTH_URL: {}", e)))?;

    Ok(Json(serde_json::json!({
        "url": url.to_string(),
        "state": nonce,
    })))
}

#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/drive/oauth/callback
pub async fn oauth_callback(
    Query(query): Query<OAuthCallbackQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if let Some(error) = &query.error {
        return callback_page("Google Drive authorization failed", error);
    }

    let (code, nonce) = match (&query.code, &query.state) {
        (Some(c), Some(s)) => (c.clone(), s.clone()),
        _ => return callback_page("Missing authorization code", "The callback was incomplete."),
    };

    let user_id = {
        let mut pending = state.drive_auth_pending.write().await;
        pending.remove(&nonce)
    };
    let user_id = match user_id {
        Some(uid) => uid,
        None => {
            return callback_page(
                "Auth session expired",
                "Please try linking again from the app.",
            )
        }
    };

    let google = &state.config.google;
    let res = state
        .http
        .post(&google.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
        ])
        .send()
        .await;

    let token_data: GoogleTokenResponse = match res {
        Ok(r) if r.status().is_success() => match r.json().await {
            Ok(t) => t,
            Err(_) => return callback_page("Failed to parse Google response", ""),
        },
        Ok(r) => {
            let status = r.status();
            let body = r.text().await.unwrap_or_default();
            tracing::warn!("Google code exchange failed ({}): {}", status, body);
            return callback_page("Google token exchange failed", &status.to_string());
        }
        Err(e) => {
            tracing::warn!("Google code exchange network error: {}", e);
            return callback_page("Network error", "Could not reach Google.");
        }
    };

    if let Err(e) = store_tokens(&state.db, &user_id, &token_data).await {
        tracing::error!("Failed to store Drive tokens for {}: {}", user_id, e);
        return callback_page("Could not save the integration", "Please try again.");
    }

    tracing::info!("Google Drive linked for user {}", user_id);
    callback_page("Google Drive linked", "Your Drive files are now available.")
}
