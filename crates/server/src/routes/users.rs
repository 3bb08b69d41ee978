use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use huddle_shared::validation::{validate_timezone, validate_username};

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, UpdateSettingsRequest, UpdateUserRequest, User, UserSettings};
use crate::AppState;

const THEMES: [&str; 3] = ["system", "light", "dark"];

async fn fetch_user(db: &sqlx::SqlitePool, user_id: &str) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        r#"SELECT id, email, username, display_name, avatar_url, timezone, created_at
           FROM "users" WHERE id = ?"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn fetch_settings(db: &sqlx::SqlitePool, user_id: &str) -> AppResult<UserSettings> {
    let settings = sqlx::query_as::<_, UserSettings>(
        "SELECT theme, notifications_enabled, compact_mode, updated_at FROM user_settings WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    // No row yet means the user never changed anything
    Ok(settings.unwrap_or_else(|| UserSettings {
        theme: "system".into(),
        notifications_enabled: true,
        compact_mode: false,
        updated_at: chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /api/users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(fetch_user(&state.db, &user.id).await?))
}

/// PATCH /api/users/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let current = fetch_user(&state.db, &user.id).await?;

    let username = match body.username {
        Some(ref name) => {
            let name = name.trim();
            validate_username(name).map_err(AppError::Validation)?;

            let taken = sqlx::query_scalar::<_, i64>(
                r#"SELECT COUNT(*) FROM "users" WHERE username = ? AND id != ?"#,
            )
            .bind(name)
            .bind(&user.id)
            .fetch_one(&state.db)
            .await?;
            if taken > 0 {
                return Err(AppError::Validation("Username is already taken".into()));
            }
            name.to_string()
        }
        None => current.username.clone(),
    };

    let display_name = match body.display_name {
        Some(value) => value.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        None => current.display_name.clone(),
    };
    let avatar_url = match body.avatar_url {
        Some(value) => value.filter(|a| !a.is_empty()),
        None => current.avatar_url.clone(),
    };
    let timezone = match body.timezone {
        Some(Some(tz)) => {
            validate_timezone(&tz).map_err(AppError::Validation)?;
            Some(tz)
        }
        Some(None) => None,
        None => current.timezone.clone(),
    };

    sqlx::query(
        r#"UPDATE "users" SET username = ?, display_name = ?, avatar_url = ?, timezone = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&username)
    .bind(&display_name)
    .bind(&avatar_url)
    .bind(&timezone)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    Ok(Json(User {
        username,
        display_name,
        avatar_url,
        timezone,
        ..current
    }))
}

/// GET /api/users/me/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(fetch_settings(&state.db, &user.id).await?))
}

/// PATCH /api/users/me/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateSettingsRequest>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref theme) = body.theme {
        if !THEMES.contains(&theme.as_str()) {
            return Err(AppError::Validation("Invalid theme".into()));
        }
    }

    let current = fetch_settings(&state.db, &user.id).await?;
    let updated = UserSettings {
        theme: body.theme.unwrap_or(current.theme),
        notifications_enabled: body
            .notifications_enabled
            .unwrap_or(current.notifications_enabled),
        compact_mode: body.compact_mode.unwrap_or(current.compact_mode),
        updated_at: chrono::Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"INSERT INTO user_settings (user_id, theme, notifications_enabled, compact_mode, updated_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(user_id) DO UPDATE SET
             theme = excluded.theme,
             notifications_enabled = excluded.notifications_enabled,
             compact_mode = excluded.compact_mode,
             updated_at = excluded.updated_at"#,
    )
    .bind(&user.id)
    .bind(&updated.theme)
    .bind(updated.notifications_enabled)
    .bind(updated.compact_mode)
    .bind(&updated.updated_at)
    .execute(&state.db)
    .await?;

    Ok(Json(updated))
}
