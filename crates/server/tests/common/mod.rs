#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use huddle_server::{
    config::{Config, GoogleConfig},
    db, routes, AppState,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    // A single connection, since every new `:memory:` connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    db::apply_schema(&pool).await.expect("Failed to apply schema");
    pool
}

pub fn test_config(google_base: &str) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        max_upload_bytes: 1_048_576,
        google: GoogleConfig {
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            redirect_uri: "http://127.0.0.1/api/drive/oauth/callback".into(),
            auth_url: format!("{}/auth", google_base),
            token_url: format!("{}/token", google_base),
            drive_api_url: format!("{}/drive/v3", google_base),
            drive_upload_url: format!("{}/upload/drive/v3", google_base),
        },
    }
}

/// Build a test Axum app with the given pool. Google endpoints point nowhere.
pub fn create_test_app(pool: SqlitePool) -> Router {
    create_test_app_with_google(pool, "http://127.0.0.1:9")
}

pub fn create_test_app_with_google(pool: SqlitePool, google_base: &str) -> Router {
    let state = Arc::new(AppState::new(pool, test_config(google_base)));
    routes::build_router(state)
}

pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token).parse().unwrap(),
    )
}

/// Create a test user directly in the database. Returns (user_id, session_token).
pub async fn create_test_user(pool: &SqlitePool, email: &str, username: &str) -> (String, String) {
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO "users" (id, email, username, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(&user_id)
    .bind(email)
    .bind(username)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    let session_token = uuid::Uuid::new_v4().to_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339();

    sqlx::query(
        r#"INSERT INTO "sessions" (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&session_token)
    .bind(&user_id)
    .bind(&expires_at)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    (user_id, session_token)
}

/// Create a workspace with `owner_id` as its first member.
pub async fn create_workspace(pool: &SqlitePool, owner_id: &str, name: &str) -> String {
    let workspace_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO workspaces (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(&workspace_id)
        .bind(name)
        .bind(owner_id)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

    add_workspace_member(pool, &workspace_id, owner_id, "owner").await;
    workspace_id
}

pub async fn add_workspace_member(pool: &SqlitePool, workspace_id: &str, user_id: &str, role: &str) {
    sqlx::query(
        "INSERT INTO workspace_members (workspace_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(workspace_id)
    .bind(user_id)
    .bind(role)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .unwrap();
}

/// Insert a channel row directly. `created_at` is offset by `order` seconds
/// so listing order is deterministic.
pub async fn create_channel(
    pool: &SqlitePool,
    workspace_id: &str,
    creator_id: &str,
    name: &str,
    parent_id: Option<&str>,
    order: i64,
) -> String {
    let channel_id = uuid::Uuid::new_v4().to_string();
    let created = (chrono::Utc::now() - chrono::Duration::hours(1) + chrono::Duration::seconds(order))
        .to_rfc3339();

    sqlx::query(
        r#"INSERT INTO channels (id, workspace_id, parent_id, name, creator_id, is_private, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(&channel_id)
    .bind(workspace_id)
    .bind(parent_id)
    .bind(name)
    .bind(creator_id)
    .bind(&created)
    .bind(&created)
    .execute(pool)
    .await
    .unwrap();

    channel_id
}

/// Insert a channel message with an explicit timestamp.
pub async fn create_message(
    pool: &SqlitePool,
    channel_id: &str,
    user_id: &str,
    content: &str,
    created_at: &str,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO messages (id, channel_id, user_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(channel_id)
    .bind(user_id)
    .bind(content)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Link a Google Drive account for a user, expiring at `expires_at`.
pub async fn link_drive_account(pool: &SqlitePool, user_id: &str, access_token: &str, expires_at: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO user_integrations (user_id, provider, access_token, refresh_token, expires_at, scope, created_at, updated_at)
           VALUES (?, 'google_drive', ?, 'test-refresh-token', ?, 'drive.file', ?, ?)"#,
    )
    .bind(user_id)
    .bind(access_token)
    .bind(expires_at)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
}
