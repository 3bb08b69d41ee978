mod oauth;
mod token;

pub use oauth::*;
pub use token::{get_valid_token, is_token_expired};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::AuthUser;
use crate::AppState;

const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,webViewLink,iconLink";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    /// Drive reports sizes as decimal strings.
    pub size: Option<String>,
    pub modified_time: Option<String>,
    pub web_view_link: Option<String>,
    pub icon_link: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveListQuery {
    pub folder_id: Option<String>,
    pub page_token: Option<String>,
}

async fn upstream_error(res: reqwest::Response) -> AppError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    tracing::warn!("Google Drive request failed ({}): {}", status, body);
    if status == reqwest::StatusCode::UNAUTHORIZED {
        AppError::Upstream("Google Drive rejected the access token".into())
    } else {
        AppError::Upstream(format!("Google Drive error ({})", status))
    }
}

/// GET /api/drive/files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<DriveListQuery>,
) -> AppResult<impl IntoResponse> {
    let token = get_valid_token(&state, &user.id).await?;

    let q = match query.folder_id.as_deref().filter(|f| !f.is_empty()) {
        Some(folder) => format!(
            "'{}' in parents and trashed = false",
            folder.replace('\\', "\\\\").replace('\'', "\\'")
        ),
        None => "trashed = false".to_string(),
    };
    let fields = format!("nextPageToken, files({})", FILE_FIELDS);

    let mut params = vec![
        ("q", q.as_str()),
        ("pageSize", "100"),
        ("fields", fields.as_str()),
    ];
    if let Some(ref page_token) = query.page_token {
        params.push(("pageToken", page_token.as_str()));
    }

    let res = state
        .http
        .get(format!("{}/files", state.config.google.drive_api_url))
        .bearer_auth(&token)
        .query(&params)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Network error: {}", e)))?;

    if !res.status().is_success() {
        return Err(upstream_error(res).await);
    }

    let list: DriveFileList = res
        .json()
        .await
        .map_err(|_| AppError::Upstream("Failed to parse Drive response".into()))?;

    Ok(Json(list))
}

/// POST /api/drive/upload
///
/// Multipart form with a `file` field and an optional `folderId` field.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut folder_id: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Malformed multipart body".into()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folderId" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::Validation("Invalid folderId".into()))?;
                folder_id = Some(value).filter(|v| !v.is_empty());
            }
            "file" => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::Validation("Failed to read file".into()))?;
                file = Some((filename, content_type, data.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::Validation("No file provided".into()))?;

    if data.len() as u64 > state.config.max_upload_bytes {
        return Err(AppError::Validation(format!(
            "File too large. Max size: {} MB",
            state.config.max_upload_bytes / 1_048_576
        )));
    }

    let token = get_valid_token(&state, &user.id).await?;

    let mut metadata = serde_json::json!({ "name": filename });
    if let Some(folder) = folder_id {
        metadata["parents"] = serde_json::json!([folder]);
    }

    let boundary = format!("huddle-{}", uuid::Uuid::new_v4().simple());
    let body = related_body(&boundary, &metadata, &content_type, &data);

    let res = state
        .http
        .post(format!("{}/files", state.config.google.drive_upload_url))
        .bearer_auth(&token)
        .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
        .header(
            reqwest::header::CONTENT_TYPE,
            format!("multipart/related; boundary={}", boundary),
        )
        .body(body)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Network error: {}", e)))?;

    if !res.status().is_success() {
        return Err(upstream_error(res).await);
    }

    let uploaded: DriveFile = res
        .json()
        .await
        .map_err(|_| AppError::Upstream("Failed to parse Drive response".into()))?;

    tracing::info!("User {} uploaded {} to Google Drive", user.id, uploaded.id);
    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// Drive's `uploadType=multipart` body: JSON metadata part, then the media part.
fn related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n--{}\r\nContent-Type: {}\r\n\r\n",
            boundary, metadata, boundary, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// DELETE /api/integrations/:provider
pub async fn delete_integration(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(provider): Path<String>,
) -> AppResult<impl IntoResponse> {
    let removed = sqlx::query("DELETE FROM user_integrations WHERE user_id = ? AND provider = ?")
        .bind(&user.id)
        .bind(&provider)
        .execute(&state.db)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::NotFound("Integration not found".into()));
    }

    tracing::info!("User {} removed the {} integration", user.id, provider);
    Ok(StatusCode::NO_CONTENT)
}
