//! Thin typed wrapper over the Huddle HTTP API, authenticated with a session
//! bearer token.

use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use huddle_shared::hierarchy::{build_hierarchy, ChannelNode};

use crate::dm_sync::LatestMessageSource;
use crate::error::{ClientError, ClientResult};
use crate::models::{Channel, DirectMessage, ErrorBody, LatestMessageResponse};
use crate::presence::PresenceSink;
use crate::settings::UserSettings;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, token)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    /// Turns a non-success status into [`ClientError::Api`] carrying the server's message.
    async fn check(res: Response) -> ClientResult<Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let text = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Request failed").to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let res = Self::check(req.send().await?).await?;
        Ok(res.json().await?)
    }

    async fn send_empty(&self, req: RequestBuilder) -> ClientResult<()> {
        Self::check(req.send().await?).await?;
        Ok(())
    }

    pub async fn list_channels(&self, workspace_id: &str) -> ClientResult<Vec<Channel>> {
        let path = format!("/workspaces/{}/channels", workspace_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    /// Fetch the flat list and build the forest locally, from scratch each time.
    pub async fn channel_tree(&self, workspace_id: &str) -> ClientResult<Vec<ChannelNode<Channel>>> {
        Ok(build_hierarchy(self.list_channels(workspace_id).await?))
    }

    pub async fn create_channel(
        &self,
        workspace_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> ClientResult<Channel> {
        let body = json!({ "workspaceId": workspace_id, "name": name, "parentId": parent_id });
        self.send_json(self.request(Method::POST, "/channels").json(&body))
            .await
    }

    pub async fn rename_channel(&self, channel_id: &str, name: &str) -> ClientResult<Channel> {
        let path = format!("/channels/{}", channel_id);
        self.send_json(self.request(Method::PATCH, &path).json(&json!({ "name": name })))
            .await
    }

    /// `None` moves the channel to the root.
    pub async fn move_channel(
        &self,
        channel_id: &str,
        parent_id: Option<&str>,
    ) -> ClientResult<Channel> {
        let path = format!("/channels/{}", channel_id);
        self.send_json(
            self.request(Method::PATCH, &path)
                .json(&json!({ "parentId": parent_id })),
        )
        .await
    }

    pub async fn delete_channel(&self, channel_id: &str) -> ClientResult<()> {
        let path = format!("/channels/{}", channel_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn latest_direct_message(
        &self,
        other_user_id: &str,
    ) -> ClientResult<Option<DirectMessage>> {
        let path = format!("/dms/{}/messages/latest", other_user_id);
        let body: LatestMessageResponse = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(body.message)
    }

    pub async fn send_direct_message(
        &self,
        other_user_id: &str,
        content: &str,
    ) -> ClientResult<DirectMessage> {
        let path = format!("/dms/{}/messages", other_user_id);
        self.send_json(
            self.request(Method::POST, &path)
                .json(&json!({ "content": content })),
        )
        .await
    }

    pub async fn mark_read(&self, other_user_id: &str) -> ClientResult<()> {
        let path = format!("/dms/{}/read", other_user_id);
        self.send_empty(self.request(Method::POST, &path)).await
    }

    pub async fn heartbeat(&self) -> ClientResult<()> {
        self.send_empty(self.request(Method::POST, "/presence/heartbeat"))
            .await
    }

    pub async fn go_offline(&self) -> ClientResult<()> {
        self.send_empty(self.request(Method::POST, "/presence/offline"))
            .await
    }

    /// Push the synced part of local settings. Timezone stays local.
    pub async fn update_settings(&self, settings: &UserSettings) -> ClientResult<()> {
        let body = json!({
            "theme": settings.theme,
            "notificationsEnabled": settings.notifications_enabled,
            "compactMode": settings.compact_mode,
        });
        self.send_empty(self.request(Method::PATCH, "/users/me/settings").json(&body))
            .await
    }
}

/// The session user is `_user_a`; the endpoint is keyed by the other participant.
impl LatestMessageSource for ApiClient {
    fn latest_message<'a>(
        &'a self,
        _user_a: &'a str,
        user_b: &'a str,
    ) -> BoxFuture<'a, ClientResult<Option<DirectMessage>>> {
        Box::pin(self.latest_direct_message(user_b))
    }
}

impl PresenceSink for ApiClient {
    fn heartbeat(&self) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(ApiClient::heartbeat(self))
    }

    fn go_offline(&self) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(ApiClient::go_offline(self))
    }
}
