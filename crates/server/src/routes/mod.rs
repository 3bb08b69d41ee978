pub mod channels;
pub mod dms;
pub mod drive;
pub mod messages;
pub mod presence;
pub mod users;

use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Leave room for the multipart framing around the file itself
    let upload_limit = state.config.max_upload_bytes as usize + 64 * 1024;

    let api_routes = Router::new()
        // Channels
        .route("/workspaces/{workspaceId}/channels", get(channels::list_channels))
        .route("/workspaces/{workspaceId}/channels/tree", get(channels::channel_tree))
        .route("/channels", post(channels::create_channel))
        .route(
            "/channels/{channelId}",
            axum::routing::patch(channels::update_channel).delete(channels::delete_channel),
        )
        // Messages
        .route(
            "/channels/{channelId}/messages",
            get(messages::list_messages).post(messages::post_message),
        )
        .route("/messages/reactions", get(messages::get_reactions))
        .route(
            "/messages/{messageId}",
            axum::routing::patch(messages::edit_message).delete(messages::delete_message),
        )
        .route("/messages/{messageId}/reactions", post(messages::toggle_reaction))
        // DMs
        .route("/dms", get(dms::list_conversations))
        .route(
            "/dms/{userId}/messages",
            get(dms::list_direct_messages).post(dms::send_direct_message),
        )
        .route("/dms/{userId}/messages/latest", get(dms::latest_direct_message))
        .route("/dms/{userId}/read", post(dms::mark_read))
        // Presence
        .route("/presence", get(presence::list_presence))
        .route("/presence/heartbeat", post(presence::heartbeat))
        .route("/presence/offline", post(presence::go_offline))
        // Users
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route(
            "/users/me/settings",
            get(users::get_settings).patch(users::update_settings),
        )
        // Google Drive
        .route("/drive/files", get(drive::list_files))
        .route(
            "/drive/upload",
            post(drive::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/drive/oauth/start", get(drive::oauth_start))
        .route("/drive/oauth/callback", get(drive::oauth_callback))
        .route("/integrations/{provider}", delete(drive::delete_integration));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
}
