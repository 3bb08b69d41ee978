//! Channel records: create, rename, reparent, delete, list.
//!
//! Ownership is decided by the write statement itself (`WHERE creator_id = ?`).
//! When it touches no row the helper looks the channel up only to pick the
//! error message: [`StoreError::Forbidden`] if it exists, otherwise
//! [`StoreError::NotFound`]. Updates also check ownership up front, before the
//! new parent is inspected, and apply name and parent in one statement.

use sqlx::SqlitePool;
use std::collections::HashSet;

use huddle_shared::constants::MAX_CHANNEL_DEPTH;
use huddle_shared::validation::{validate_channel_description, validate_channel_name};

use super::{is_foreign_key_violation, is_workspace_member, StoreError};
use crate::models::{AuthUser, Channel};

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub is_private: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    /// `Some(None)` moves the channel to the root.
    pub parent_id: Option<Option<String>>,
}

/// Public channels of the workspace plus the private ones `user_id` belongs to,
/// oldest first so the tree keeps a stable sibling order.
pub async fn list_channels(
    db: &SqlitePool,
    workspace_id: &str,
    user_id: &str,
) -> Result<Vec<Channel>, StoreError> {
    let channels = sqlx::query_as::<_, Channel>(
        r#"SELECT c.* FROM channels c
           WHERE c.workspace_id = ?
             AND (c.is_private = 0
                  OR EXISTS (SELECT 1 FROM channel_members m
                             WHERE m.channel_id = c.id AND m.user_id = ?))
           ORDER BY c.created_at ASC, c.rowid ASC"#,
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_all(db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list channels for workspace {}: {}", workspace_id, e);
        e
    })?;

    Ok(channels)
}

pub async fn get_channel(db: &SqlitePool, channel_id: &str) -> Result<Option<Channel>, StoreError> {
    let channel = sqlx::query_as::<_, Channel>("SELECT * FROM channels WHERE id = ?")
        .bind(channel_id)
        .fetch_optional(db)
        .await?;
    Ok(channel)
}

/// The channel, if `user_id` may read and post in it.
pub async fn visible_channel(
    db: &SqlitePool,
    channel_id: &str,
    user_id: &str,
) -> Result<Channel, StoreError> {
    let channel = get_channel(db, channel_id)
        .await?
        .ok_or_else(|| StoreError::NotFound("Channel not found".into()))?;

    if !is_workspace_member(db, &channel.workspace_id, user_id).await? {
        return Err(StoreError::Forbidden("Not a member of this workspace".into()));
    }

    if channel.is_private {
        let is_member = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM channel_members WHERE channel_id = ? AND user_id = ?",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        if is_member == 0 {
            return Err(StoreError::Forbidden("Not a member of this channel".into()));
        }
    }

    Ok(channel)
}

pub async fn create_channel(
    db: &SqlitePool,
    user: &AuthUser,
    new: NewChannel,
) -> Result<Channel, StoreError> {
    validate_channel_name(&new.name).map_err(StoreError::Validation)?;
    if let Some(ref description) = new.description {
        validate_channel_description(description).map_err(StoreError::Validation)?;
    }

    if !is_workspace_member(db, &new.workspace_id, &user.id).await? {
        return Err(StoreError::Forbidden("Not a member of this workspace".into()));
    }

    if let Some(ref parent_id) = new.parent_id {
        let parent_level = ancestor_chain(db, parent_id).await?.len() - 1;
        check_depth(parent_level + 1)?;
    }

    let now = chrono::Utc::now().to_rfc3339();
    let channel = Channel {
        id: uuid::Uuid::new_v4().to_string(),
        workspace_id: new.workspace_id,
        parent_id: new.parent_id,
        name: new.name.trim().to_string(),
        description: new
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        creator_id: user.id.clone(),
        is_private: new.is_private,
        created_at: now.clone(),
        updated_at: now.clone(),
    };

    sqlx::query(
        r#"INSERT INTO channels (id, workspace_id, parent_id, name, description, creator_id, is_private, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&channel.id)
    .bind(&channel.workspace_id)
    .bind(&channel.parent_id)
    .bind(&channel.name)
    .bind(&channel.description)
    .bind(&channel.creator_id)
    .bind(channel.is_private)
    .bind(&channel.created_at)
    .bind(&channel.updated_at)
    .execute(db)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            StoreError::Validation("Parent channel not found in this workspace".into())
        } else {
            tracing::error!("Failed to create channel: {}", e);
            StoreError::Database(e)
        }
    })?;

    // Follow-up write. The channel stands even if this fails.
    if let Err(e) = sqlx::query(
        "INSERT OR IGNORE INTO channel_members (channel_id, user_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(&channel.id)
    .bind(&user.id)
    .bind(&now)
    .execute(db)
    .await
    {
        tracing::warn!(
            "Channel {} created but creator membership failed: {}",
            channel.id,
            e
        );
    }

    tracing::info!("Channel {} created in workspace {}", channel.id, channel.workspace_id);
    Ok(channel)
}

/// Rename and/or move a channel. Nothing is written unless every part of the
/// change is valid.
pub async fn update_channel(
    db: &SqlitePool,
    user: &AuthUser,
    channel_id: &str,
    update: ChannelUpdate,
) -> Result<Channel, StoreError> {
    if let Some(ref name) = update.name {
        validate_channel_name(name).map_err(StoreError::Validation)?;
    }

    let channel = get_channel(db, channel_id)
        .await?
        .ok_or_else(|| StoreError::NotFound("Channel not found".into()))?;
    if channel.creator_id != user.id {
        return Err(StoreError::Forbidden("Only the channel owner can update it".into()));
    }

    let moves = update.parent_id.is_some();
    let new_parent = update.parent_id.flatten();
    if let Some(ref pid) = new_parent {
        check_new_parent(db, &channel, pid).await?;
    }

    let result = sqlx::query(
        r#"UPDATE channels
           SET name = COALESCE(?, name),
               parent_id = CASE WHEN ? THEN ? ELSE parent_id END,
               updated_at = ?
           WHERE id = ? AND creator_id = ?"#,
    )
    .bind(update.name.as_deref().map(str::trim))
    .bind(moves)
    .bind(&new_parent)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(channel_id)
    .bind(&user.id)
    .execute(db)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            StoreError::Validation("Parent channel not found in this workspace".into())
        } else {
            tracing::error!("Failed to update channel {}: {}", channel_id, e);
            StoreError::Database(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(rejection(db, channel_id, "update").await);
    }

    fetch_updated(db, channel_id).await
}

async fn check_new_parent(db: &SqlitePool, channel: &Channel, parent_id: &str) -> Result<(), StoreError> {
    if parent_id == channel.id {
        return Err(StoreError::Validation("A channel cannot be its own parent".into()));
    }

    match get_channel(db, parent_id).await? {
        Some(parent) if parent.workspace_id == channel.workspace_id => {}
        _ => {
            return Err(StoreError::Validation(
                "Parent channel not found in this workspace".into(),
            ))
        }
    }

    let chain = ancestor_chain(db, parent_id).await?;
    if chain.iter().any(|id| id == &channel.id) {
        return Err(StoreError::Validation(
            "Cannot move a channel under one of its own descendants".into(),
        ));
    }

    check_depth(chain.len() + subtree_height(db, &channel.id).await?)
}

/// Children, memberships and messages go with it (store-side cascade).
pub async fn delete_channel(
    db: &SqlitePool,
    user: &AuthUser,
    channel_id: &str,
) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM channels WHERE id = ? AND creator_id = ?")
        .bind(channel_id)
        .bind(&user.id)
        .execute(db)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete channel {}: {}", channel_id, e);
            e
        })?;

    if result.rows_affected() == 0 {
        let err = rejection(db, channel_id, "delete").await;
        tracing::warn!("Delete of channel {} by {} rejected: {}", channel_id, user.id, err);
        return Err(err);
    }

    tracing::info!("Channel {} deleted by {}", channel_id, user.id);
    Ok(())
}

/// `start` followed by its ancestors, nearest first. Stops on an already-seen
/// id so a cycle that slipped into the table cannot hang the walk.
async fn ancestor_chain(db: &SqlitePool, start: &str) -> Result<Vec<String>, StoreError> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut current = Some(start.to_string());

    while let Some(id) = current {
        if !seen.insert(id.clone()) {
            break;
        }
        current = sqlx::query_scalar::<_, Option<String>>(
            "SELECT parent_id FROM channels WHERE id = ?",
        )
        .bind(&id)
        .fetch_optional(db)
        .await?
        .flatten();
        chain.push(id);
    }

    Ok(chain)
}

/// Levels below `channel_id`, 0 for a leaf. Counting stops past the nesting limit.
async fn subtree_height(db: &SqlitePool, channel_id: &str) -> Result<usize, StoreError> {
    let height = sqlx::query_scalar::<_, Option<i64>>(
        r#"WITH RECURSIVE sub(id, depth) AS (
               SELECT id, 0 FROM channels WHERE id = ?
               UNION
               SELECT c.id, sub.depth + 1 FROM channels c
               JOIN sub ON c.parent_id = sub.id
               WHERE sub.depth < ?
           )
           SELECT MAX(depth) FROM sub"#,
    )
    .bind(channel_id)
    .bind(MAX_CHANNEL_DEPTH as i64)
    .fetch_one(db)
    .await?
    .unwrap_or(0);

    Ok(height.max(0) as usize)
}

/// `level` is 0-based, so the deepest allowed channel sits at `MAX_CHANNEL_DEPTH - 1`.
fn check_depth(level: usize) -> Result<(), StoreError> {
    if level >= MAX_CHANNEL_DEPTH {
        return Err(StoreError::Validation(format!(
            "Channels can be nested at most {} levels deep",
            MAX_CHANNEL_DEPTH
        )));
    }
    Ok(())
}

async fn fetch_updated(db: &SqlitePool, channel_id: &str) -> Result<Channel, StoreError> {
    get_channel(db, channel_id)
        .await?
        .ok_or_else(|| StoreError::NotFound("Channel not found".into()))
}

async fn rejection(db: &SqlitePool, channel_id: &str, action: &str) -> StoreError {
    match get_channel(db, channel_id).await {
        Ok(Some(_)) => StoreError::Forbidden(format!("Only the channel owner can {} it", action)),
        Ok(None) => StoreError::NotFound("Channel not found".into()),
        Err(e) => e,
    }
}
