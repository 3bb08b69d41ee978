use huddle_shared::hierarchy::HierarchyItem;
use serde::{Deserialize, Serialize};

use super::nullable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub workspace_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub is_private: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl HierarchyItem for Channel {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub workspace_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    /// Absent leaves the parent alone, `null` moves the channel to the root.
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<String>>,
}
