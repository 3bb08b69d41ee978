mod channel;
mod message;
mod user;

pub use channel::*;
pub use message::*;
pub use user::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Identity resolved from the session; the auth provider owns everything else.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

/// Keeps "field present but null" (`Some(None)`) apart from "field absent" (`None`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}
