//! Client-side state and timers for Huddle: the HTTP API client, channel tree
//! view state, direct-message polling, the idle-aware poll scheduler, presence
//! heartbeats and local settings.

pub mod api;
pub mod dm_sync;
pub mod error;
pub mod idle;
pub mod models;
pub mod presence;
pub mod settings;
pub mod tree_state;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};
