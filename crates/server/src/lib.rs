pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;

use config::Config;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub http: reqwest::Client,
    /// OAuth `state` nonce -> user id, consumed by the Drive callback.
    pub drive_auth_pending: RwLock<HashMap<String, String>>,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        Self {
            db,
            config,
            http: reqwest::Client::new(),
            drive_auth_pending: RwLock::new(HashMap::new()),
        }
    }
}
