use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use dongne_db::Database;
use dongne_gateway::Rooms;

use crate::config::Config;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub rooms: Rooms,
    pub config: Config,
    /// Client for identity-provider calls.
    pub http: reqwest::Client,
    /// Held from message insert until its broadcast returns, so sockets see
    /// messages in storage order.
    pub message_order: Mutex<()>,
}

impl AppStateInner {
    pub fn new(db: Database, config: Config) -> AppState {
        Arc::new(Self {
            db,
            rooms: Rooms::new(),
            config,
            http: reqwest::Client::new(),
            message_order: Mutex::new(()),
        })
    }
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("Internal server error".into())
        })?
        .map_err(ApiError::from)
}
