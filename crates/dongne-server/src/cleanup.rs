use std::time::Duration;

use tracing::{info, warn};

use dongne_api::AppState;

/// Background task that deletes expired login sessions.
pub async fn run_session_purge_loop(state: AppState, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let state = state.clone();
        let result =
            tokio::task::spawn_blocking(move || state.db.purge_expired_sessions(chrono::Utc::now()))
                .await;

        match result {
            Ok(Ok(0)) => {}
            Ok(Ok(count)) => info!("Session purge: removed {} expired sessions", count),
            Ok(Err(e)) => warn!("Session purge error: {:#}", e),
            Err(e) => warn!("Session purge task failed: {}", e),
        }
    }
}
