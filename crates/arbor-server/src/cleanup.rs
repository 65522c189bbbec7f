use std::time::Duration;

use tracing::{info, warn};

use arbor_api::auth::AppState;

/// Background task that prunes expired session rows.
///
/// Expiry is already enforced at lookup time; this just keeps the table from
/// accumulating dead rows.
pub async fn run_session_sweep(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match state.db.delete_expired_sessions() {
            Ok(count) => {
                if count > 0 {
                    info!("Session sweep: removed {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Session sweep error: {}", e);
            }
        }
    }
}
