use std::time::Duration;

use tracing::warn;

use agora_core::SessionManager;

/// Background task that deletes expired sessions.
///
/// Lazy eviction on resolve already keeps expired tokens unusable; this only
/// bounds how long dead rows linger for tokens nobody presents again.
pub async fn run_session_sweep(sessions: SessionManager, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let sessions = sessions.clone();
        match tokio::task::spawn_blocking(move || sessions.sweep_expired()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Session sweep error: {}", e),
            Err(e) => warn!("Session sweep task failed: {}", e),
        }
    }
}
