//! Opt-in periodic cleanup of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use chunkyard_transfer::SessionRegistry;
use tokio_util::sync::CancellationToken;

/// Purges expired sessions every `interval` until `cancel` fires.
pub(crate) async fn run_sweeper(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; nothing can be expired yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let reg = Arc::clone(&registry);
                match tokio::task::spawn_blocking(move || reg.purge_expired()).await {
                    Ok(purged) => {
                        for id in purged {
                            tracing::debug!(session = %id, "expired session purged");
                        }
                    }
                    Err(e) => tracing::warn!("sweep task failed: {e}"),
                }
            }
        }
    }
}
