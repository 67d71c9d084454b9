use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::repository::{StoreError, WalRepository};

/// Background task: every `period`, compact the WAL if enough appends piled up.
pub async fn run_compactor(repository: Arc<WalRepository>, threshold: u64, period: Duration) {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    loop {
        interval.tick().await;
        if let Err(e) = compact_if_needed(repository.clone(), threshold).await {
            warn!("WAL compaction failed: {e}");
        }
    }
}

/// Compact when appends since the last compaction reach `threshold`.
/// Returns whether a compaction ran.
pub async fn compact_if_needed(
    repository: Arc<WalRepository>,
    threshold: u64,
) -> Result<bool, StoreError> {
    let appends = repository.appends_since_compact();
    if appends < threshold {
        return Ok(false);
    }
    debug!(appends, threshold, "compacting WAL");
    // Compaction fsyncs and holds every commit off; keep it off the async workers.
    match tokio::task::spawn_blocking(move || repository.compact()).await {
        Ok(result) => result.map(|()| true),
        Err(e) => Err(StoreError::Io(std::io::Error::other(e))),
    }
}
