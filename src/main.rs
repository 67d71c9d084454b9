use std::sync::Arc;

use tracing::info;

use slotlock::compactor;
use slotlock::config::Config;
use slotlock::repository::{AvailabilityRepository, WalRepository};

/// Offline maintenance: replay the availability WAL, report, compact, exit.
/// Long-running hosts embed `slotlock::service::Service` instead.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let wal_path = config.wal_path();
    let repository = Arc::new(WalRepository::open(&wal_path)?);

    let resources = repository.resource_ids()?;
    info!("slotlock maintenance");
    info!("  wal: {}", wal_path.display());
    info!("  segment: {} min", config.segment.as_ms() / 60_000);
    info!("  resources: {}", resources.len());
    info!("  segments: {}", repository.segment_count());
    info!("  records since last compaction: {}", repository.appends_since_compact());

    let before = std::fs::metadata(&wal_path)?.len();
    if compactor::compact_if_needed(repository.clone(), config.compact_threshold).await? {
        let after = std::fs::metadata(&wal_path)?.len();
        info!("compacted WAL: {before} -> {after} bytes");
    } else {
        info!("below compaction threshold ({}), nothing to do", config.compact_threshold);
    }

    Ok(())
}
