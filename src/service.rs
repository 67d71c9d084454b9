use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::compactor;
use crate::config::Config;
use crate::engine::{Engine, EngineError};
use crate::notify::NotifyHub;
use crate::observability;
use crate::repository::{StoreError, WalRepository};

/// A WAL-backed engine wired for a long-running host process: metrics
/// exporter installed, background compaction scheduled.
///
/// Must be started inside a tokio runtime.
pub struct Service {
    engine: Engine,
    repository: Arc<WalRepository>,
    compactor: JoinHandle<()>,
    compact_threshold: u64,
}

impl Service {
    pub fn start(config: &Config) -> Result<Self, EngineError> {
        observability::init(config.metrics_port).map_err(|e| EngineError::Config(e.to_string()))?;

        std::fs::create_dir_all(&config.data_dir).map_err(StoreError::from)?;
        let wal_path = config.wal_path();
        let repository = Arc::new(WalRepository::open(&wal_path)?);
        let engine = Engine::new(repository.clone(), config.segment, Arc::new(NotifyHub::new()));
        let compactor = tokio::spawn(compactor::run_compactor(
            repository.clone(),
            config.compact_threshold,
            config.compact_interval,
        ));

        info!("slotlock service started");
        info!("  wal: {}", wal_path.display());
        info!("  segment: {} min", config.segment.as_ms() / 60_000);
        info!("  segments: {}", repository.segment_count());
        info!(
            "  compaction: every {}s past {} records",
            config.compact_interval.as_secs(),
            config.compact_threshold
        );

        Ok(Self {
            engine,
            repository,
            compactor,
            compact_threshold: config.compact_threshold,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn repository(&self) -> &Arc<WalRepository> {
        &self.repository
    }

    /// Stop background compaction, then compact once more if past the
    /// threshold. Returns whether that last compaction ran.
    pub async fn shutdown(self) -> Result<bool, StoreError> {
        self.compactor.abort();
        // A cancelled task reports a JoinError; nothing to recover from it.
        let _ = self.compactor.await;
        let compacted = compactor::compact_if_needed(self.repository.clone(), self.compact_threshold).await?;
        info!(compacted, "slotlock service stopped");
        Ok(compacted)
    }
}
