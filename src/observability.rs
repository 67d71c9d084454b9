use std::net::SocketAddr;

// ── Mutation metrics ────────────────────────────────────────────

/// Counter: facade mutations. Labels: op (block, release, disable,
/// block_random), outcome (accepted, rejected).
pub const MUTATIONS_TOTAL: &str = "slotlock_mutations_total";

/// Counter: versioned saves rejected because a segment moved since load.
pub const VERSION_CONFLICTS_TOTAL: &str = "slotlock_version_conflicts_total";

/// Counter: segments created by provisioning.
pub const SEGMENTS_PROVISIONED_TOTAL: &str = "slotlock_segments_provisioned_total";

// ── Storage metrics ─────────────────────────────────────────────

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "slotlock_wal_flush_duration_seconds";

/// Counter: WAL compactions performed.
pub const WAL_COMPACTIONS_TOTAL: &str = "slotlock_wal_compactions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub fn outcome_label(accepted: bool) -> &'static str {
    if accepted { "accepted" } else { "rejected" }
}
