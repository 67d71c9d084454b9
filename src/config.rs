use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineError;
use crate::grid::{SegmentDuration, DEFAULT_SEGMENT_MINUTES};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
pub const DEFAULT_COMPACT_INTERVAL_SECS: u64 = 60;
pub const WAL_FILE_NAME: &str = "availability.wal";

/// Runtime settings, read from `SLOTLOCK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub segment: SegmentDuration,
    pub data_dir: PathBuf,
    pub compact_threshold: u64,
    /// How often a running service checks the compaction threshold.
    pub compact_interval: Duration,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segment: SegmentDuration::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            compact_interval: Duration::from_secs(DEFAULT_COMPACT_INTERVAL_SECS),
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take defaults; set but
    /// unparsable ones are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let minutes: i64 = parse(&lookup, "SLOTLOCK_SEGMENT_MINUTES")?.unwrap_or(DEFAULT_SEGMENT_MINUTES);
        let segment = SegmentDuration::minutes(minutes)?;
        let data_dir = lookup("SLOTLOCK_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        let compact_threshold = parse(&lookup, "SLOTLOCK_COMPACT_THRESHOLD")?.unwrap_or(DEFAULT_COMPACT_THRESHOLD);
        let interval_secs = parse(&lookup, "SLOTLOCK_COMPACT_INTERVAL_SECS")?.unwrap_or(DEFAULT_COMPACT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(EngineError::Config("SLOTLOCK_COMPACT_INTERVAL_SECS must be positive".into()));
        }
        let metrics_port = parse(&lookup, "SLOTLOCK_METRICS_PORT")?;
        Ok(Self {
            segment,
            data_dir: PathBuf::from(data_dir),
            compact_threshold,
            compact_interval: Duration::from_secs(interval_secs),
            metrics_port,
        })
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE_NAME)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, EngineError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EngineError::Config(format!("{key}={raw:?} is not valid"))),
    }
}
