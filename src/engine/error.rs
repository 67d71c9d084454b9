use crate::model::Ms;
use crate::repository::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("segment duration must be positive, got {0}ms")]
    InvalidSegmentDuration(Ms),
    #[error("malformed slot [{from}, {to})")]
    MalformedSlot { from: Ms, to: Ms },
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
