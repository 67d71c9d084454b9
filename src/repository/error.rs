use crate::model::{AvailabilityId, ResourceId, TimeSlot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("segment already exists: {0}")]
    AlreadyExists(AvailabilityId),
    #[error("segment {segment} overlaps an existing segment of resource {resource_id}")]
    OverlappingSegment {
        resource_id: ResourceId,
        segment: TimeSlot,
    },
    #[error("resource {resource_id} is already provisioned under a different parent")]
    ParentMismatch { resource_id: ResourceId },
    #[error("WAL I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAL encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("WAL record of {0} bytes exceeds the record size cap")]
    RecordTooLarge(usize),
    #[error("WAL refused the append after a failed rollback; reopen the repository")]
    LogPoisoned,
}
