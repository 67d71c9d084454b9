use std::sync::atomic::{AtomicU64, Ordering};

use ulid::Ulid;

use crate::model::AvailabilityId;

/// Source of segment ids, injected into provisioning.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> AvailabilityId;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UlidGenerator;

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> AvailabilityId {
        AvailabilityId(Ulid::new())
    }
}

/// Deterministic, monotonically increasing ids.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> AvailabilityId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        AvailabilityId(Ulid::from_parts(0, n as u128))
    }
}
