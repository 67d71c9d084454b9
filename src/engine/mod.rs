mod error;
mod mutations;
mod queries;
mod validate;

pub use error::EngineError;
pub use mutations::Mutation;

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::grid::{self, SegmentDuration};
use crate::ids::{IdGenerator, UlidGenerator};
use crate::model::TimeSlot;
use crate::notify::NotifyHub;
use crate::repository::AvailabilityRepository;

/// Entry point for applications: provisioning, mutations and queries over a
/// repository, with every requested slot normalized to the segment grid.
///
/// Mutations are one-shot. A `false` means the range was missing, held by
/// someone else, or changed concurrently; nothing was written and the caller
/// decides whether to retry.
pub struct Engine {
    pub(super) repository: Arc<dyn AvailabilityRepository>,
    pub(super) segment: SegmentDuration,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(
        repository: Arc<dyn AvailabilityRepository>,
        segment: SegmentDuration,
        notify: Arc<NotifyHub>,
    ) -> Self {
        Self::with_collaborators(repository, segment, Arc::new(SystemClock), Arc::new(UlidGenerator), notify)
    }

    pub fn with_collaborators(
        repository: Arc<dyn AvailabilityRepository>,
        segment: SegmentDuration,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        notify: Arc<NotifyHub>,
    ) -> Self {
        Self {
            repository,
            segment,
            clock,
            ids,
            notify,
        }
    }

    pub fn segment_duration(&self) -> SegmentDuration {
        self.segment
    }

    pub fn repository(&self) -> &Arc<dyn AvailabilityRepository> {
        &self.repository
    }

    /// Validate `slot` and snap it to the grid.
    pub(super) fn normalize(&self, slot: &TimeSlot) -> Result<TimeSlot, EngineError> {
        validate::validate_slot(slot)?;
        Ok(grid::normalize_to_segment_boundaries(slot, self.segment))
    }
}
