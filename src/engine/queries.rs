use crate::calendar::{self, Calendar, Calendars};
use crate::grouped::ResourceGroupedAvailability;
use crate::model::{AvailabilityId, ResourceId, TimeSlot};
use crate::segment::ResourceAvailability;

use super::validate::validate_candidates;
use super::{Engine, EngineError};

impl Engine {
    /// Segments of `resource_id` covering the normalized `slot`.
    pub fn find(&self, resource_id: ResourceId, slot: TimeSlot) -> Result<ResourceGroupedAvailability, EngineError> {
        let normalized = self.normalize(&slot)?;
        Ok(self.repository.load_all_within_slot(resource_id, &normalized)?)
    }

    pub fn find_by_parent_id(
        &self,
        parent_id: ResourceId,
        slot: TimeSlot,
    ) -> Result<ResourceGroupedAvailability, EngineError> {
        let normalized = self.normalize(&slot)?;
        Ok(self.repository.load_all_by_parent_id_within_slot(parent_id, &normalized)?)
    }

    pub fn find_by_id(&self, id: AvailabilityId) -> Result<Option<ResourceAvailability>, EngineError> {
        Ok(self.repository.load_by_id(id)?)
    }

    pub fn load_calendar(&self, resource_id: ResourceId, slot: TimeSlot) -> Result<Calendar, EngineError> {
        let normalized = self.normalize(&slot)?;
        Ok(calendar::load(self.repository.as_ref(), resource_id, &normalized)?)
    }

    pub fn load_calendars(&self, resource_ids: &[ResourceId], slot: TimeSlot) -> Result<Calendars, EngineError> {
        validate_candidates(resource_ids.len())?;
        let normalized = self.normalize(&slot)?;
        Ok(calendar::load_all(self.repository.as_ref(), resource_ids, &normalized)?)
    }

    /// Every resource with at least one provisioned segment.
    pub fn resource_ids(&self) -> Result<Vec<ResourceId>, EngineError> {
        Ok(self.repository.resource_ids()?)
    }
}
