mod durable;
mod error;
mod memory;

pub use durable::WalRepository;
pub use error::StoreError;
pub use memory::InMemoryRepository;

use crate::grouped::ResourceGroupedAvailability;
use crate::model::{AvailabilityId, ResourceId, TimeSlot};
use crate::segment::ResourceAvailability;

/// The only path by which segment state changes become durable.
///
/// Contention is reported as `Ok(false)`; `Err` is reserved for storage faults
/// and provisioning mistakes.
pub trait AvailabilityRepository: Send + Sync {
    /// Unconditional bulk insert of freshly provisioned segments.
    fn save_new(&self, group: &ResourceGroupedAvailability) -> Result<(), StoreError>;

    /// All-or-nothing compare-and-swap over every segment in the group.
    ///
    /// Each segment's persisted version must still equal the version it was
    /// loaded at. On success the group is rebased onto the written state.
    fn save_checking_version(&self, group: &mut ResourceGroupedAvailability) -> Result<bool, StoreError>;

    fn load_by_id(&self, id: AvailabilityId) -> Result<Option<ResourceAvailability>, StoreError>;

    /// Segments of one resource lying within `slot`, ordered by start.
    fn load_all_within_slot(
        &self,
        resource_id: ResourceId,
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError>;

    /// Segments of every child of `parent_id` lying within `slot`.
    fn load_all_by_parent_id_within_slot(
        &self,
        parent_id: ResourceId,
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError>;

    fn resource_ids(&self) -> Result<Vec<ResourceId>, StoreError>;

    fn save_checking_version_single(&self, availability: &mut ResourceAvailability) -> Result<bool, StoreError> {
        let mut group = ResourceGroupedAvailability::new(vec![availability.clone()]);
        if !self.save_checking_version(&mut group)? {
            return Ok(false);
        }
        if let Some(saved) = group.into_availabilities().pop() {
            *availability = saved;
        }
        Ok(true)
    }

    /// First candidate, in the order given, whose covering segments are all free.
    ///
    /// Candidates with no segments in `slot` never qualify. Callers wanting a
    /// random pick shuffle `candidates` themselves.
    fn load_availabilities_of_random_resource_within(
        &self,
        candidates: &[ResourceId],
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError> {
        for &candidate in candidates {
            let group = self.load_all_within_slot(candidate, slot)?;
            if !group.has_no_slots() && group.is_entirely_available() {
                return Ok(group);
            }
        }
        Ok(ResourceGroupedAvailability::empty())
    }
}
