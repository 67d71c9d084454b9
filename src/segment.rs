use serde::{Deserialize, Serialize};

use crate::model::{AvailabilityId, Blockade, Owner, ResourceId, TimeSlot};

/// One grid cell of one resource: the unit of storage and locking.
///
/// `version` is bumped once per accepted in-memory mutation. `loaded_version`
/// is the version the record had when it was read from the repository, and is
/// what a versioned save compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAvailability {
    id: AvailabilityId,
    resource_id: ResourceId,
    resource_parent_id: Option<ResourceId>,
    segment: TimeSlot,
    blockade: Blockade,
    version: u64,
    loaded_version: u64,
}

impl ResourceAvailability {
    pub fn new(
        id: AvailabilityId,
        resource_id: ResourceId,
        resource_parent_id: Option<ResourceId>,
        segment: TimeSlot,
    ) -> Self {
        Self::with_state(id, resource_id, resource_parent_id, segment, Blockade::none(), 0)
    }

    pub fn with_state(
        id: AvailabilityId,
        resource_id: ResourceId,
        resource_parent_id: Option<ResourceId>,
        segment: TimeSlot,
        blockade: Blockade,
        version: u64,
    ) -> Self {
        Self {
            id,
            resource_id,
            resource_parent_id,
            segment,
            blockade,
            version,
            loaded_version: version,
        }
    }

    pub fn id(&self) -> AvailabilityId {
        self.id
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn resource_parent_id(&self) -> Option<ResourceId> {
        self.resource_parent_id
    }

    pub fn segment(&self) -> TimeSlot {
        self.segment
    }

    pub fn blockade(&self) -> Blockade {
        self.blockade
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_version(&self) -> u64 {
        self.loaded_version
    }

    /// True when the in-memory state diverges from what was loaded.
    pub fn is_dirty(&self) -> bool {
        self.version != self.loaded_version
    }

    /// Treat the current state as persisted.
    pub(crate) fn rebase(&mut self) {
        self.loaded_version = self.version;
    }

    pub fn blocked_by(&self) -> Option<Owner> {
        self.blockade.taken_by()
    }

    pub fn is_free(&self) -> bool {
        self.blockade == Blockade::Free
    }

    pub fn is_disabled(&self) -> bool {
        self.blockade.is_disabled()
    }

    pub fn is_disabled_by(&self, owner: Owner) -> bool {
        self.blockade.is_disabled_by(owner)
    }

    pub fn is_available_for(&self, requester: Owner) -> bool {
        self.blockade.can_be_taken_by(requester)
    }

    pub fn block(&mut self, requester: Owner) -> bool {
        if !self.is_available_for(requester) {
            return false;
        }
        self.transition(Blockade::owned_by(requester));
        true
    }

    pub fn disable(&mut self, requester: Owner) -> bool {
        if !self.is_available_for(requester) {
            return false;
        }
        self.transition(Blockade::disabled_by(requester));
        true
    }

    /// Free segments release trivially; held ones only for their holder.
    pub fn release(&mut self, requester: Owner) -> bool {
        if !self.is_available_for(requester) {
            return false;
        }
        self.transition(Blockade::none());
        true
    }

    fn transition(&mut self, to: Blockade) {
        self.blockade = to;
        self.version += 1;
    }
}
