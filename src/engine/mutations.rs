use tracing::{debug, info};

use crate::grouped::ResourceGroupedAvailability;
use crate::limits::*;
use crate::model::{AvailabilityEvent, Owner, ResourceId, TimeSlot};
use crate::observability;

use super::validate::validate_candidates;
use super::{Engine, EngineError};

/// The three segment-state mutations the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Block,
    Release,
    Disable,
}

impl Mutation {
    pub fn label(self) -> &'static str {
        match self {
            Mutation::Block => "block",
            Mutation::Release => "release",
            Mutation::Disable => "disable",
        }
    }

    fn apply(self, group: &mut ResourceGroupedAvailability, requester: Owner) -> bool {
        match self {
            Mutation::Block => group.block(requester),
            Mutation::Release => group.release(requester),
            Mutation::Disable => group.disable(requester),
        }
    }
}

fn record_outcome(op: &'static str, accepted: bool) {
    metrics::counter!(
        observability::MUTATIONS_TOTAL,
        "op" => op,
        "outcome" => observability::outcome_label(accepted)
    )
    .increment(1);
}

impl Engine {
    // ── Provisioning ─────────────────────────────────────────

    /// Create free segments tiling `slot` for `resource_id`. Returns how many
    /// were created.
    pub fn create_resource_slots(
        &self,
        resource_id: ResourceId,
        parent_id: Option<ResourceId>,
        slot: TimeSlot,
    ) -> Result<usize, EngineError> {
        let normalized = self.normalize(&slot)?;
        let count = normalized.duration() / self.segment.as_ms();
        if count > MAX_SEGMENTS_PER_PROVISION as i64 {
            return Err(EngineError::LimitExceeded("too many segments in one provisioning call"));
        }
        let group = ResourceGroupedAvailability::provision(
            resource_id,
            parent_id,
            &normalized,
            self.segment,
            self.ids.as_ref(),
        );
        self.repository.save_new(&group)?;
        info!(
            resource = %resource_id,
            parent = ?parent_id.map(|p| p.to_string()),
            slot = %normalized,
            segments = group.len(),
            "provisioned resource slots"
        );
        Ok(group.len())
    }

    // ── Segment state ────────────────────────────────────────

    pub fn block(&self, resource_id: ResourceId, slot: TimeSlot, requester: Owner) -> Result<bool, EngineError> {
        self.mutate(Mutation::Block, resource_id, slot, requester)
    }

    pub fn release(&self, resource_id: ResourceId, slot: TimeSlot, requester: Owner) -> Result<bool, EngineError> {
        self.mutate(Mutation::Release, resource_id, slot, requester)
    }

    /// Take the range over for `requester`, regardless of who may block it
    /// later. Segments held by someone else make it fail.
    pub fn disable(&self, resource_id: ResourceId, slot: TimeSlot, requester: Owner) -> Result<bool, EngineError> {
        self.mutate(Mutation::Disable, resource_id, slot, requester)
    }

    /// Normalize, load, mutate and save under the version check.
    pub fn mutate(
        &self,
        op: Mutation,
        resource_id: ResourceId,
        slot: TimeSlot,
        requester: Owner,
    ) -> Result<bool, EngineError> {
        let normalized = self.normalize(&slot)?;
        let mut group = self.repository.load_all_within_slot(resource_id, &normalized)?;
        if group.has_no_slots() {
            debug!(resource = %resource_id, slot = %normalized, op = op.label(), "no segments in range");
            record_outcome(op.label(), false);
            return Ok(false);
        }

        let previous_owners = group.owners();
        let accepted = op.apply(&mut group, requester) && self.repository.save_checking_version(&mut group)?;
        record_outcome(op.label(), accepted);
        if !accepted {
            debug!(resource = %resource_id, slot = %normalized, op = op.label(), %requester, "mutation rejected");
            return Ok(false);
        }

        let occurred_at = self.clock.now();
        let event = match op {
            Mutation::Block => AvailabilityEvent::SlotsBlocked {
                resource_id,
                owner: requester,
                slot: normalized,
                occurred_at,
            },
            Mutation::Release => AvailabilityEvent::SlotsReleased {
                resource_id,
                owner: requester,
                slot: normalized,
                occurred_at,
            },
            Mutation::Disable => {
                info!(resource = %resource_id, slot = %normalized, %requester, "resource taken over");
                AvailabilityEvent::ResourceTakenOver {
                    resource_id,
                    previous_owners,
                    slot: normalized,
                    occurred_at,
                }
            }
        };
        self.notify.send(&event);
        Ok(true)
    }

    /// Block the first candidate whose whole range is free. Returns the chosen
    /// resource, or `None` when no candidate qualifies or the pick lost a race.
    pub fn block_random_available(
        &self,
        candidates: &[ResourceId],
        slot: TimeSlot,
        requester: Owner,
    ) -> Result<Option<ResourceId>, EngineError> {
        validate_candidates(candidates.len())?;
        let normalized = self.normalize(&slot)?;
        let mut group = self
            .repository
            .load_availabilities_of_random_resource_within(candidates, &normalized)?;
        let Some(resource_id) = group.resource_id() else {
            record_outcome("block_random", false);
            return Ok(None);
        };

        let accepted = group.block(requester) && self.repository.save_checking_version(&mut group)?;
        record_outcome("block_random", accepted);
        if !accepted {
            debug!(resource = %resource_id, slot = %normalized, %requester, "random pick lost the race");
            return Ok(None);
        }

        self.notify.send(&AvailabilityEvent::SlotsBlocked {
            resource_id,
            owner: requester,
            slot: normalized,
            occurred_at: self.clock.now(),
        });
        Ok(Some(resource_id))
    }
}
