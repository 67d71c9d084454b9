use crate::grid::{self, SegmentDuration};
use crate::ids::IdGenerator;
use crate::model::{Owner, ResourceId, TimeSlot};
use crate::segment::ResourceAvailability;

/// The segments covering one normalized request, mutated as a unit.
///
/// Mutations run over every segment in order. A failed group operation may
/// leave earlier segments changed in memory; such a group must be dropped, not
/// saved. The repository's versioned save is what makes the change atomic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGroupedAvailability {
    availabilities: Vec<ResourceAvailability>,
}

impl ResourceGroupedAvailability {
    pub fn new(availabilities: Vec<ResourceAvailability>) -> Self {
        Self { availabilities }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Fresh, free segments tiling `slot` for a newly provisioned resource.
    pub fn provision(
        resource_id: ResourceId,
        parent_id: Option<ResourceId>,
        slot: &TimeSlot,
        duration: SegmentDuration,
        ids: &dyn IdGenerator,
    ) -> Self {
        let availabilities = grid::split(slot, duration)
            .into_iter()
            .map(|segment| ResourceAvailability::new(ids.next_id(), resource_id, parent_id, segment))
            .collect();
        Self { availabilities }
    }

    pub fn block(&mut self, requester: Owner) -> bool {
        self.apply(|a| a.block(requester))
    }

    pub fn disable(&mut self, requester: Owner) -> bool {
        self.apply(|a| a.disable(requester))
    }

    pub fn release(&mut self, requester: Owner) -> bool {
        self.apply(|a| a.release(requester))
    }

    fn apply(&mut self, mut op: impl FnMut(&mut ResourceAvailability) -> bool) -> bool {
        for availability in &mut self.availabilities {
            if !op(availability) {
                return false;
            }
        }
        true
    }

    pub fn has_no_slots(&self) -> bool {
        self.availabilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.availabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.availabilities.is_empty()
    }

    /// Resource of the first segment; `None` for an empty group.
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.availabilities.first().map(|a| a.resource_id())
    }

    pub fn blocked_entirely_by(&self, owner: Owner) -> bool {
        self.availabilities
            .iter()
            .all(|a| a.blocked_by() == Some(owner))
    }

    pub fn is_disabled_entirely_by(&self, owner: Owner) -> bool {
        self.availabilities.iter().all(|a| a.is_disabled_by(owner))
    }

    pub fn is_entirely_available(&self) -> bool {
        self.availabilities.iter().all(|a| a.is_free())
    }

    /// Distinct holders in first-seen order; `None` stands for free segments.
    pub fn owners(&self) -> Vec<Option<Owner>> {
        let mut owners = Vec::new();
        for holder in self.availabilities.iter().map(|a| a.blocked_by()) {
            if !owners.contains(&holder) {
                owners.push(holder);
            }
        }
        owners
    }

    pub fn find_blocked_by(&self, owner: Owner) -> Vec<&ResourceAvailability> {
        self.availabilities
            .iter()
            .filter(|a| a.blocked_by() == Some(owner))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceAvailability> {
        self.availabilities.iter()
    }

    pub fn availabilities(&self) -> &[ResourceAvailability] {
        &self.availabilities
    }

    pub(crate) fn availabilities_mut(&mut self) -> &mut [ResourceAvailability] {
        &mut self.availabilities
    }

    pub fn into_availabilities(self) -> Vec<ResourceAvailability> {
        self.availabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::model::MINUTE_MS;

    const M: i64 = MINUTE_MS;

    fn four_segments() -> ResourceGroupedAvailability {
        ResourceGroupedAvailability::provision(
            ResourceId::new(),
            None,
            &TimeSlot::new(0, 120 * M),
            SegmentDuration::minutes(30).unwrap(),
            &SequentialIds::new(),
        )
    }

    #[test]
    fn provision_splits_into_segments() {
        let parent = ResourceId::new();
        let rid = ResourceId::new();
        let group = ResourceGroupedAvailability::provision(
            rid,
            Some(parent),
            &TimeSlot::new(0, 60 * M),
            SegmentDuration::minutes(15).unwrap(),
            &SequentialIds::new(),
        );
        assert_eq!(group.len(), 4);
        assert_eq!(group.resource_id(), Some(rid));
        assert!(group.iter().all(|a| a.resource_parent_id() == Some(parent)));
        assert!(group.is_entirely_available());
        assert_eq!(group.availabilities()[3].segment(), TimeSlot::new(45 * M, 60 * M));
    }

    #[test]
    fn empty_group_has_no_slots() {
        let group = ResourceGroupedAvailability::empty();
        assert!(group.has_no_slots());
        assert_eq!(group.resource_id(), None);
        assert!(group.owners().is_empty());
    }

    #[test]
    fn block_whole_group() {
        let mut group = four_segments();
        let x = Owner::new();
        assert!(group.block(x));
        assert!(group.blocked_entirely_by(x));
        assert!(!group.is_entirely_available());
        assert_eq!(group.owners(), vec![Some(x)]);
        assert_eq!(group.find_blocked_by(x).len(), 4);
    }

    #[test]
    fn one_contended_segment_fails_the_group() {
        let mut group = four_segments();
        let x = Owner::new();
        let y = Owner::new();
        assert!(group.availabilities_mut()[2].block(x));

        assert!(!group.block(y));
        assert!(!group.blocked_entirely_by(y));
        assert_eq!(group.availabilities()[2].blocked_by(), Some(x));
    }

    #[test]
    fn release_needs_every_segment() {
        let mut group = four_segments();
        let x = Owner::new();
        let y = Owner::new();
        assert!(group.block(x));
        assert!(!group.release(y));
        assert!(group.release(x));
        assert!(group.is_entirely_available());
    }

    #[test]
    fn disable_entire_group() {
        let mut group = four_segments();
        let o = Owner::new();
        assert!(group.disable(o));
        assert!(group.is_disabled_entirely_by(o));
        assert!(group.blocked_entirely_by(o));
        assert!(!group.block(Owner::new()));
    }

    #[test]
    fn owners_are_distinct_in_first_seen_order() {
        let mut group = four_segments();
        let x = Owner::new();
        let y = Owner::new();
        let segs = group.availabilities_mut();
        assert!(segs[1].block(y));
        assert!(segs[2].block(x));
        assert!(segs[3].block(y));

        assert_eq!(group.owners(), vec![None, Some(y), Some(x)]);
        let by_y: Vec<_> = group.find_blocked_by(y).iter().map(|a| a.segment()).collect();
        assert_eq!(by_y, vec![TimeSlot::new(30 * M, 60 * M), TimeSlot::new(90 * M, 120 * M)]);
    }

    #[test]
    fn predicates_on_partial_holds() {
        let mut group = four_segments();
        let x = Owner::new();
        assert!(group.availabilities_mut()[0].disable(x));
        assert!(!group.is_disabled_entirely_by(x));
        assert!(!group.blocked_entirely_by(x));
        assert!(!group.is_entirely_available());
    }
}
