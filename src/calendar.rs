use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Owner, ResourceId, TimeSlot};
use crate::repository::{AvailabilityRepository, StoreError};
use crate::segment::ResourceAvailability;

/// Key under which free time is listed.
pub const NONE_KEY: &str = "none";

/// Read-only view of one resource: holder key → merged slots.
///
/// Holder keys are the owner's ULID string, or [`NONE_KEY`] for free time.
/// Derived state only; never a basis for mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Calendar {
    pub resource_id: ResourceId,
    pub calendar: HashMap<String, Vec<TimeSlot>>,
}

impl Calendar {
    /// Build from segments sorted by start.
    pub fn from_segments<'a>(
        resource_id: ResourceId,
        segments: impl IntoIterator<Item = &'a ResourceAvailability>,
    ) -> Self {
        let mut calendar: HashMap<String, Vec<TimeSlot>> = HashMap::new();
        for availability in segments {
            let key = holder_key(availability.blocked_by());
            let segment = availability.segment();
            let slots = calendar.entry(key).or_default();
            match slots.last_mut() {
                Some(last) if last.to == segment.from => last.to = segment.to,
                _ => slots.push(segment),
            }
        }
        Self { resource_id, calendar }
    }

    pub fn available_slots(&self) -> &[TimeSlot] {
        self.calendar.get(NONE_KEY).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn taken_by(&self, owner: Owner) -> &[TimeSlot] {
        self.calendar
            .get(&owner.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn holder_key(owner: Option<Owner>) -> String {
    owner.map_or_else(|| NONE_KEY.to_string(), |o| o.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Calendars {
    pub calendars: HashMap<ResourceId, Calendar>,
}

impl Calendars {
    pub fn get(&self, resource_id: &ResourceId) -> Option<&Calendar> {
        self.calendars.get(resource_id)
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }
}

/// Calendar of segments lying within `slot`. `slot` is used as given.
pub fn load(
    repository: &dyn AvailabilityRepository,
    resource_id: ResourceId,
    slot: &TimeSlot,
) -> Result<Calendar, StoreError> {
    let group = repository.load_all_within_slot(resource_id, slot)?;
    Ok(Calendar::from_segments(resource_id, group.iter()))
}

/// One calendar per requested resource; unknown resources get an empty one.
pub fn load_all(
    repository: &dyn AvailabilityRepository,
    resource_ids: &[ResourceId],
    slot: &TimeSlot,
) -> Result<Calendars, StoreError> {
    let mut calendars = HashMap::with_capacity(resource_ids.len());
    for &resource_id in resource_ids {
        calendars.insert(resource_id, load(repository, resource_id, slot)?);
    }
    Ok(Calendars { calendars })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SegmentDuration;
    use crate::grouped::ResourceGroupedAvailability;
    use crate::ids::UlidGenerator;
    use crate::model::MINUTE_MS;
    use crate::repository::InMemoryRepository;

    const M: i64 = MINUTE_MS;

    fn provisioned(repo: &InMemoryRepository, slot: TimeSlot) -> ResourceId {
        let rid = ResourceId::new();
        let group = ResourceGroupedAvailability::provision(
            rid,
            None,
            &slot,
            SegmentDuration::minutes(15).unwrap(),
            &UlidGenerator,
        );
        repo.save_new(&group).unwrap();
        rid
    }

    fn take(repo: &InMemoryRepository, rid: ResourceId, slot: TimeSlot, owner: Owner) {
        let mut group = repo.load_all_within_slot(rid, &slot).unwrap();
        assert!(group.block(owner));
        assert!(repo.save_checking_version(&mut group).unwrap());
    }

    #[test]
    fn free_resource_is_one_merged_slot() {
        let repo = InMemoryRepository::new();
        let rid = provisioned(&repo, TimeSlot::new(0, 120 * M));
        let cal = load(&repo, rid, &TimeSlot::new(0, 120 * M)).unwrap();
        assert_eq!(cal.calendar.len(), 1);
        assert_eq!(cal.available_slots(), &[TimeSlot::new(0, 120 * M)]);
    }

    #[test]
    fn holders_split_the_calendar() {
        let repo = InMemoryRepository::new();
        let rid = provisioned(&repo, TimeSlot::new(0, 120 * M));
        let x = Owner::new();
        let y = Owner::new();
        take(&repo, rid, TimeSlot::new(15 * M, 45 * M), x);
        take(&repo, rid, TimeSlot::new(90 * M, 105 * M), x);
        take(&repo, rid, TimeSlot::new(45 * M, 60 * M), y);

        let cal = load(&repo, rid, &TimeSlot::new(0, 120 * M)).unwrap();
        assert_eq!(
            cal.available_slots(),
            &[
                TimeSlot::new(0, 15 * M),
                TimeSlot::new(60 * M, 90 * M),
                TimeSlot::new(105 * M, 120 * M)
            ]
        );
        assert_eq!(
            cal.taken_by(x),
            &[TimeSlot::new(15 * M, 45 * M), TimeSlot::new(90 * M, 105 * M)]
        );
        assert_eq!(cal.taken_by(y), &[TimeSlot::new(45 * M, 60 * M)]);
        assert!(cal.taken_by(Owner::new()).is_empty());
    }

    #[test]
    fn serializes_keyed_by_holder() {
        let repo = InMemoryRepository::new();
        let rid = provisioned(&repo, TimeSlot::new(0, 30 * M));
        let x = Owner::new();
        take(&repo, rid, TimeSlot::new(15 * M, 30 * M), x);

        let json = serde_json::to_value(load(&repo, rid, &TimeSlot::new(0, 30 * M)).unwrap()).unwrap();
        assert_eq!(json["resource_id"], serde_json::json!(rid.to_string()));
        assert_eq!(json["calendar"]["none"], serde_json::json!([{ "from": 0, "to": 15 * M }]));
        assert_eq!(
            json["calendar"][x.to_string()],
            serde_json::json!([{ "from": 15 * M, "to": 30 * M }])
        );
    }

    #[test]
    fn load_all_covers_unknown_resources() {
        let repo = InMemoryRepository::new();
        let a = provisioned(&repo, TimeSlot::new(0, 30 * M));
        let unknown = ResourceId::new();
        let cals = load_all(&repo, &[a, unknown], &TimeSlot::new(0, 30 * M)).unwrap();
        assert_eq!(cals.len(), 2);
        assert_eq!(cals.get(&a).unwrap().available_slots(), &[TimeSlot::new(0, 30 * M)]);
        assert!(cals.get(&unknown).unwrap().calendar.is_empty());
    }
}
