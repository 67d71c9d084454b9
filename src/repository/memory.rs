use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::grouped::ResourceGroupedAvailability;
use crate::model::{AvailabilityId, Ms, ResourceId, TimeSlot};
use crate::observability;
use crate::segment::ResourceAvailability;

use super::{AvailabilityRepository, StoreError};

pub(super) type SharedSegmentTable = Arc<RwLock<SegmentTable>>;

/// All segments of one resource, keyed by segment start.
#[derive(Debug, Default)]
pub(super) struct SegmentTable {
    parent_id: Option<ResourceId>,
    rows: BTreeMap<Ms, ResourceAvailability>,
}

impl SegmentTable {
    fn within<'a>(&'a self, slot: &'a TimeSlot) -> impl Iterator<Item = &'a ResourceAvailability> + 'a {
        self.rows
            .range(slot.from..slot.to.max(slot.from))
            .map(|(_, row)| row)
            .filter(move |row| row.segment().within(slot))
    }

    /// Rows never overlap each other, so only the last one starting before
    /// `segment.to` can reach into it.
    fn overlaps(&self, segment: &TimeSlot) -> bool {
        self.rows
            .range(..segment.to)
            .next_back()
            .is_some_and(|(_, row)| row.segment().overlaps_with(segment))
    }
}

pub struct InMemoryRepository {
    resources: DashMap<ResourceId, SharedSegmentTable>,
    /// Segment id → (resource id, segment start).
    id_index: DashMap<AvailabilityId, (ResourceId, Ms)>,
    /// Parent → children, for parent-wide lookups.
    children: DashMap<ResourceId, Vec<ResourceId>>,
    /// Serializes provisioning; versioned saves never take it.
    provisioning: Mutex<()>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
            id_index: DashMap::new(),
            children: DashMap::new(),
            provisioning: Mutex::new(()),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.id_index.len()
    }

    fn table(&self, id: &ResourceId) -> Option<SharedSegmentTable> {
        self.resources.get(id).map(|e| e.value().clone())
    }

    fn table_or_create(&self, id: ResourceId) -> SharedSegmentTable {
        self.resources.entry(id).or_default().value().clone()
    }

    fn get_children(&self, parent_id: &ResourceId) -> Vec<ResourceId> {
        let mut kids = self
            .children
            .get(parent_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        kids.sort();
        kids
    }

    fn add_child(&self, parent_id: ResourceId, child_id: ResourceId) {
        let mut kids = self.children.entry(parent_id).or_default();
        if !kids.contains(&child_id) {
            kids.push(child_id);
        }
    }

    fn index_row(&self, row: &ResourceAvailability) {
        self.id_index
            .insert(row.id(), (row.resource_id(), row.segment().from));
    }

    fn place(&self, table: &mut SegmentTable, rid: ResourceId, rows: &[&ResourceAvailability]) {
        for row in rows {
            let mut row = (*row).clone();
            row.rebase();
            if let Some(pid) = row.resource_parent_id() {
                self.add_child(pid, rid);
            }
            table.parent_id = row.resource_parent_id();
            self.index_row(&row);
            table.rows.insert(row.segment().from, row);
        }
    }

    /// Validate and insert new rows. `persist` runs after validation and before
    /// anything becomes visible; its failure aborts the insert.
    pub(super) fn insert_checked(
        &self,
        rows: &[ResourceAvailability],
        persist: impl FnOnce(&[ResourceAvailability]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut by_resource: BTreeMap<ResourceId, Vec<&ResourceAvailability>> = BTreeMap::new();
        for row in rows {
            by_resource.entry(row.resource_id()).or_default().push(row);
        }

        // Tables are created only once the insert is known to succeed, so a
        // rejected provisioning leaves nothing behind.
        let _provisioning = self.provisioning.lock();
        let tables: Vec<(ResourceId, Option<SharedSegmentTable>)> =
            by_resource.keys().map(|rid| (*rid, self.table(rid))).collect();
        // Lock in sorted resource order.
        let mut guards: Vec<_> = tables
            .iter()
            .map(|(_, table)| table.as_ref().map(|t| t.write()))
            .collect();

        let mut seen = HashSet::with_capacity(rows.len());
        for ((rid, _), guard) in tables.iter().zip(guards.iter()) {
            let mut new_rows = by_resource[rid].clone();
            new_rows.sort_by_key(|r| r.segment().from);

            for row in &new_rows {
                if !seen.insert(row.id()) || self.id_index.contains_key(&row.id()) {
                    return Err(StoreError::AlreadyExists(row.id()));
                }
                if let Some(existing) = guard {
                    if !existing.rows.is_empty() && existing.parent_id != row.resource_parent_id() {
                        return Err(StoreError::ParentMismatch { resource_id: *rid });
                    }
                    if existing.overlaps(&row.segment()) {
                        return Err(StoreError::OverlappingSegment {
                            resource_id: *rid,
                            segment: row.segment(),
                        });
                    }
                }
            }
            for pair in new_rows.windows(2) {
                if pair[0].resource_parent_id() != pair[1].resource_parent_id() {
                    return Err(StoreError::ParentMismatch { resource_id: *rid });
                }
                if pair[0].segment().overlaps_with(&pair[1].segment()) {
                    return Err(StoreError::OverlappingSegment {
                        resource_id: *rid,
                        segment: pair[1].segment(),
                    });
                }
            }
        }

        persist(rows)?;

        for ((rid, _), guard) in tables.iter().zip(guards.iter_mut()) {
            match guard {
                Some(existing) => self.place(existing, *rid, &by_resource[rid]),
                None => {
                    let table = self.table_or_create(*rid);
                    self.place(&mut table.write(), *rid, &by_resource[rid]);
                }
            }
        }
        metrics::counter!(observability::SEGMENTS_PROVISIONED_TOTAL).increment(rows.len() as u64);
        Ok(())
    }

    /// Versioned batch write. Returns `Ok(false)` without touching anything if
    /// any row is missing or was changed since it was loaded.
    pub(super) fn compare_and_swap(
        &self,
        rows: &mut [ResourceAvailability],
        persist: impl FnOnce(&[ResourceAvailability]) -> Result<(), StoreError>,
    ) -> Result<bool, StoreError> {
        if rows.is_empty() {
            return Ok(false);
        }
        let mut resource_ids: Vec<ResourceId> = rows.iter().map(|r| r.resource_id()).collect();
        resource_ids.sort();
        resource_ids.dedup();

        let mut tables = Vec::with_capacity(resource_ids.len());
        for rid in &resource_ids {
            match self.table(rid) {
                Some(table) => tables.push(table),
                None => return Ok(false),
            }
        }
        let mut guards: Vec<_> = tables.iter().map(|t| t.write()).collect();
        let slot_of = |rid: ResourceId| resource_ids.binary_search(&rid).unwrap_or_default();

        for row in rows.iter() {
            let guard = &guards[slot_of(row.resource_id())];
            let current = guard.rows.get(&row.segment().from);
            let matches = current.is_some_and(|c| c.id() == row.id() && c.version() == row.loaded_version());
            if !matches {
                metrics::counter!(observability::VERSION_CONFLICTS_TOTAL).increment(1);
                debug!(
                    segment = %row.id(),
                    resource = %row.resource_id(),
                    expected = row.loaded_version(),
                    found = current.map(|c| c.version()),
                    "version conflict, rejecting batch"
                );
                return Ok(false);
            }
        }

        persist(rows)?;

        for row in rows.iter_mut() {
            row.rebase();
            guards[slot_of(row.resource_id())]
                .rows
                .insert(row.segment().from, row.clone());
        }
        Ok(true)
    }

    /// Upsert rows read back from the log. No validation: the log only ever
    /// holds rows that passed it.
    pub(super) fn restore(&self, rows: &[ResourceAvailability]) {
        for row in rows {
            let table = self.table_or_create(row.resource_id());
            self.place(&mut table.write(), row.resource_id(), &[row]);
        }
    }

    /// Every row, ordered by resource then start.
    pub(super) fn snapshot(&self) -> Vec<ResourceAvailability> {
        let mut ids: Vec<ResourceId> = self.resources.iter().map(|e| *e.key()).collect();
        ids.sort();
        let mut rows = Vec::new();
        for rid in ids {
            if let Some(table) = self.table(&rid) {
                rows.extend(table.read().rows.values().cloned());
            }
        }
        rows
    }
}

impl AvailabilityRepository for InMemoryRepository {
    fn save_new(&self, group: &ResourceGroupedAvailability) -> Result<(), StoreError> {
        self.insert_checked(group.availabilities(), |_| Ok(()))
    }

    fn save_checking_version(&self, group: &mut ResourceGroupedAvailability) -> Result<bool, StoreError> {
        self.compare_and_swap(group.availabilities_mut(), |_| Ok(()))
    }

    fn load_by_id(&self, id: AvailabilityId) -> Result<Option<ResourceAvailability>, StoreError> {
        let Some((rid, from)) = self.id_index.get(&id).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self
            .table(&rid)
            .and_then(|table| table.read().rows.get(&from).cloned()))
    }

    fn load_all_within_slot(
        &self,
        resource_id: ResourceId,
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError> {
        let rows = match self.table(&resource_id) {
            Some(table) => table.read().within(slot).cloned().collect(),
            None => Vec::new(),
        };
        Ok(ResourceGroupedAvailability::new(rows))
    }

    fn load_all_by_parent_id_within_slot(
        &self,
        parent_id: ResourceId,
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError> {
        let mut rows = Vec::new();
        for child in self.get_children(&parent_id) {
            if let Some(table) = self.table(&child) {
                rows.extend(table.read().within(slot).cloned());
            }
        }
        Ok(ResourceGroupedAvailability::new(rows))
    }

    fn resource_ids(&self) -> Result<Vec<ResourceId>, StoreError> {
        let tables: Vec<(ResourceId, SharedSegmentTable)> = self
            .resources
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        let mut ids: Vec<ResourceId> = tables
            .into_iter()
            .filter(|(_, table)| !table.read().rows.is_empty())
            .map(|(rid, _)| rid)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
