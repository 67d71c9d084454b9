use std::path::Path;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::grouped::ResourceGroupedAvailability;
use crate::model::{AvailabilityId, ResourceId, StoreRecord, TimeSlot};
use crate::observability;
use crate::segment::ResourceAvailability;
use crate::wal::{Wal, SNAPSHOT_ROWS_PER_RECORD};

use super::memory::InMemoryRepository;
use super::{AvailabilityRepository, StoreError};

/// Segment tables backed by a write-ahead log.
///
/// A commit is validated under the table locks, appended and fsynced, and only
/// then applied in memory. Lock order: `gate` → segment tables → `wal`.
pub struct WalRepository {
    tables: InMemoryRepository,
    wal: Mutex<Wal>,
    /// Commits hold it shared; compaction holds it exclusively so the
    /// snapshot it writes cannot miss a concurrent append.
    gate: RwLock<()>,
}

impl WalRepository {
    /// Open the log at `path`, replaying whatever it holds.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let (wal, records) = Wal::open(path)?;
        let tables = InMemoryRepository::new();
        for record in &records {
            match record {
                StoreRecord::SegmentsInserted { rows } | StoreRecord::SegmentsUpdated { rows } => {
                    tables.restore(rows)
                }
            }
        }
        info!(
            path = %path.display(),
            records = records.len(),
            segments = tables.segment_count(),
            "replayed availability WAL"
        );
        Ok(Self {
            tables,
            wal: Mutex::new(wal),
            gate: RwLock::new(()),
        })
    }

    pub fn segment_count(&self) -> usize {
        self.tables.segment_count()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.wal.lock().appends_since_compact()
    }

    /// Rewrite the log as a snapshot of the current rows.
    pub fn compact(&self) -> Result<(), StoreError> {
        let _exclusive = self.gate.write();
        let rows = self.tables.snapshot();
        let segments = rows.len();
        let records: Vec<StoreRecord> = rows
            .chunks(SNAPSHOT_ROWS_PER_RECORD)
            .map(|chunk| StoreRecord::SegmentsInserted { rows: chunk.to_vec() })
            .collect();
        let mut wal = self.wal.lock();
        wal.compact(&records)?;
        metrics::counter!(observability::WAL_COMPACTIONS_TOTAL).increment(1);
        info!(segments, "compacted availability WAL");
        Ok(())
    }

    fn append(&self, record: StoreRecord) -> Result<(), StoreError> {
        let started = Instant::now();
        let mut wal = self.wal.lock();
        wal.append(&record)?;
        metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(())
    }
}

impl AvailabilityRepository for WalRepository {
    fn save_new(&self, group: &ResourceGroupedAvailability) -> Result<(), StoreError> {
        let _shared = self.gate.read();
        self.tables.insert_checked(group.availabilities(), |rows| {
            self.append(StoreRecord::SegmentsInserted { rows: rows.to_vec() })
        })
    }

    fn save_checking_version(&self, group: &mut ResourceGroupedAvailability) -> Result<bool, StoreError> {
        let _shared = self.gate.read();
        self.tables.compare_and_swap(group.availabilities_mut(), |rows| {
            self.append(StoreRecord::SegmentsUpdated { rows: rows.to_vec() })
        })
    }

    fn load_by_id(&self, id: AvailabilityId) -> Result<Option<ResourceAvailability>, StoreError> {
        self.tables.load_by_id(id)
    }

    fn load_all_within_slot(
        &self,
        resource_id: ResourceId,
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError> {
        self.tables.load_all_within_slot(resource_id, slot)
    }

    fn load_all_by_parent_id_within_slot(
        &self,
        parent_id: ResourceId,
        slot: &TimeSlot,
    ) -> Result<ResourceGroupedAvailability, StoreError> {
        self.tables.load_all_by_parent_id_within_slot(parent_id, slot)
    }

    fn resource_ids(&self) -> Result<Vec<ResourceId>, StoreError> {
        self.tables.resource_ids()
    }
}
