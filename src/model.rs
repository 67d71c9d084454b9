use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::segment::ResourceAvailability;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;

// ── Time interval algebra ────────────────────────────────────────

/// Half-open interval `[from, to)`. `from == to` is the canonical empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub from: Ms,
    pub to: Ms,
}

impl TimeSlot {
    /// Panics if `from > to`. Use [`TimeSlot::try_new`] for untrusted input.
    pub fn new(from: Ms, to: Ms) -> Self {
        assert!(from <= to, "TimeSlot from must not be after to");
        Self { from, to }
    }

    pub fn try_new(from: Ms, to: Ms) -> Result<Self, EngineError> {
        if from > to {
            return Err(EngineError::MalformedSlot { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn empty_at(at: Ms) -> Self {
        Self { from: at, to: at }
    }

    pub fn duration(&self) -> Ms {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps_with(&self, other: &TimeSlot) -> bool {
        self.from < other.to && self.to > other.from
    }

    /// Returns true if `self` lies inside `other`, inclusive of equal endpoints.
    pub fn within(&self, other: &TimeSlot) -> bool {
        other.from <= self.from && self.to <= other.to
    }

    pub fn common_part_with(&self, other: &TimeSlot) -> TimeSlot {
        if !self.overlaps_with(other) {
            return TimeSlot::empty_at(self.from);
        }
        TimeSlot::new(self.from.max(other.from), self.to.min(other.to))
    }

    /// Fragments of the symmetric difference, left to right.
    ///
    /// Identical slots leave nothing; disjoint slots come back as `[self, other]`.
    pub fn leftover_after_removing_common_with(&self, other: &TimeSlot) -> Vec<TimeSlot> {
        if self == other {
            return Vec::new();
        }
        if !self.overlaps_with(other) {
            return vec![*self, *other];
        }
        let mut result = Vec::with_capacity(2);
        let (left_start, left_end) = (self.from.min(other.from), self.from.max(other.from));
        if left_start < left_end {
            result.push(TimeSlot::new(left_start, left_end));
        }
        let (right_start, right_end) = (self.to.min(other.to), self.to.max(other.to));
        if right_start < right_end {
            result.push(TimeSlot::new(right_start, right_end));
        }
        result
    }

    /// Pads both ends by `amount`. A negative amount shrinks the slot and
    /// fails once the ends would cross.
    pub fn stretch(&self, amount: Ms) -> Result<TimeSlot, EngineError> {
        let from = self.from.checked_sub(amount);
        let to = self.to.checked_add(amount);
        match (from, to) {
            (Some(from), Some(to)) => TimeSlot::try_new(from, to),
            _ => Err(EngineError::LimitExceeded("stretched slot overflows the timestamp range")),
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

// ── Identities ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub Ulid);

impl ResourceId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of one persisted segment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AvailabilityId(pub Ulid);

impl fmt::Display for AvailabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A concrete holder. "No owner" is `Option::<Owner>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Owner(pub Ulid);

impl Owner {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Blockade ─────────────────────────────────────────────────────

/// Ownership state of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Blockade {
    #[default]
    Free,
    Owned(Owner),
    Disabled(Owner),
}

impl Blockade {
    pub fn none() -> Self {
        Blockade::Free
    }

    pub fn owned_by(owner: Owner) -> Self {
        Blockade::Owned(owner)
    }

    pub fn disabled_by(owner: Owner) -> Self {
        Blockade::Disabled(owner)
    }

    pub fn taken_by(&self) -> Option<Owner> {
        match self {
            Blockade::Free => None,
            Blockade::Owned(owner) | Blockade::Disabled(owner) => Some(*owner),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Blockade::Disabled(_))
    }

    /// Free segments admit anyone; held ones admit only their holder.
    pub fn can_be_taken_by(&self, requester: Owner) -> bool {
        match self {
            Blockade::Free => true,
            Blockade::Owned(owner) | Blockade::Disabled(owner) => *owner == requester,
        }
    }

    pub fn is_disabled_by(&self, owner: Owner) -> bool {
        matches!(self, Blockade::Disabled(by) if *by == owner)
    }
}

// ── Domain events (published, never persisted) ───────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityEvent {
    SlotsBlocked {
        resource_id: ResourceId,
        owner: Owner,
        slot: TimeSlot,
        occurred_at: Ms,
    },
    SlotsReleased {
        resource_id: ResourceId,
        owner: Owner,
        slot: TimeSlot,
        occurred_at: Ms,
    },
    /// A disable displaced whoever held the range before.
    ResourceTakenOver {
        resource_id: ResourceId,
        previous_owners: Vec<Option<Owner>>,
        slot: TimeSlot,
        occurred_at: Ms,
    },
}

impl AvailabilityEvent {
    pub fn resource_id(&self) -> ResourceId {
        match self {
            AvailabilityEvent::SlotsBlocked { resource_id, .. }
            | AvailabilityEvent::SlotsReleased { resource_id, .. }
            | AvailabilityEvent::ResourceTakenOver { resource_id, .. } => *resource_id,
        }
    }
}

// ── Storage records ──────────────────────────────────────────────

/// The WAL record format. Row images, not domain events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreRecord {
    SegmentsInserted { rows: Vec<ResourceAvailability> },
    SegmentsUpdated { rows: Vec<ResourceAvailability> },
}
