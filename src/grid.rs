//! Fixed-duration segment grid anchored at the Unix epoch.
//!
//! Rounding rule: `from` is floored and `to` is ceiled to the nearest grid
//! boundary. A request shorter than one segment after rounding (including an
//! empty one) becomes the single segment starting at the floored `from`. Both
//! read and write paths go through [`normalize_to_segment_boundaries`].

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::model::{Ms, TimeSlot, MINUTE_MS};

pub const DEFAULT_SEGMENT_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentDuration(Ms);

impl SegmentDuration {
    pub fn new(ms: Ms) -> Result<Self, EngineError> {
        if ms <= 0 {
            return Err(EngineError::InvalidSegmentDuration(ms));
        }
        Ok(Self(ms))
    }

    pub fn minutes(minutes: i64) -> Result<Self, EngineError> {
        let ms = minutes
            .checked_mul(MINUTE_MS)
            .ok_or(EngineError::InvalidSegmentDuration(Ms::MAX))?;
        Self::new(ms)
    }

    pub fn as_ms(&self) -> Ms {
        self.0
    }
}

impl Default for SegmentDuration {
    fn default() -> Self {
        Self(DEFAULT_SEGMENT_MINUTES * MINUTE_MS)
    }
}

fn floor_to(t: Ms, unit: Ms) -> Ms {
    t.div_euclid(unit) * unit
}

fn ceil_to(t: Ms, unit: Ms) -> Ms {
    let floored = floor_to(t, unit);
    if floored == t { t } else { floored + unit }
}

pub fn normalize_to_segment_boundaries(slot: &TimeSlot, duration: SegmentDuration) -> TimeSlot {
    let unit = duration.as_ms();
    let from = floor_to(slot.from, unit);
    let to = ceil_to(slot.to, unit);
    let minimal = TimeSlot::new(from, from + unit);
    let normalized = TimeSlot::new(from, to.max(from));
    if normalized.within(&minimal) {
        minimal
    } else {
        normalized
    }
}

/// Tiles the normalized slot with consecutive segments of exactly `duration`.
pub fn split(slot: &TimeSlot, duration: SegmentDuration) -> Vec<TimeSlot> {
    let unit = duration.as_ms();
    let normalized = normalize_to_segment_boundaries(slot, duration);
    let count = (normalized.duration() / unit) as usize;
    (0..count)
        .map(|i| {
            let from = normalized.from + (i as Ms) * unit;
            TimeSlot::new(from, from + unit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: Ms = MINUTE_MS;

    fn thirty() -> SegmentDuration {
        SegmentDuration::minutes(30).unwrap()
    }

    #[test]
    fn duration_must_be_positive() {
        assert!(matches!(SegmentDuration::new(0), Err(EngineError::InvalidSegmentDuration(0))));
        assert!(SegmentDuration::new(-5).is_err());
        assert!(SegmentDuration::minutes(i64::MAX).is_err());
        assert_eq!(SegmentDuration::default().as_ms(), 15 * M);
    }

    #[test]
    fn aligned_slot_is_unchanged() {
        let slot = TimeSlot::new(60 * M, 120 * M);
        assert_eq!(normalize_to_segment_boundaries(&slot, thirty()), slot);
    }

    #[test]
    fn rounds_outward() {
        let slot = TimeSlot::new(40 * M, 95 * M);
        assert_eq!(
            normalize_to_segment_boundaries(&slot, thirty()),
            TimeSlot::new(30 * M, 120 * M)
        );
    }

    #[test]
    fn sub_segment_request_inside_one_cell() {
        let slot = TimeSlot::new(31 * M, 32 * M);
        assert_eq!(
            normalize_to_segment_boundaries(&slot, thirty()),
            TimeSlot::new(30 * M, 60 * M)
        );
    }

    #[test]
    fn empty_request_becomes_one_segment() {
        let on_boundary = TimeSlot::empty_at(60 * M);
        assert_eq!(
            normalize_to_segment_boundaries(&on_boundary, thirty()),
            TimeSlot::new(60 * M, 90 * M)
        );
        let off_boundary = TimeSlot::empty_at(70 * M);
        assert_eq!(
            normalize_to_segment_boundaries(&off_boundary, thirty()),
            TimeSlot::new(60 * M, 90 * M)
        );
    }

    #[test]
    fn sub_segment_request_straddling_a_boundary() {
        let slot = TimeSlot::new(59 * M, 61 * M);
        assert_eq!(
            normalize_to_segment_boundaries(&slot, thirty()),
            TimeSlot::new(30 * M, 90 * M)
        );
    }

    #[test]
    fn negative_timestamps_floor_toward_minus_infinity() {
        let slot = TimeSlot::new(-10 * M, 5 * M);
        assert_eq!(
            normalize_to_segment_boundaries(&slot, thirty()),
            TimeSlot::new(-30 * M, 30 * M)
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let slot = TimeSlot::new(7 * M, 101 * M);
        let once = normalize_to_segment_boundaries(&slot, thirty());
        assert_eq!(normalize_to_segment_boundaries(&once, thirty()), once);
    }

    #[test]
    fn split_tiles_exactly() {
        let slot = TimeSlot::new(0, 120 * M);
        let parts = split(&slot, thirty());
        assert_eq!(
            parts,
            vec![
                TimeSlot::new(0, 30 * M),
                TimeSlot::new(30 * M, 60 * M),
                TimeSlot::new(60 * M, 90 * M),
                TimeSlot::new(90 * M, 120 * M),
            ]
        );
    }

    #[test]
    fn split_normalize_round_trip() {
        let durations = [1, 7, 15, 30, 60];
        let slots = [(0, 1), (3, 200), (59, 61), (-45, 13), (100, 100)];
        for minutes in durations {
            let d = SegmentDuration::minutes(minutes).unwrap();
            for (from, to) in slots {
                let requested = TimeSlot::new(from * M, to * M);
                let normalized = normalize_to_segment_boundaries(&requested, d);
                let parts = split(&normalized, d);

                assert!(!parts.is_empty());
                assert_eq!(parts.first().unwrap().from, normalized.from);
                assert_eq!(parts.last().unwrap().to, normalized.to);
                for part in &parts {
                    assert_eq!(part.duration(), d.as_ms());
                }
                for pair in parts.windows(2) {
                    assert_eq!(pair[0].to, pair[1].from);
                    assert!(!pair[0].overlaps_with(&pair[1]));
                }
            }
        }
    }

    #[test]
    fn split_normalizes_unaligned_input() {
        let parts = split(&TimeSlot::new(10 * M, 50 * M), thirty());
        assert_eq!(parts, vec![TimeSlot::new(0, 30 * M), TimeSlot::new(30 * M, 60 * M)]);
    }
}
