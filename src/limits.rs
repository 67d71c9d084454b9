use crate::model::Ms;

/// Earliest accepted slot bound (unix epoch).
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
/// Latest accepted slot bound (2100-01-01T00:00:00Z).
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;
/// Widest slot a single call may touch: one leap year.
pub const MAX_SLOT_DURATION_MS: Ms = 366 * 24 * 3_600_000;
pub const MAX_SEGMENTS_PER_PROVISION: usize = 100_000;
pub const MAX_CANDIDATE_RESOURCES: usize = 1024;
