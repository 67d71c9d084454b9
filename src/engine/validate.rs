use crate::limits::*;
use crate::model::TimeSlot;

use super::EngineError;

pub(crate) fn validate_slot(slot: &TimeSlot) -> Result<(), EngineError> {
    if slot.from > slot.to {
        return Err(EngineError::MalformedSlot {
            from: slot.from,
            to: slot.to,
        });
    }
    if slot.from < MIN_VALID_TIMESTAMP_MS || slot.to > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if slot.duration() > MAX_SLOT_DURATION_MS {
        return Err(EngineError::LimitExceeded("slot too wide"));
    }
    Ok(())
}

pub(crate) fn validate_candidates(count: usize) -> Result<(), EngineError> {
    if count > MAX_CANDIDATE_RESOURCES {
        return Err(EngineError::LimitExceeded("too many candidate resources"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_slot() {
        assert!(validate_slot(&TimeSlot::new(1_700_000_000_000, 1_700_003_600_000)).is_ok());
        assert!(validate_slot(&TimeSlot::empty_at(0)).is_ok());
    }

    #[test]
    fn rejects_inverted_slot() {
        let slot = TimeSlot { from: 10, to: 5 };
        assert!(matches!(
            validate_slot(&slot),
            Err(EngineError::MalformedSlot { from: 10, to: 5 })
        ));
    }

    #[test]
    fn rejects_out_of_range_and_wide_slots() {
        assert!(matches!(
            validate_slot(&TimeSlot::new(-1, 10)),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(matches!(
            validate_slot(&TimeSlot::new(0, MAX_VALID_TIMESTAMP_MS + 1)),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(matches!(
            validate_slot(&TimeSlot::new(0, MAX_SLOT_DURATION_MS + 1)),
            Err(EngineError::LimitExceeded("slot too wide"))
        ));
    }

    #[test]
    fn candidate_cap() {
        assert!(validate_candidates(MAX_CANDIDATE_RESOURCES).is_ok());
        assert!(validate_candidates(MAX_CANDIDATE_RESOURCES + 1).is_err());
    }
}
