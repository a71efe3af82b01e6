use common::domain::{Direction, ReadContext};

const ENTRY_ANTENNA: u16 = 1;
const EXIT_ANTENNA: u16 = 2;

/// Infer direction of travel from the first and last read of a buffer.
///
/// Only the two boundary observations matter; reads in between are ignored.
/// Ties on timestamp keep arrival order, so the earliest-arriving of the
/// oldest reads is `first` and the latest-arriving of the newest is `last`.
pub fn infer_direction(reads: &[ReadContext]) -> Direction {
    let (Some(first), Some(last)) = (
        reads.iter().min_by_key(|read| read.timestamp),
        reads.iter().max_by_key(|read| read.timestamp),
    ) else {
        return Direction::Unknown;
    };

    direction_between(first.antenna_id, last.antenna_id)
}

fn direction_between(first: u16, last: u16) -> Direction {
    match (first, last) {
        (ENTRY_ANTENNA, EXIT_ANTENNA) => Direction::In,
        (EXIT_ANTENNA, ENTRY_ANTENNA) => Direction::Out,
        (from, to) if from != to => Direction::Transition { from, to },
        // Stationary or single read
        (ENTRY_ANTENNA, _) => Direction::In,
        (EXIT_ANTENNA, _) => Direction::Out,
        _ => Direction::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use common::domain::AssetPolicyClass;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 6, 8, 0, 0).unwrap()
    }

    fn read(antenna_id: u16, offset_secs: i64) -> ReadContext {
        ReadContext {
            asset_id: "asset-1".to_string(),
            policy_class: AssetPolicyClass::Normal,
            epc: "E200AA".to_string(),
            antenna_id,
            timestamp: t0() + Duration::seconds(offset_secs),
            reader_id: "fx-1".to_string(),
            gate_id: "gate-1".to_string(),
        }
    }

    #[test]
    fn test_antenna_one_then_two_is_in() {
        assert_eq!(infer_direction(&[read(1, 0), read(2, 1)]), Direction::In);
    }

    #[test]
    fn test_antenna_two_then_one_is_out() {
        assert_eq!(infer_direction(&[read(2, 0), read(1, 1)]), Direction::Out);
    }

    #[test]
    fn test_single_reads() {
        assert_eq!(infer_direction(&[read(1, 0)]), Direction::In);
        assert_eq!(infer_direction(&[read(2, 0)]), Direction::Out);
        assert_eq!(infer_direction(&[read(3, 0)]), Direction::Unknown);
    }

    #[test]
    fn test_other_antenna_pairs_are_transitions() {
        assert_eq!(
            infer_direction(&[read(3, 0), read(4, 1)]),
            Direction::Transition { from: 3, to: 4 }
        );
        assert_eq!(
            infer_direction(&[read(1, 0), read(3, 1)]),
            Direction::Transition { from: 1, to: 3 }
        );
    }

    #[test]
    fn test_order_is_by_timestamp_not_arrival() {
        // Arrived out of order: antenna 2 was actually seen first
        assert_eq!(infer_direction(&[read(1, 5), read(2, 0)]), Direction::Out);
    }

    #[test]
    fn test_intermediate_reads_do_not_affect_direction() {
        let reads = vec![read(1, 0), read(2, 1), read(3, 2), read(1, 3)];
        // first and last both antenna 1: stationary, defaults to IN
        assert_eq!(infer_direction(&reads), Direction::In);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        assert_eq!(infer_direction(&[read(2, 0), read(1, 0)]), Direction::Out);
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(infer_direction(&[]), Direction::Unknown);
    }
}
