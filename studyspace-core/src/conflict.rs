use chrono::{DateTime, Utc};

use crate::booking::SeatBooking;

/// Half-open interval overlap test. Windows that merely share a boundary
/// do not overlap, so back-to-back reservations are permitted.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Given candidates pre-filtered by the store to `end_time > start`, apply
/// the second half of the overlap test and return the first offender.
pub fn first_overlap<'a>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing: &'a [SeatBooking],
) -> Option<&'a SeatBooking> {
    existing
        .iter()
        .find(|b| overlaps(start, end, b.start_time, b.end_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn overlapping_windows_conflict() {
        assert!(overlaps(at(9), at(13), at(11), at(15)));
        assert!(overlaps(at(11), at(15), at(9), at(13)));
        // containment
        assert!(overlaps(at(9), at(21), at(11), at(13)));
    }

    #[test]
    fn shared_boundary_is_not_a_conflict() {
        assert!(!overlaps(at(9), at(13), at(13), at(17)));
        assert!(!overlaps(at(13), at(17), at(9), at(13)));
    }

    #[test]
    fn disjoint_windows_do_not_conflict() {
        assert!(!overlaps(at(9), at(11), at(13), at(17)));
    }
}
