use chrono::{DateTime, Utc};

use crate::types::HeartRateSample;

/// Heart rate in effect at each of `times`.
///
/// Reading `r[i]` covers the half-open interval `[r[i].time, r[i+1].time)`.
/// Times before the first reading, or at/after the last one, get `None`.
/// Both inputs must be sorted ascending; a single forward pass walks them.
pub fn assign_heart_rate(times: &[DateTime<Utc>], readings: &[HeartRateSample]) -> Vec<Option<u16>> {
    debug_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    debug_assert!(readings.windows(2).all(|w| w[0].time <= w[1].time));

    if readings.len() < 2 {
        return vec![None; times.len()];
    }

    let last = readings.len() - 1;
    let mut current = 0usize;
    times
        .iter()
        .map(|&t| {
            while current < last && readings[current + 1].time <= t {
                current += 1;
            }
            let covered = current < last && readings[current].time <= t;
            covered.then_some(readings[current].bpm)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_686_000_000 + secs, 0).unwrap()
    }

    fn hr(secs: i64, bpm: u16) -> HeartRateSample {
        HeartRateSample { time: at(secs), bpm }
    }

    #[test]
    fn test_half_open_intervals() {
        let times: Vec<_> = (0..4).map(at).collect();
        let readings = vec![hr(0, 60), hr(2, 80)];
        assert_eq!(assign_heart_rate(&times, &readings), vec![Some(60), Some(60), None, None]);
    }

    #[test]
    fn test_rows_before_first_reading_are_unassigned() {
        let times: Vec<_> = (0..6).map(at).collect();
        let readings = vec![hr(2, 70), hr(4, 75), hr(5, 90)];
        assert_eq!(
            assign_heart_rate(&times, &readings),
            vec![None, None, Some(70), Some(70), Some(75), None]
        );
    }

    #[test]
    fn test_single_reading_covers_nothing() {
        let times: Vec<_> = (0..3).map(at).collect();
        assert_eq!(assign_heart_rate(&times, &[hr(0, 60)]), vec![None; 3]);
        assert!(assign_heart_rate(&times, &[]).iter().all(Option::is_none));
    }

    #[test]
    fn test_duplicate_reading_times_use_the_later_value() {
        let times: Vec<_> = (0..3).map(at).collect();
        let readings = vec![hr(0, 60), hr(0, 65), hr(2, 80)];
        assert_eq!(assign_heart_rate(&times, &readings), vec![Some(65), Some(65), None]);
    }

    #[test]
    fn test_matches_interval_scan() {
        // sub-second motion rows against irregular readings
        let times: Vec<_> = (0..200)
            .map(|i| Utc.timestamp_opt(1_686_000_000, 0).unwrap() + chrono::Duration::milliseconds(i * 37))
            .collect();
        let readings = vec![hr(1, 61), hr(2, 63), hr(3, 70), hr(5, 72), hr(7, 68)];
        let assigned = assign_heart_rate(&times, &readings);

        for (t, got) in times.iter().zip(&assigned) {
            let expected = readings
                .windows(2)
                .find(|w| w[0].time <= *t && *t < w[1].time)
                .map(|w| w[0].bpm);
            assert_eq!(*got, expected, "at {}", t);
        }
    }
}
