//! Free-gap detection between locked intervals.
//!
//! Finds the complement of a set of immovable intervals within a bounded
//! range: the time that is still available for focus work.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Half-open overlap test.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Detector for free gaps in a range
#[derive(Debug, Clone)]
pub struct TimeGapDetector {
    /// Minimum gap duration to report (in minutes)
    min_gap_minutes: i64,
}

impl TimeGapDetector {
    /// Report every gap with a positive length.
    pub fn new() -> Self {
        Self { min_gap_minutes: 0 }
    }

    /// Set the minimum gap duration
    pub fn with_min_gap(mut self, minutes: i64) -> Self {
        self.min_gap_minutes = minutes.max(0);
        self
    }

    /// Find maximal free gaps between `locked` intervals within `[range_start, range_end]`.
    ///
    /// Locked intervals may be unsorted and overlapping. The returned gaps are
    /// disjoint, sorted ascending and never adjacent to one another.
    pub fn find_gaps(
        &self,
        locked: &[Interval],
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Vec<Interval> {
        if range_start >= range_end {
            return Vec::new();
        }

        let mut sorted: Vec<Interval> = locked.iter().filter(|iv| !iv.is_empty()).copied().collect();
        sorted.sort_by_key(|iv| (iv.start, iv.end));

        let mut gaps = Vec::new();
        let mut cursor = range_start;

        for interval in &sorted {
            if interval.end <= cursor {
                continue;
            }
            if interval.start >= range_end {
                break;
            }
            if interval.start > cursor {
                self.push_gap(&mut gaps, cursor, interval.start);
            }
            // The cursor only ever moves forward.
            cursor = cursor.max(interval.end.min(range_end));
            if cursor >= range_end {
                break;
            }
        }

        if cursor < range_end {
            self.push_gap(&mut gaps, cursor, range_end);
        }

        gaps
    }

    fn push_gap(&self, gaps: &mut Vec<Interval>, start: DateTime<Utc>, end: DateTime<Utc>) {
        let gap = Interval::new(start, end);
        if !gap.is_empty() && gap.duration_minutes() >= self.min_gap_minutes {
            gaps.push(gap);
        }
    }
}

impl Default for TimeGapDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to find gaps with default settings
pub fn find_gaps(
    locked: &[Interval],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Vec<Interval> {
    TimeGapDetector::new().find_gaps(locked, range_start, range_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn iv(sh: u32, sm: u32, eh: u32, em: u32) -> Interval {
        Interval::new(at(sh, sm), at(eh, em))
    }

    #[test]
    fn test_find_gaps_between_events() {
        let locked = vec![iv(9, 0, 10, 0), iv(11, 0, 12, 0)];
        let gaps = find_gaps(&locked, at(8, 0), at(13, 0));
        assert_eq!(gaps, vec![iv(8, 0, 9, 0), iv(10, 0, 11, 0), iv(12, 0, 13, 0)]);
    }

    #[test]
    fn unsorted_overlapping_intervals_are_merged() {
        let locked = vec![iv(11, 0, 12, 0), iv(9, 0, 10, 30), iv(9, 30, 10, 0), iv(10, 15, 11, 15)];
        let gaps = find_gaps(&locked, at(8, 0), at(13, 0));
        assert_eq!(gaps, vec![iv(8, 0, 9, 0), iv(12, 0, 13, 0)]);
    }

    #[test]
    fn nested_interval_does_not_move_cursor_backward() {
        let locked = vec![iv(9, 0, 12, 0), iv(10, 0, 10, 30)];
        let gaps = find_gaps(&locked, at(8, 0), at(13, 0));
        assert_eq!(gaps, vec![iv(8, 0, 9, 0), iv(12, 0, 13, 0)]);
    }

    #[test]
    fn empty_or_inverted_range_yields_nothing() {
        assert!(find_gaps(&[], at(10, 0), at(10, 0)).is_empty());
        assert!(find_gaps(&[], at(11, 0), at(10, 0)).is_empty());
    }

    #[test]
    fn fully_covered_range_yields_nothing() {
        let locked = vec![iv(7, 0, 9, 0), iv(8, 30, 14, 0)];
        assert!(find_gaps(&locked, at(8, 0), at(13, 0)).is_empty());
    }

    #[test]
    fn intervals_outside_range_are_ignored() {
        let locked = vec![iv(6, 0, 7, 0), iv(14, 0, 15, 0)];
        assert_eq!(find_gaps(&locked, at(8, 0), at(13, 0)), vec![iv(8, 0, 13, 0)]);
    }

    #[test]
    fn adjacent_locked_intervals_leave_no_zero_gap() {
        let locked = vec![iv(9, 0, 10, 0), iv(10, 0, 11, 0)];
        let gaps = find_gaps(&locked, at(9, 0), at(12, 0));
        assert_eq!(gaps, vec![iv(11, 0, 12, 0)]);
    }

    #[test]
    fn min_gap_filters_short_gaps() {
        let locked = vec![iv(9, 0, 9, 50), iv(10, 0, 11, 0)];
        let gaps = TimeGapDetector::new()
            .with_min_gap(15)
            .find_gaps(&locked, at(9, 0), at(12, 0));
        assert_eq!(gaps, vec![iv(11, 0, 12, 0)]);
    }
}
