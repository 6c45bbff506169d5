//! Date bucketing for the Gantt and workload (plan de charge) screens.
//!
//! A chantier's estimated hours are spread flat over the weekly or monthly
//! buckets its schedule overlaps. No ramp-up curve.

use crate::domain::entities::ChantierSchedule;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Inclusive calendar range describing one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when both ranges share at least one day.
    pub fn intersects(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            self.start.format("%d/%m"),
            self.end.format("%d/%m")
        )
    }
}

/// Bucket width for workload tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Week,
    Month,
}

impl Granularity {
    /// `count` consecutive buckets starting with the one containing `from`.
    pub fn buckets(&self, from: NaiveDate, count: usize) -> Vec<DateRange> {
        match self {
            Granularity::Week => week_buckets(from, count),
            Granularity::Month => month_buckets(from, count),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Week => f.write_str("Semaines"),
            Granularity::Month => f.write_str("Mois"),
        }
    }
}

/// Position of a bar on a day-scaled timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GanttBar {
    pub offset_days: i64,
    pub width_days: i64,
}

/// Spread `estimated_hours` evenly across the buckets overlapping the schedule.
///
/// Keys are indices into `buckets`. Buckets outside the schedule are absent.
/// A schedule ending before it starts yields `0.0` for every bucket.
pub fn allocate(schedule: &ChantierSchedule, buckets: &[DateRange]) -> BTreeMap<usize, f64> {
    if schedule.end_date_planned < schedule.start_date {
        return (0..buckets.len()).map(|i| (i, 0.0)).collect();
    }

    let span = DateRange::new(schedule.start_date, schedule.end_date_planned);
    let overlapping: Vec<usize> = buckets
        .iter()
        .enumerate()
        .filter(|(_, bucket)| bucket.intersects(&span))
        .map(|(i, _)| i)
        .collect();

    let duration_in_buckets = overlapping.len();
    if duration_in_buckets == 0 {
        return BTreeMap::new();
    }

    let hours = if schedule.estimated_hours.is_finite() {
        schedule.estimated_hours.max(0.0)
    } else {
        0.0
    };
    let per_bucket = hours / duration_in_buckets as f64;
    overlapping.into_iter().map(|i| (i, per_bucket)).collect()
}

/// Whole days from `reference_start` to `date`. Negative when `date` is earlier.
pub fn bucket_offset_in_days(date: NaiveDate, reference_start: NaiveDate) -> i64 {
    date.signed_duration_since(reference_start).num_days()
}

/// Bar for a `[start, end]` range drawn against `reference_start`.
/// Width counts both ends; a range ending before it starts has width 0.
pub fn gantt_bar(start: NaiveDate, end: NaiveDate, reference_start: NaiveDate) -> GanttBar {
    GanttBar {
        offset_days: bucket_offset_in_days(start, reference_start),
        width_days: (bucket_offset_in_days(end, start) + 1).max(0),
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// `count` Monday–Sunday weeks, the first one containing `from`.
pub fn week_buckets(from: NaiveDate, count: usize) -> Vec<DateRange> {
    let first = week_start(from);
    (0..count as u64)
        .map_while(|i| {
            let start = first.checked_add_days(Days::new(i * 7))?;
            let end = start.checked_add_days(Days::new(6))?;
            Some(DateRange::new(start, end))
        })
        .collect()
}

/// `count` calendar months, the first one containing `from`.
pub fn month_buckets(from: NaiveDate, count: usize) -> Vec<DateRange> {
    let Some(first) = from.with_day(1) else {
        return Vec::new();
    };
    (0..count as u32)
        .map_while(|i| {
            let start = first.checked_add_months(Months::new(i))?;
            let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
            Some(DateRange::new(start, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn schedule(start: NaiveDate, end: NaiveDate, hours: f64) -> ChantierSchedule {
        ChantierSchedule {
            start_date: start,
            end_date_planned: end,
            estimated_hours: hours,
        }
    }

    #[test]
    fn test_four_weeks_eighty_hours() {
        // 2024-01-01 is a Monday.
        let buckets = week_buckets(d(2024, 1, 1), 8);
        let s = schedule(d(2024, 1, 1), d(2024, 1, 28), 80.0);
        let alloc = allocate(&s, &buckets);
        assert_eq!(alloc.len(), 4);
        for i in 0..4 {
            assert_eq!(alloc[&i], 20.0);
        }
        assert!(!alloc.contains_key(&4));
    }

    #[test]
    fn test_partial_week_overlap_counts() {
        let buckets = week_buckets(d(2024, 1, 1), 4);
        // Wednesday of week 0 to Tuesday of week 1.
        let s = schedule(d(2024, 1, 3), d(2024, 1, 9), 10.0);
        let alloc = allocate(&s, &buckets);
        assert_eq!(alloc.len(), 2);
        assert_eq!(alloc[&0], 5.0);
        assert_eq!(alloc[&1], 5.0);
    }

    #[test]
    fn test_end_before_start_is_all_zero() {
        let buckets = week_buckets(d(2024, 1, 1), 3);
        let s = schedule(d(2024, 1, 20), d(2024, 1, 5), 100.0);
        let alloc = allocate(&s, &buckets);
        assert_eq!(alloc.len(), 3);
        assert!(alloc.values().all(|h| *h == 0.0));
    }

    #[test]
    fn test_no_overlap_is_empty() {
        let buckets = week_buckets(d(2024, 1, 1), 2);
        let s = schedule(d(2024, 6, 1), d(2024, 6, 30), 100.0);
        assert!(allocate(&s, &buckets).is_empty());
    }

    #[test]
    fn test_single_day_schedule() {
        let buckets = month_buckets(d(2024, 1, 15), 3);
        let s = schedule(d(2024, 2, 29), d(2024, 2, 29), 7.0);
        let alloc = allocate(&s, &buckets);
        assert_eq!(alloc.len(), 1);
        assert_eq!(alloc[&1], 7.0);
    }

    #[test]
    fn test_week_buckets_start_monday() {
        // 2024-03-14 is a Thursday.
        let buckets = week_buckets(d(2024, 3, 14), 3);
        assert_eq!(buckets[0], DateRange::new(d(2024, 3, 11), d(2024, 3, 17)));
        assert_eq!(buckets[2], DateRange::new(d(2024, 3, 25), d(2024, 3, 31)));
    }

    #[test]
    fn test_month_buckets_cover_calendar_months() {
        let buckets = month_buckets(d(2023, 12, 20), 3);
        assert_eq!(buckets[0], DateRange::new(d(2023, 12, 1), d(2023, 12, 31)));
        assert_eq!(buckets[1], DateRange::new(d(2024, 1, 1), d(2024, 1, 31)));
        assert_eq!(buckets[2], DateRange::new(d(2024, 2, 1), d(2024, 2, 29)));
    }

    #[test]
    fn test_gantt_bar() {
        let bar = gantt_bar(d(2024, 1, 10), d(2024, 1, 19), d(2024, 1, 1));
        assert_eq!(
            bar,
            GanttBar {
                offset_days: 9,
                width_days: 10
            }
        );
        let degenerate = gantt_bar(d(2024, 1, 10), d(2024, 1, 5), d(2024, 1, 1));
        assert_eq!(degenerate.width_days, 0);
    }

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (0i64..2000).prop_map(|n| d(2020, 1, 1) + chrono::Duration::days(n))
    }

    proptest! {
        #[test]
        fn prop_offset_antisymmetric(a in date_strategy(), b in date_strategy()) {
            prop_assert_eq!(bucket_offset_in_days(a, b), -bucket_offset_in_days(b, a));
        }

        #[test]
        fn prop_week_buckets_contiguous(from in date_strategy(), count in 1usize..60) {
            let buckets = week_buckets(from, count);
            prop_assert_eq!(buckets.len(), count);
            prop_assert_eq!(buckets[0].start.weekday(), chrono::Weekday::Mon);
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
                prop_assert_eq!(bucket_offset_in_days(pair[0].end, pair[0].start), 6);
            }
        }

        #[test]
        fn prop_hours_conserved(
            start in date_strategy(),
            len in 0i64..300,
            hours in 0u32..5000,
        ) {
            let end = start + chrono::Duration::days(len);
            // Enough weekly buckets to cover the whole schedule.
            let buckets = week_buckets(start, (len as usize / 7) + 2);
            let alloc = allocate(&schedule(start, end, f64::from(hours)), &buckets);
            let sum: f64 = alloc.values().sum();
            prop_assert!((sum - f64::from(hours)).abs() < 1e-6);
        }
    }
}
