//! Calendar window queries
//!
//! Pure functions over already fetched reading windows. All comparisons are
//! made at calendar-day granularity with inclusive boundaries.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::models::ReadingTimeWindow;

/// The next window that has not ended yet
///
/// Windows with `end < today` are skipped. Among the rest the one with the
/// earliest start wins; ties keep input order. The input does not have to be
/// sorted.
pub fn next_upcoming(windows: &[ReadingTimeWindow], today: NaiveDate) -> Option<&ReadingTimeWindow> {
    windows
        .iter()
        .filter(|window| window.end() >= today)
        .min_by_key(|window| window.start())
}

/// Windows sharing at least one day with `[range_start, range_end]`, in input order
pub fn overlapping(
    windows: &[ReadingTimeWindow],
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Vec<&ReadingTimeWindow> {
    windows
        .iter()
        .filter(|window| overlap_days(window, range_start, range_end) > 0)
        .collect()
}

/// Number of days shared by a window and a range (zero or negative if disjoint)
pub fn overlap_days(window: &ReadingTimeWindow, range_start: NaiveDate, range_end: NaiveDate) -> i64 {
    let latest_start = range_start.max(window.start());
    let earliest_end = range_end.min(window.end());
    (earliest_end - latest_start).num_days() + 1
}

/// Local calendar day of a timestamp, dropping time of day and offset
pub fn local_day<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}
