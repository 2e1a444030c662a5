//! Calendar-month partition keys (`YYYY-MM`) for time-series tables.

use chrono::{DateTime, Datelike, Utc};

/// Partition key of the month containing `date`.
pub fn month_key(date: &DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Every month between `from` and `to`, both inclusive, most recent first.
///
/// Only the year and month of each bound matter. Empty when `from` is after `to`.
pub fn months_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> Vec<String> {
    let floor = (from.year(), from.month());
    let mut cursor = (to.year(), to.month());
    let mut months = Vec::new();

    while cursor >= floor {
        months.push(format!("{:04}-{:02}", cursor.0, cursor.1));
        cursor = previous(cursor);
    }
    months
}

/// The `depth` months ending with the month of `before`, most recent first,
/// never going past the month of `floor` when one is given.
pub fn months_back(before: &DateTime<Utc>, depth: usize, floor: Option<&DateTime<Utc>>) -> Vec<String> {
    let floor = floor.map(|f| (f.year(), f.month()));
    let mut cursor = (before.year(), before.month());
    let mut months = Vec::with_capacity(depth);

    while months.len() < depth {
        if let Some(floor) = floor
            && cursor < floor
        {
            break;
        }
        months.push(format!("{:04}-{:02}", cursor.0, cursor.1));
        cursor = previous(cursor);
    }
    months
}

fn previous((year, month): (i32, u32)) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}
