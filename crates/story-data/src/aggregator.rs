//! Monthly aggregation of cleaned rows.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime};
use story_core::models::{CleanedRow, MonthlyPoint};
use story_core::time_utils::month_start;

/// Groups cleaned rows by calendar month and sums their values.
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    /// One [`MonthlyPoint`] per calendar month that has at least one row,
    /// ascending by month. Months without rows are not emitted.
    ///
    /// Values within a month are summed in sorted order, so the output does
    /// not depend on the order of `rows`.
    pub fn aggregate(rows: &[CleanedRow]) -> Vec<MonthlyPoint> {
        let mut months: BTreeMap<(i32, u32), (NaiveDateTime, Vec<f64>)> = BTreeMap::new();

        for row in rows {
            let key = (row.timestamp.year(), row.timestamp.month());
            months
                .entry(key)
                .or_insert_with(|| (month_start(row.timestamp), Vec::new()))
                .1
                .push(row.value);
        }

        months
            .into_values()
            .map(|(start, mut values)| {
                values.sort_by(f64::total_cmp);
                MonthlyPoint {
                    month_start: start,
                    total: values.iter().sum(),
                    count: values.len(),
                }
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
