//! Row cleaning: coerce the selected date and value fields and drop rows where
//! either fails.

use story_core::data_processors::CellProcessor;
use story_core::models::{CleanedRow, PipelineMetadata, Table};
use story_core::time_utils::DateParser;
use story_core::{Result, StoryError};
use tracing::debug;

/// Rows that survived cleaning, in table order, plus the drop accounting.
#[derive(Debug, Clone, Default)]
pub struct CleanedData {
    pub rows: Vec<CleanedRow>,
    pub metadata: PipelineMetadata,
}

impl CleanedData {
    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }
}

/// Coerce column `date_idx` to timestamps and column `value_idx` to numbers.
///
/// A row is kept only when both coerce. If the table has rows but not a single
/// date cell coerces, the date field is unusable and
/// [`StoryError::InvalidDateColumn`] is returned. A table with no rows yields
/// an empty result.
pub fn clean(
    table: &Table,
    date_idx: usize,
    value_idx: usize,
    date_field: &str,
    parser: &DateParser,
) -> Result<CleanedData> {
    let mut data = CleanedData::default();
    data.metadata.rows_read = table.row_count();

    let mut any_date = false;
    let mut first_failure: Option<(usize, String)> = None;

    for (row_index, row) in table.rows().iter().enumerate() {
        let timestamp = match CellProcessor::coerce_date(&row[date_idx], parser) {
            Ok(Some(ts)) => ts,
            Ok(None) => {
                data.metadata.dropped_invalid_date += 1;
                continue;
            }
            Err(reason) => {
                if first_failure.is_none() {
                    first_failure = Some((
                        row_index,
                        format!("\"{}\" {}", row[date_idx], reason),
                    ));
                }
                data.metadata.dropped_invalid_date += 1;
                continue;
            }
        };
        any_date = true;

        let Some(value) = CellProcessor::coerce_number(&row[value_idx]) else {
            data.metadata.dropped_invalid_value += 1;
            continue;
        };

        data.rows.push(CleanedRow {
            row_index,
            timestamp,
            value,
        });
    }

    if table.row_count() > 0 && !any_date {
        let reason = match first_failure {
            Some((row, detail)) => format!("no value could be read as a date (row {row}: {detail})"),
            None => "the column has no values".to_string(),
        };
        return Err(StoryError::InvalidDateColumn {
            column: date_field.to_string(),
            reason,
        });
    }

    data.metadata.rows_kept = data.rows.len();
    debug!(
        "Cleaned {} of {} rows ({} invalid dates, {} invalid values)",
        data.metadata.rows_kept,
        data.metadata.rows_read,
        data.metadata.dropped_invalid_date,
        data.metadata.dropped_invalid_value
    );

    Ok(data)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
