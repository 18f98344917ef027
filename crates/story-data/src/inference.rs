//! Column type inference: which columns can serve as the date field and which
//! as the value field.

use story_core::data_processors::CellProcessor;
use story_core::models::{Cell, Classification, ColumnClassification, DateProbeFailure, Table};
use story_core::time_utils::DateParser;
use tracing::debug;

/// Check that every cell of a column coerces to a date/time.
///
/// Stops at the first cell that fails and reports it. Missing cells never
/// fail, so an empty or all-missing column qualifies.
pub fn probe_date_column<'a>(
    cells: impl IntoIterator<Item = &'a Cell>,
    parser: &DateParser,
) -> Result<(), DateProbeFailure> {
    cells.into_iter().enumerate().try_for_each(|(row, cell)| {
        CellProcessor::coerce_date(cell, parser)
            .map(|_| ())
            .map_err(|reason| DateProbeFailure {
                row,
                value: cell.to_string(),
                reason,
            })
    })
}

/// Classify every column of `table`. Read-only.
///
/// A column is numeric when its storage type is integer or float, and a date
/// candidate when [`probe_date_column`] succeeds for it.
pub fn classify(table: &Table, parser: &DateParser) -> Classification {
    let mut classification = Classification::default();

    for (idx, column) in table.columns().iter().enumerate() {
        let is_numeric = column.column_type.is_numeric();
        let probe = probe_date_column(table.column_cells(idx), parser);

        if let Err(failure) = &probe {
            debug!("Column \"{}\" is not a date column: {}", column.name, failure);
        }
        if is_numeric {
            classification.numeric_candidates.push(column.name.clone());
        }
        if probe.is_ok() {
            classification.date_candidates.push(column.name.clone());
        }

        classification.columns.push(ColumnClassification {
            name: column.name.clone(),
            column_type: column.column_type,
            is_numeric,
            is_date_parseable: probe.is_ok(),
            date_probe_failure: probe.err(),
        });
    }

    debug!(
        "Classified {} columns: date candidates {:?}, numeric candidates {:?}",
        classification.columns.len(),
        classification.date_candidates,
        classification.numeric_candidates
    );

    classification
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_table_from_bytes, CsvOptions};

    fn classify_csv(csv: &str) -> Classification {
        let table = read_table_from_bytes(csv.as_bytes(), &CsvOptions::default()).unwrap();
        classify(&table, &DateParser::default())
    }

    #[test]
    fn test_probe_stops_at_first_failure() {
        let cells = vec![
            Cell::Text("2024-01-01".to_string()),
            Cell::Missing,
            Cell::Text("not-a-date".to_string()),
            Cell::Text("also bad".to_string()),
        ];
        let failure = probe_date_column(&cells, &DateParser::default()).unwrap_err();
        assert_eq!(failure.row, 2);
        assert_eq!(failure.value, "not-a-date");
    }

    #[test]
    fn test_probe_empty_column_qualifies() {
        let cells: Vec<Cell> = Vec::new();
        assert!(probe_date_column(&cells, &DateParser::default()).is_ok());
    }

    #[test]
    fn test_classify_date_and_amount() {
        let c = classify_csv("Date,Amount\n2024-01-05,10\n2024-01-20,5\n2024-02-02,7\n");
        assert_eq!(c.numeric_candidates, vec!["Amount"]);
        // Integers are read as epoch nanoseconds, so numeric columns qualify too.
        assert_eq!(c.date_candidates, vec!["Date", "Amount"]);
    }

    #[test]
    fn test_single_bad_value_disqualifies_column() {
        let c = classify_csv("When,Value\n2024-01-01,1\nnot-a-date,2\n");
        assert!(!c.date_candidates.contains(&"When".to_string()));

        let when = c.column("When").unwrap();
        assert!(!when.is_date_parseable);
        let failure = when.date_probe_failure.as_ref().unwrap();
        assert_eq!(failure.row, 1);
        assert_eq!(failure.value, "not-a-date");
    }

    #[test]
    fn test_numeric_looking_text_is_not_numeric() {
        let c = classify_csv("Code,Amount\n001,1.5\nA12,2.5\n");
        assert_eq!(c.numeric_candidates, vec!["Amount"]);
        assert!(!c.column("Code").unwrap().is_numeric);
    }

    #[test]
    fn test_boolean_column_is_neither() {
        let c = classify_csv("Flag\ntrue\nfalse\n");
        assert!(c.numeric_candidates.is_empty());
        assert!(c.date_candidates.is_empty());
    }

    #[test]
    fn test_zero_rows_every_column_is_date_candidate() {
        let c = classify_csv("Date,Note\n");
        assert_eq!(c.date_candidates, vec!["Date", "Note"]);
    }

    #[test]
    fn test_missing_cells_do_not_disqualify() {
        let c = classify_csv("Date,Amount\n2024-01-05,1\n,2\nNA,3\n");
        assert!(c.date_candidates.contains(&"Date".to_string()));
    }

    #[test]
    fn test_classification_does_not_mutate_table() {
        let table = read_table_from_bytes(
            b"Date,Amount\n2024-01-05,10\n",
            &CsvOptions::default(),
        )
        .unwrap();
        let before = table.rows().to_vec();
        let _ = classify(&table, &DateParser::default());
        assert_eq!(table.rows(), before.as_slice());
    }
}
