//! CSV ingestion for the data story pipeline.
//!
//! Turns a comma-separated byte stream with a header row into a typed
//! [`Table`]: header names are trimmed, short rows are padded with missing
//! cells, and every column is assigned a storage type from its values.

use std::fs;
use std::io::Read;
use std::path::Path;

use csv::ByteRecord;
use story_core::data_processors::CellProcessor;
use story_core::models::{Cell, ColumnSchema, Table};
use story_core::{Result, StoryError};
use tracing::debug;

// ── Options ───────────────────────────────────────────────────────────────────

/// Options controlling how delimited text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read delimited text from `reader` into a [`Table`].
///
/// Fails with [`StoryError::Parse`] when the input has no header, a row has
/// more fields than the header, a field is not valid UTF-8, or a quoted field
/// is never closed. Duplicate header names (after trimming) fail with
/// [`StoryError::DuplicateColumn`].
pub fn read_table<R: Read>(mut reader: R, options: &CsvOptions) -> Result<Table> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    read_table_from_bytes(&bytes, options)
}

/// Read an in-memory CSV payload into a [`Table`].
pub fn read_table_from_bytes(bytes: &[u8], options: &CsvOptions) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // Headers are handled here so row numbers stay consistent in errors.
        .has_headers(false)
        // Short rows are padded; long rows are rejected below.
        .flexible(true)
        .from_reader(bytes);

    let mut record = ByteRecord::new();
    let mut record_index: u64 = 0;

    let has_header = csv_reader
        .read_byte_record(&mut record)
        .map_err(|e| map_csv_error(e, record_index + 1))?;
    if !has_header {
        return Err(StoryError::Parse {
            row: 1,
            reason: "input was empty".to_string(),
        });
    }
    record_index += 1;
    // Byte offset and row number of the most recent record.
    let mut last_record = record_start(&record).map(|start| (start, record_index));

    let names: Vec<String> = decode_record(&record, record_index)?
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if i == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name
            };
            name.trim().to_string()
        })
        .collect();
    let width = names.len();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    loop {
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                last_record = record_start(&record).map(|start| (start, record_index));
                if record.len() > width {
                    return Err(StoryError::Parse {
                        row: record_index,
                        reason: format!(
                            "found record with {} fields, but the header has {}",
                            record.len(),
                            width
                        ),
                    });
                }
                let mut row = decode_record(&record, record_index)?;
                row.resize(width, String::new());
                raw_rows.push(row);
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }

    // An unclosed quote swallows the rest of the input into the final record.
    if let Some((start, row)) = last_record {
        if ends_inside_quotes(&bytes[start.min(bytes.len())..], options.delimiter) {
            return Err(StoryError::Parse {
                row,
                reason: "quoted field is not closed before the end of input".to_string(),
            });
        }
    }

    let schema: Vec<ColumnSchema> = names
        .into_iter()
        .enumerate()
        .map(|(col, name)| ColumnSchema {
            name,
            column_type: CellProcessor::infer_column_type(
                raw_rows.iter().map(|row| row[col].as_str()),
            ),
        })
        .collect();

    let rows: Vec<Vec<Cell>> = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&schema)
                .map(|(raw, column)| CellProcessor::parse_cell(raw, column.column_type))
                .collect()
        })
        .collect();

    debug!(
        "Read {} rows x {} columns ({})",
        rows.len(),
        width,
        schema
            .iter()
            .map(|c| format!("{}: {}", c.name, c.column_type))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Table::new(schema, rows)
}

/// Read the file at `path` into a [`Table`].
pub fn read_table_from_path(path: &Path, options: &CsvOptions) -> Result<Table> {
    let bytes = fs::read(path).map_err(|source| StoryError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_table_from_bytes(&bytes, options)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn record_start(record: &ByteRecord) -> Option<usize> {
    record
        .position()
        .and_then(|pos| usize::try_from(pos.byte()).ok())
}

/// Whether `input` ends inside a quoted field, following the reader's quoting
/// rules: a quote opens a field only at its start and `""` is an escaped quote.
fn ends_inside_quotes(input: &[u8], delimiter: u8) -> bool {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut i = 0;
    while i < input.len() {
        let b = input[i];
        if in_quotes {
            if b == b'"' {
                if input.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            }
            at_field_start = false;
        } else if b == b'"' && at_field_start {
            in_quotes = true;
            at_field_start = false;
        } else {
            at_field_start = b == delimiter || b == b'\n' || b == b'\r';
        }
        i += 1;
    }
    in_quotes
}

fn decode_record(record: &ByteRecord, row: u64) -> Result<Vec<String>> {
    record
        .iter()
        .enumerate()
        .map(|(col, field)| {
            String::from_utf8(field.to_vec()).map_err(|_| StoryError::Parse {
                row,
                reason: format!("field {} is not valid UTF-8", col + 1),
            })
        })
        .collect()
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> StoryError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => StoryError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record() + 1)
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            StoryError::Parse { row, reason }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use story_core::models::ColumnType;

    fn read(csv: &str) -> Result<Table> {
        read_table_from_bytes(csv.as_bytes(), &CsvOptions::default())
    }

    #[test]
    fn test_reads_header_and_rows() {
        let table = read("Date,Amount\n2024-01-05,10\n2024-01-20,5\n").unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["Date", "Amount"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][1], Cell::Integer(10));
        assert_eq!(table.rows()[1][0], Cell::Text("2024-01-20".to_string()));
    }

    #[test]
    fn test_trims_column_names() {
        let table = read(" Date , Amount \n2024-01-05,10\n").unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["Date", "Amount"]);
    }

    #[test]
    fn test_strips_byte_order_mark() {
        let table = read("\u{feff}Date,Amount\n2024-01-05,10\n").unwrap();
        assert_eq!(table.column_index("Date"), Some(0));
    }

    #[test]
    fn test_infers_column_types() {
        let table = read("a,b,c,d,e\n1,1.5,true,x,\n2,,False,3,\n").unwrap();
        let types: Vec<ColumnType> = table.columns().iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::Boolean,
                ColumnType::Text,
                ColumnType::Float,
            ]
        );
        // Numeric-looking text in a text column stays text.
        assert_eq!(table.rows()[1][3], Cell::Text("3".to_string()));
        assert_eq!(table.rows()[1][1], Cell::Missing);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = read("a,b,c\n1,2\n").unwrap();
        assert_eq!(table.rows()[0].len(), 3);
        assert_eq!(table.rows()[0][2], Cell::Missing);
    }

    #[test]
    fn test_long_rows_fail() {
        let err = read("a,b\n1,2\n1,2,3\n").unwrap_err();
        match err {
            StoryError::Parse { row, reason } => {
                assert_eq!(row, 3);
                assert!(reason.contains("3 fields"), "reason = {reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_quote_fails() {
        let err = read("Date,Amount\n\"2024-01-05,10\n2024-02-01,5\n").unwrap_err();
        match err {
            StoryError::Parse { row, reason } => {
                assert_eq!(row, 2);
                assert!(reason.contains("not closed"), "reason = {reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = read("\"Date,Amount\n2024-01-05,10\n").unwrap_err();
        assert!(matches!(err, StoryError::Parse { row: 1, .. }));
    }

    #[test]
    fn test_literal_quotes_inside_fields_are_kept() {
        let table = read("Item,Note\npipe,5\" long\nhose,\"multi\nline \"\"x\"\"\"\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][1], Cell::Text("5\" long".to_string()));
        assert_eq!(table.rows()[1][1], Cell::Text("multi\nline \"x\"".to_string()));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(read(""), Err(StoryError::Parse { row: 1, .. })));
    }

    #[test]
    fn test_header_only_gives_empty_table() {
        let table = read("Date,Amount\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let bytes = b"Date,Amount\n2024-01-05,\xff\xfe\n";
        let err = read_table_from_bytes(bytes, &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, StoryError::Parse { row: 2, .. }));
    }

    #[test]
    fn test_duplicate_columns_after_trim_fail() {
        let err = read("Amount, Amount\n1,2\n").unwrap_err();
        assert!(matches!(err, StoryError::DuplicateColumn(name) if name == "Amount"));
    }

    #[test]
    fn test_quoted_fields() {
        let table = read("Date,Note,Amount\n2024-01-05,\"hello, world\",10\n").unwrap();
        assert_eq!(table.rows()[0][1], Cell::Text("hello, world".to_string()));
    }

    #[test]
    fn test_custom_delimiter() {
        let options = CsvOptions { delimiter: b';' };
        let table = read_table_from_bytes(b"Date;Amount\n2024-01-05;10\n", &options).unwrap();
        assert_eq!(table.rows()[0][1], Cell::Integer(10));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_table_from_path(Path::new("/definitely/not/here.csv"), &CsvOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoryError::FileRead { .. }));
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
