use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::models::{Cell, ColumnType};
use crate::time_utils::DateParser;

// ── Missing markers ───────────────────────────────────────────────────────────

/// Field contents (after trimming) that are read as a missing value.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether `raw` denotes a missing value.
pub fn is_missing_token(raw: &str) -> bool {
    NA_TOKENS.contains(&raw.trim())
}

// ── NumberParser ──────────────────────────────────────────────────────────────

fn integer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("regex is valid"))
}

fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("regex is valid")
    })
}

/// Parses numeric and boolean literals the way a CSV reader types fields.
///
/// Only plain decimal notation is accepted (optional sign, fraction and
/// exponent) plus `inf`/`infinity`. Thousands separators, currency symbols and
/// percentages are text.
pub struct NumberParser;

impl NumberParser {
    pub fn parse_integer(s: &str) -> Option<i64> {
        let s = s.trim();
        if !integer_regex().is_match(s) {
            return None;
        }
        s.parse().ok()
    }

    pub fn parse_float(s: &str) -> Option<f64> {
        let s = s.trim();
        if float_regex().is_match(s) {
            return s.parse().ok();
        }
        let unsigned = s.trim_start_matches(['+', '-']);
        if unsigned.len() + 1 < s.len() {
            return None;
        }
        if unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity") {
            return Some(if s.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            });
        }
        None
    }

    pub fn parse_bool(s: &str) -> Option<bool> {
        match s.trim() {
            "true" | "True" | "TRUE" => Some(true),
            "false" | "False" | "FALSE" => Some(false),
            _ => None,
        }
    }
}

// ── CellProcessor ─────────────────────────────────────────────────────────────

/// Infers column storage types and converts raw fields into typed [`Cell`]s.
pub struct CellProcessor;

impl CellProcessor {
    /// Choose the storage type for a column from its raw field values.
    ///
    /// Missing markers are ignored. Integers win over floats, floats over
    /// booleans, and anything else makes the column text. A column with no
    /// present value is `Float`.
    pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> ColumnType {
        let mut is_integer = true;
        let mut is_float = true;
        let mut is_bool = true;
        let mut seen_value = false;

        for raw in values {
            if is_missing_token(raw) {
                continue;
            }
            seen_value = true;
            if is_integer && NumberParser::parse_integer(raw).is_none() {
                is_integer = false;
            }
            if is_float && NumberParser::parse_float(raw).is_none() {
                is_float = false;
            }
            if is_bool && NumberParser::parse_bool(raw).is_none() {
                is_bool = false;
            }
            if !is_integer && !is_float && !is_bool {
                return ColumnType::Text;
            }
        }

        if !seen_value {
            ColumnType::Float
        } else if is_integer {
            ColumnType::Integer
        } else if is_float {
            ColumnType::Float
        } else {
            ColumnType::Boolean
        }
    }

    /// Convert one raw field to a cell of the column's storage type.
    pub fn parse_cell(raw: &str, column_type: ColumnType) -> Cell {
        if is_missing_token(raw) {
            return Cell::Missing;
        }
        let parsed = match column_type {
            ColumnType::Integer => NumberParser::parse_integer(raw).map(Cell::Integer),
            ColumnType::Float => NumberParser::parse_float(raw).map(Cell::Float),
            ColumnType::Boolean => NumberParser::parse_bool(raw).map(Cell::Boolean),
            ColumnType::Text => None,
        };
        parsed.unwrap_or_else(|| Cell::Text(raw.to_string()))
    }

    /// Coerce a cell to a date/time.
    ///
    /// * `Ok(None)` – the cell is missing (or a float NaN).
    /// * `Ok(Some(ts))` – parsed; numbers are nanoseconds since the Unix epoch.
    /// * `Err(reason)` – the cell cannot represent a date/time.
    pub fn coerce_date(
        cell: &Cell,
        parser: &DateParser,
    ) -> std::result::Result<Option<NaiveDateTime>, String> {
        match cell {
            Cell::Missing => Ok(None),
            Cell::Integer(n) => Ok(Some(DateParser::from_epoch_nanos(*n))),
            Cell::Float(v) if v.is_nan() => Ok(None),
            Cell::Float(v) => {
                if !v.is_finite() || *v < i64::MIN as f64 || *v >= i64::MAX as f64 {
                    return Err("is out of range for an epoch timestamp".to_string());
                }
                Ok(Some(DateParser::from_epoch_nanos(v.trunc() as i64)))
            }
            Cell::Boolean(_) => Err("is a boolean, not a date".to_string()),
            Cell::Text(s) => parser
                .parse(s)
                .map(Some)
                .ok_or_else(|| "does not match any known date format".to_string()),
        }
    }

    /// Coerce a cell to a number; booleans count as 1 and 0, anything else
    /// non-numeric becomes `None`.
    pub fn coerce_number(cell: &Cell) -> Option<f64> {
        match cell {
            Cell::Integer(n) => Some(*n as f64),
            Cell::Float(v) if v.is_nan() => None,
            Cell::Float(v) => Some(*v),
            Cell::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => NumberParser::parse_float(s).filter(|v| !v.is_nan()),
            Cell::Missing => None,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
