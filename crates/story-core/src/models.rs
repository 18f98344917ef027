use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryError};

// ── Cells and columns ─────────────────────────────────────────────────────────

/// A single typed value of an ingested table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Empty field or one of the recognised NA markers.
    Missing,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Original field text, kept verbatim.
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Integer(n) => write!(f, "{n}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Boolean(b) => write!(f, "{b}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Storage type assigned to a column at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    /// Whether the column is stored as numbers. Text that merely looks numeric
    /// does not count.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Text => "text",
        };
        f.write_str(s)
    }
}

/// Name and storage type of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// An ingested table: ordered, uniquely named columns and rows of equal width.
///
/// Read-only once built; every selection is computed against the same table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<ColumnSchema>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, rejecting duplicate column names and ragged rows.
    pub fn new(columns: Vec<ColumnSchema>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(StoryError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(StoryError::Parse {
                row: idx as u64 + 2,
                reason: format!(
                    "row has {} fields, but the header has {}",
                    row.len(),
                    columns.len()
                ),
            });
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of the column called `name`, if any.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Iterate over the cells of column `idx`, top to bottom.
    ///
    /// Panics if `idx` is out of bounds.
    pub fn column_cells(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        assert!(idx < self.columns.len(), "column index out of bounds");
        self.rows.iter().map(move |row| &row[idx])
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// The role a column plays in an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Date,
    Value,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Date => f.write_str("date"),
            FieldRole::Value => f.write_str("numeric"),
        }
    }
}

/// The first cell that stopped a column from qualifying as a date column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateProbeFailure {
    /// 0-based data row index.
    pub row: usize,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for DateProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: \"{}\" {}", self.row, self.value, self.reason)
    }
}

/// Type-probe outcome for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnClassification {
    pub name: String,
    pub column_type: ColumnType,
    pub is_numeric: bool,
    pub is_date_parseable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_probe_failure: Option<DateProbeFailure>,
}

/// Candidate lists for the date and value roles, in table column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub columns: Vec<ColumnClassification>,
    pub numeric_candidates: Vec<String>,
    pub date_candidates: Vec<String>,
}

impl Classification {
    pub fn column(&self, name: &str) -> Option<&ColumnClassification> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn candidates(&self, role: FieldRole) -> &[String] {
        match role {
            FieldRole::Date => &self.date_candidates,
            FieldRole::Value => &self.numeric_candidates,
        }
    }
}

// ── Pipeline outputs ──────────────────────────────────────────────────────────

/// A table row restricted to the two selected fields after coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    /// 0-based index of the source row in the table.
    pub row_index: usize,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// Sum of the value field for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Midnight on the first day of the month.
    pub month_start: NaiveDateTime,
    pub total: f64,
    /// Number of cleaned rows that fell in this month.
    pub count: usize,
}

/// A monthly point together with its fitted trend value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month_start: NaiveDateTime,
    /// Whole days since the first month of the series.
    pub days_elapsed: i64,
    pub total: f64,
    pub predicted: f64,
}

/// Headline figures over the cleaned rows.
///
/// On an empty set `total` is 0 and `average`, `maximum` and `minimum` are
/// `NaN` (serialised as `null`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total: f64,
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub count: usize,
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n_points: usize,
}

impl TrendFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Row accounting for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows whose date cell was missing or failed coercion.
    pub dropped_invalid_date: usize,
    /// Rows with a valid date whose value cell was missing or not numeric.
    pub dropped_invalid_value: usize,
}

/// Everything produced for one (date field, value field) selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub date_field: String,
    pub value_field: String,
    pub kpis: Kpis,
    pub monthly: Vec<MonthlyPoint>,
    pub trend: Option<TrendFit>,
    pub forecast: Vec<ForecastPoint>,
    pub preview: Vec<CleanedRow>,
    pub metadata: PipelineMetadata,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
