//! Main analysis pipeline for the data story builder.
//!
//! A [`Dataset`] ingests and classifies a table once; every field selection is
//! then analysed against the same read-only table, producing a
//! [`PipelineResult`] ready for presentation.

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use chrono_tz::Tz;
use story_core::calculations::{KpiCalculator, TrendCalculator};
use story_core::models::{
    Classification, ColumnType, FieldRole, PipelineResult, Table,
};
use story_core::time_utils::DateParser;
use story_core::{Result, StoryError};
use tracing::{debug, warn};

use crate::aggregator::MonthlyAggregator;
use crate::cleaning::clean;
use crate::inference::classify;
use crate::reader::{read_table, read_table_from_bytes, read_table_from_path, CsvOptions};

/// Default cap on the number of cleaned rows returned as a preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 50;

// ── Options ───────────────────────────────────────────────────────────────────

/// Per-run options for [`Dataset::analyze`] and [`run_pipeline`].
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Field delimiter used when the pipeline reads raw bytes.
    pub delimiter: u8,
    /// Offset-aware timestamps are converted to this zone; `None` keeps
    /// each value's own wall-clock time.
    pub timezone: Option<Tz>,
    pub preview_rows: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            timezone: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl AnalysisOptions {
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter,
        }
    }
}

// ── Field selection ───────────────────────────────────────────────────────────

/// A caller's requested date and value fields; `None` means "pick for me".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    pub date_field: Option<String>,
    pub value_field: Option<String>,
}

/// The concrete pair of columns an analysis runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub date_field: String,
    pub date_index: usize,
    pub value_field: String,
    pub value_index: usize,
}

impl FieldSelection {
    pub fn new(date_field: impl Into<String>, value_field: impl Into<String>) -> Self {
        Self {
            date_field: Some(date_field.into()),
            value_field: Some(value_field.into()),
        }
    }

    /// Both roles chosen from the candidate lists.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Turn the request into concrete columns of `table`.
    ///
    /// Requested fields must exist; a requested field outside its candidate
    /// list is used anyway and logged. An unrequested role takes the first
    /// suitable candidate (text-stored columns first for the date role), and
    /// fails with [`StoryError::EmptyCandidateSet`] when there is none. The
    /// two roles must name different columns.
    pub fn resolve(&self, table: &Table, classification: &Classification) -> Result<ResolvedFields> {
        for name in [&self.date_field, &self.value_field].into_iter().flatten() {
            if table.column_index(name).is_none() {
                return Err(StoryError::UnknownColumn(name.clone()));
            }
        }

        let date_field = match &self.date_field {
            Some(name) => {
                if !classification.date_candidates.contains(name) {
                    warn!("Column \"{}\" is not a date candidate; using it as requested", name);
                }
                name.clone()
            }
            None => pick_date_candidate(classification, self.value_field.as_deref())?,
        };

        let value_field = match &self.value_field {
            Some(name) => {
                if !classification.numeric_candidates.contains(name) {
                    warn!("Column \"{}\" is not a numeric candidate; using it as requested", name);
                }
                name.clone()
            }
            None => pick_candidate(classification, FieldRole::Value, Some(&date_field))?,
        };

        if date_field == value_field {
            return Err(StoryError::SameField(date_field));
        }

        let date_index = table
            .column_index(&date_field)
            .ok_or_else(|| StoryError::UnknownColumn(date_field.clone()))?;
        let value_index = table
            .column_index(&value_field)
            .ok_or_else(|| StoryError::UnknownColumn(value_field.clone()))?;

        Ok(ResolvedFields {
            date_field,
            date_index,
            value_field,
            value_index,
        })
    }
}

/// Date role: prefer text-stored candidates, since numeric columns always
/// read as epoch nanoseconds.
fn pick_date_candidate(classification: &Classification, exclude: Option<&str>) -> Result<String> {
    let preferred = classification
        .columns
        .iter()
        .filter(|c| c.is_date_parseable && c.column_type == ColumnType::Text)
        .map(|c| &c.name)
        .find(|name| Some(name.as_str()) != exclude);

    match preferred {
        Some(name) => Ok(name.clone()),
        None => pick_candidate(classification, FieldRole::Date, exclude),
    }
}

/// First candidate for `role` that is not `exclude`, falling back to the first
/// candidate at all.
fn pick_candidate(
    classification: &Classification,
    role: FieldRole,
    exclude: Option<&str>,
) -> Result<String> {
    let candidates = classification.candidates(role);
    candidates
        .iter()
        .find(|name| Some(name.as_str()) != exclude)
        .or_else(|| candidates.first())
        .cloned()
        .ok_or(StoryError::EmptyCandidateSet { role })
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// An ingested and classified table, ready for any number of analyses.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: Table,
    classification: Classification,
}

impl Dataset {
    pub fn from_table(table: Table) -> Self {
        let start = Instant::now();
        let classification = classify(&table, &DateParser::default());
        debug!(
            "Classified {} columns in {:.3}s",
            table.column_count(),
            start.elapsed().as_secs_f64()
        );
        Self {
            table,
            classification,
        }
    }

    pub fn from_reader<R: Read>(reader: R, options: &CsvOptions) -> Result<Self> {
        Self::load(|| read_table(reader, options))
    }

    pub fn from_bytes(bytes: &[u8], options: &CsvOptions) -> Result<Self> {
        Self::load(|| read_table_from_bytes(bytes, options))
    }

    pub fn from_path(path: &Path, options: &CsvOptions) -> Result<Self> {
        Self::load(|| read_table_from_path(path, options))
    }

    fn load(read: impl FnOnce() -> Result<Table>) -> Result<Self> {
        let start = Instant::now();
        let table = read()?;
        debug!(
            "Loaded {} rows in {:.3}s",
            table.row_count(),
            start.elapsed().as_secs_f64()
        );
        Ok(Self::from_table(table))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Run the full analysis for one field selection.
    ///
    /// 1. Resolve the selection to concrete columns.
    /// 2. Clean: coerce both fields and drop rows where either fails.
    /// 3. Aggregate by calendar month.
    /// 4. Fit the trend line and compute in-sample predictions.
    /// 5. Compute KPIs over the cleaned values.
    pub fn analyze(&self, selection: &FieldSelection, options: &AnalysisOptions) -> Result<PipelineResult> {
        let fields = selection.resolve(&self.table, &self.classification)?;
        debug!(
            "Analysing date field \"{}\" against value field \"{}\"",
            fields.date_field, fields.value_field
        );

        // ── Step 1: Clean ─────────────────────────────────────────────────────
        let clean_start = Instant::now();
        let parser = DateParser::with_timezone(options.timezone);
        let cleaned = clean(
            &self.table,
            fields.date_index,
            fields.value_index,
            &fields.date_field,
            &parser,
        )?;
        debug!("Cleaning took {:.3}s", clean_start.elapsed().as_secs_f64());

        // ── Step 2: Aggregate and fit ─────────────────────────────────────────
        let compute_start = Instant::now();
        let monthly = MonthlyAggregator::aggregate(&cleaned.rows);
        let (trend, forecast) = TrendCalculator::forecast(&monthly);
        let kpis = KpiCalculator::calculate(&cleaned.values());
        debug!(
            "Aggregated {} months in {:.3}s",
            monthly.len(),
            compute_start.elapsed().as_secs_f64()
        );

        let preview = cleaned
            .rows
            .iter()
            .take(options.preview_rows)
            .cloned()
            .collect();

        Ok(PipelineResult {
            date_field: fields.date_field,
            value_field: fields.value_field,
            kpis,
            monthly,
            trend,
            forecast,
            preview,
            metadata: cleaned.metadata,
        })
    }
}

/// Single-request pipeline: raw CSV bytes and a field pair in, result out.
pub fn run_pipeline(
    bytes: &[u8],
    date_field: &str,
    value_field: &str,
    options: &AnalysisOptions,
) -> Result<PipelineResult> {
    let dataset = Dataset::from_bytes(bytes, &options.csv_options())?;
    dataset.analyze(&FieldSelection::new(date_field, value_field), options)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
