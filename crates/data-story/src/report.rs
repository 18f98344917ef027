//! Plain-text and JSON presentation of a [`PipelineResult`].

use story_core::formatting::{format_metric, format_month, format_number, format_timestamp, percentage};
use story_core::models::{Classification, PipelineResult};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    /// Parse a `--format` value; anything other than `json` is text.
    pub fn from_setting(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            ReportFormat::Json
        } else {
            ReportFormat::Text
        }
    }
}

/// Render `result` in the requested format.
pub fn render(result: &PipelineResult, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(result)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

/// Render the human-readable report: key metrics, the monthly trend table,
/// the fitted line and a preview of the cleaned rows.
pub fn render_text(result: &PipelineResult) -> String {
    let mut lines: Vec<String> = Vec::new();
    let kpis = &result.kpis;
    let meta = &result.metadata;

    lines.push(format!("Data story: {} by {}", result.value_field, result.date_field));
    lines.push(String::new());

    // ── Key metrics ───────────────────────────────────────────────────────────
    lines.push("Key Metrics".to_string());
    for (label, value) in [
        ("Total", kpis.total),
        ("Average", kpis.average),
        ("Maximum", kpis.maximum),
        ("Minimum", kpis.minimum),
    ] {
        lines.push(format!("  {:<9}{:>18}", label, format_metric(value)));
    }
    lines.push(format!(
        "  {:<9}{:>18}",
        "Rows",
        format!(
            "{} of {} ({}%)",
            format_number(meta.rows_kept as f64, 0),
            format_number(meta.rows_read as f64, 0),
            percentage(meta.rows_kept as f64, meta.rows_read as f64, 1)
        )
    ));
    if meta.dropped_invalid_date + meta.dropped_invalid_value > 0 {
        lines.push(format!(
            "  Dropped {} rows with an invalid date and {} with an invalid value",
            meta.dropped_invalid_date, meta.dropped_invalid_value
        ));
    }
    lines.push(String::new());

    // ── Monthly trend ─────────────────────────────────────────────────────────
    lines.push("Monthly Trend".to_string());
    if result.forecast.is_empty() {
        lines.push("  No rows left after cleaning.".to_string());
    } else {
        let header = ["Month", "Total", "Rows", "Forecast"];
        let mut table: Vec<[String; 4]> = result
            .forecast
            .iter()
            .zip(&result.monthly)
            .map(|(point, month)| {
                [
                    format_month(&point.month_start),
                    format_metric(point.total),
                    format_number(month.count as f64, 0),
                    format_metric(point.predicted),
                ]
            })
            .collect();
        table.push([
            "TOTAL".to_string(),
            format_metric(kpis.total),
            format_number(kpis.count as f64, 0),
            String::new(),
        ]);
        lines.extend(render_columns(&header, &table));

        if let Some(fit) = &result.trend {
            lines.push(String::new());
            lines.push(format!(
                "  Trend: y = {:.4} * days + {:.4}  (R² = {:.4}, {} months)",
                fit.slope, fit.intercept, fit.r_squared, fit.n_points
            ));
        }
    }

    // ── Preview ───────────────────────────────────────────────────────────────
    if !result.preview.is_empty() {
        lines.push(String::new());
        lines.push(format!("Preview (first {} rows)", result.preview.len()));
        let header = ["Row", result.date_field.as_str(), result.value_field.as_str()];
        let table: Vec<[String; 3]> = result
            .preview
            .iter()
            .map(|row| {
                [
                    (row.row_index + 1).to_string(),
                    format_timestamp(&row.timestamp),
                    format_metric(row.value),
                ]
            })
            .collect();
        lines.extend(render_columns(&header, &table));
    }

    lines.join("\n")
}

/// List the date and numeric candidates, one role per block.
pub fn render_candidates(classification: &Classification) -> String {
    let mut lines = Vec::new();
    for (title, names) in [
        ("Date columns", &classification.date_candidates),
        ("Numeric columns", &classification.numeric_candidates),
    ] {
        lines.push(format!("{title}:"));
        if names.is_empty() {
            lines.push("  (none)".to_string());
        }
        lines.extend(names.iter().map(|n| format!("  {n}")));
    }
    lines.join("\n")
}

/// Lay out `rows` under `header`: the first column left-aligned, the rest
/// right-aligned, widths fitted to the content.
fn render_columns<const N: usize>(header: &[&str; N], rows: &[[String; N]]) -> Vec<String> {
    let mut widths: [usize; N] = (*header).map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect();
        format!("  {}", padded.join("  ").trim_end())
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(header.to_vec()));
    out.push(format!(
        "  {}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    ));
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
