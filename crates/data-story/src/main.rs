mod bootstrap;
mod report;

use std::io::Read;

use anyhow::{Context, Result};
use story_core::settings::Settings;
use story_core::time_utils::resolve_timezone;
use story_data::{AnalysisOptions, Dataset, FieldSelection};

use crate::report::ReportFormat;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("data-story v{} starting", env!("CARGO_PKG_VERSION"));

    let options = AnalysisOptions {
        delimiter: settings.delimiter_byte()?,
        timezone: settings
            .timezone
            .as_deref()
            .map(resolve_timezone)
            .transpose()?,
        preview_rows: settings.preview_rows,
    };
    let csv_options = options.csv_options();

    let dataset = if settings.reads_stdin() {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read standard input")?;
        Dataset::from_bytes(&bytes, &csv_options).context("Failed to load CSV from standard input")?
    } else {
        Dataset::from_path(&settings.input, &csv_options)
            .with_context(|| format!("Failed to load {}", settings.input.display()))?
    };

    tracing::info!(
        "Loaded {} rows x {} columns",
        dataset.table().row_count(),
        dataset.table().column_count()
    );

    if settings.list_columns {
        println!("{}", report::render_candidates(dataset.classification()));
        return Ok(());
    }

    let selection = FieldSelection {
        date_field: settings.date_field.clone(),
        value_field: settings.value_field.clone(),
    };
    let result = dataset
        .analyze(&selection, &options)
        .context("Analysis failed")?;

    let output = report::render(&result, ReportFormat::from_setting(&settings.format))?;
    println!("{output}");

    Ok(())
}
