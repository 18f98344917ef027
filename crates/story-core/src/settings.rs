use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{Result, StoryError};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Build a data story from a CSV file: KPIs, a monthly trend and a linear
/// forecast of one numeric column over one date column
#[derive(Parser, Debug, Clone)]
#[command(
    name = "data-story",
    about = "Summarise a CSV file as KPIs, a monthly trend and a linear forecast",
    version
)]
pub struct Settings {
    /// CSV file to analyse (`-` reads standard input)
    pub input: PathBuf,

    /// Date column (defaults to the first date candidate)
    #[arg(long, env = "DATA_STORY_DATE_FIELD")]
    pub date_field: Option<String>,

    /// Numeric column (defaults to the first numeric candidate)
    #[arg(long, env = "DATA_STORY_VALUE_FIELD")]
    pub value_field: Option<String>,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Maximum number of cleaned rows shown in the preview
    #[arg(long, default_value = "50", env = "DATA_STORY_PREVIEW_ROWS")]
    pub preview_rows: usize,

    /// Timezone that offset-aware timestamps are converted to ("auto" uses
    /// the system timezone); when unset, each timestamp keeps its own offset
    #[arg(long, env = "DATA_STORY_TIMEZONE")]
    pub timezone: Option<String>,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Print the date and numeric column candidates and exit
    #[arg(long)]
    pub list_columns: bool,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments, exiting with usage help on error.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Parse an explicit argument list (the first item is the binary name).
    pub fn load_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    /// Apply the `--debug` override.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The delimiter as a single byte, as the CSV reader requires.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(StoryError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )))
        }
    }

    /// Whether input should be read from standard input.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
