use std::path::PathBuf;
use thiserror::Error;

use crate::models::FieldRole;

/// All errors produced by the data story pipeline.
#[derive(Error, Debug)]
pub enum StoryError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input stream is not well-formed delimited text.
    #[error("CSV parse error at row {row}: {reason}")]
    Parse { row: u64, reason: String },

    /// Two columns share the same name once surrounding whitespace is trimmed.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// No column qualifies for a role and none was chosen explicitly.
    #[error("No {role} column candidates found")]
    EmptyCandidateSet { role: FieldRole },

    /// A selected field does not name a column of the table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// The same column was selected as both the date field and the value field.
    #[error("Column {0} cannot be both the date field and the value field")]
    SameField(String),

    /// Every value of the selected date field failed date coercion.
    #[error("Invalid date column {column}: {reason}")]
    InvalidDateColumn { column: String, reason: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the story crates.
pub type Result<T> = std::result::Result<T, StoryError>;
