//! Core types and computations for the data story builder.
//!
//! Holds the table model, the error taxonomy, cell coercion rules, the KPI and
//! trend-fit calculations, number formatting and command-line settings. The
//! ingestion and pipeline layers live in `story-data`.

pub mod calculations;
pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StoryError};
