//! Data layer for the data story builder.
//!
//! Reads delimited text into a typed table, classifies its columns, cleans the
//! selected fields, aggregates them by month and runs the top-level analysis
//! pipeline.

pub mod aggregator;
pub mod analysis;
pub mod cleaning;
pub mod inference;
pub mod reader;

pub use analysis::{run_pipeline, AnalysisOptions, Dataset, FieldSelection, ResolvedFields};
pub use story_core as core;
