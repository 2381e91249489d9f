//! Error handling for W2 time-series export operations.
//!
//! Provides error types with context for record identifiers, text
//! ingestion, calendar conversion, store reads and CSV output.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record path '{raw}': expected 6 parts, found {found}")]
    MalformedKey { raw: String, found: usize },

    #[error("Malformed data on line {line_number} ('{line}'): {reason}")]
    MalformedRecord {
        line_number: usize,
        line: String,
        reason: String,
    },

    #[error(
        "Could not resolve Julian day {julian_day} to a calendar date (day {day_of_year} of {year})"
    )]
    DateComputation {
        julian_day: f64,
        day_of_year: i64,
        year: i32,
    },

    #[error("Failed to read record {key}: {reason}")]
    StoreRead { key: String, reason: String },

    #[error("Failed to write CSV file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("Invalid date/time '{input}': {reason}")]
    InvalidDateTime { input: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ExportError {
    /// Whether the error violates an input contract and must end the batch.
    ///
    /// Everything else is scoped to a single record: it is logged, counted
    /// as a failure and the batch moves on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExportError::MalformedKey { .. }
                | ExportError::DateComputation { .. }
                | ExportError::InvalidDateTime { .. }
                | ExportError::Configuration { .. }
        )
    }

    pub fn store_read(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreRead {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
