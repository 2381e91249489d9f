//! W2 Export Library
//!
//! Converts CE-QUAL-W2 time series indexed by fractional Julian day into
//! calendar-dated records and exports them as spreadsheet-ready CSV files.
//!
//! This library provides tools for:
//! - Parsing and reducing six-part record paths (`/A/B/C/D/E/F/`)
//! - Converting Julian days relative to a reference year into dates
//! - Reading W2 text files with header lines and comma or space separators
//! - Assembling time-series and paired-data records
//! - Exporting records from a store, one CSV file per series
//! - Time-step diagnostics for irregular model output

pub mod assembler;
pub mod cli;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod exporter;
pub mod ingest;
pub mod julian;
pub mod models;
pub mod path_key;
pub mod processor;
pub mod store;

// Re-export commonly used types
pub use config::ExportConfig;
pub use error::{ExportError, Result};
pub use julian::{CalendarDateTime, julian_to_date};
pub use models::{ExportStats, PairedDataRecord, TimeSeriesRecord};
pub use path_key::PathKey;
