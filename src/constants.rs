//! Application constants for the W2 exporter
//!
//! This module contains the fixed calendar tables, file-format constants
//! and default values used throughout the exporter.

// =============================================================================
// Calendar Tables
// =============================================================================

/// Three-letter month abbreviations, indexed by `month - 1`
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month lengths for a non-leap year, indexed by `month - 1`
pub const DAYS_PER_MONTH: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub const DAYS_IN_YEAR: i64 = 365;
pub const DAYS_IN_LEAP_YEAR: i64 = 366;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Calendar date whose midnight is timestamp zero (day 1 is 01 Jan 1900)
pub const EPOCH_YEAR: i32 = 1899;
pub const EPOCH_MONTH: u32 = 12;
pub const EPOCH_DAY: u32 = 31;

// =============================================================================
// Input Text Format
// =============================================================================

/// Header lines preceding the data in a W2 input/output file
pub const DEFAULT_HEADER_LINES: usize = 3;

/// File extensions picked up when an input directory is walked
pub const INPUT_EXTENSIONS: &[&str] = &["npt", "opt", "csv", "txt"];

// =============================================================================
// Record Defaults
// =============================================================================

/// Interval sentinel marking an irregular time series
pub const IRREGULAR_INTERVAL: i32 = -1;

pub const DEFAULT_DATA_TYPE: &str = "PER-AVG";
pub const DEFAULT_TIME_BLOCK: &str = "IR-MONTH";

/// Units applied to Julian-day difference records
pub const JULIAN_DAY_UNITS: &str = "Julian Day";
pub const DAY_DIFFERENCE_UNITS: &str = "Days";

// =============================================================================
// CSV Output Format
// =============================================================================

/// Header label for the spreadsheet serial date column
pub const EXCEL_DATE_HEADER: &str = "Excel Date #";

pub const EXCEL_DATE_PRECISION: usize = 5;
pub const VALUE_PRECISION: usize = 3;

/// Offset added to the day count so day 1 lines up with spreadsheet serials
pub const EXCEL_SERIAL_OFFSET: f64 = 1.0;

pub const OUTPUT_EXTENSION: &str = "csv";

/// Separator between path parts in derived filenames
pub const FILENAME_PART_SEPARATOR: char = '%';

/// Characters that cannot appear in derived filenames and their replacements
pub const FILENAME_SUBSTITUTIONS: &[(char, char)] = &[(':', '@'), (' ', '^')];

// =============================================================================
// CLI / Configuration
// =============================================================================

pub const CONFIG_DIR_NAME: &str = "w2-export";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Progress bar template shared by the batch loops
pub const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
