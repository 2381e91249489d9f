//! Command-line interface components.
//!
//! Defines the `w2-export` CLI with the clap derive API. Every flag that
//! has a counterpart in [`ExportConfig`](crate::config::ExportConfig)
//! overrides the value loaded from the configuration file.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the W2 time-series exporter
///
/// Converts CE-QUAL-W2 Julian-day text output into spreadsheet-ready CSV
/// files, one per time series.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "w2-export",
    version,
    about = "Convert CE-QUAL-W2 Julian-day time series into CSV files",
    long_about = "Reads W2 model input and output files indexed by Julian day, converts each \
                  sample to a calendar date relative to a reference year, and writes one CSV \
                  file per series with spreadsheet serial dates and values."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    ///
    /// TOML configuration file for record defaults and output settings. If
    /// not specified, looks for ~/.config/w2-export/config.toml
    #[arg(
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Convert W2 text files into CSV files
    Convert(ConvertArgs),
    /// Report the Julian-day steps of W2 text files
    Diagnose(DiagnoseArgs),
    /// Reduce a list of record paths and show the files an export would write
    Plan(PlanArgs),
}

/// Arguments for the convert command
#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// Input files, directories or glob patterns
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Year the Julian days count from
    #[arg(short = 'y', long = "year", value_name = "YEAR")]
    pub year: Option<i32>,

    /// Directory for the CSV files
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Header lines to skip in each input file
    #[arg(long = "header-lines", value_name = "COUNT")]
    pub header_lines: Option<usize>,

    /// Files read concurrently
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Watershed (A part of the record path)
    #[arg(short = 'a', long = "a-part", value_name = "NAME")]
    pub watershed: Option<String>,

    /// Location (B part)
    #[arg(short = 'b', long = "b-part", value_name = "NAME")]
    pub location: Option<String>,

    /// Parameter (C part); defaults to each input file's stem
    #[arg(long = "c-part", value_name = "NAME")]
    pub parameter: Option<String>,

    /// Interval label (E part)
    #[arg(short = 'e', long = "e-part", value_name = "NAME")]
    pub interval_label: Option<String>,

    /// Version (F part)
    #[arg(short = 'f', long = "f-part", value_name = "NAME")]
    pub version: Option<String>,

    /// Units of the values
    #[arg(short = 'u', long = "units")]
    pub units: Option<String>,

    /// Data type, e.g. PER-AVG or INST-VAL
    #[arg(short = 't', long = "data-type", value_name = "TYPE")]
    pub data_type: Option<String>,

    /// Interval in minutes, negative for irregular series
    #[arg(long = "interval", value_name = "MINUTES", allow_hyphen_values = true)]
    pub interval: Option<i32>,

    /// Start of the export window, e.g. "01Jan2014 0000"
    #[arg(long = "start", value_name = "DATETIME", requires = "end")]
    pub start: Option<String>,

    /// End of the export window, e.g. "31Dec2014 2400"
    #[arg(long = "end", value_name = "DATETIME", requires = "start")]
    pub end: Option<String>,

    /// Show what would be written without creating files
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Export only the series listed in this file, one record path per line
    #[arg(long = "paths", value_name = "FILE")]
    pub paths_file: Option<PathBuf>,
}

/// Arguments for the diagnose command
#[derive(Debug, Clone, Parser)]
pub struct DiagnoseArgs {
    /// Input files, directories or glob patterns
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Header lines to skip in each input file
    #[arg(long = "header-lines", value_name = "COUNT")]
    pub header_lines: Option<usize>,

    /// Write the day-difference series of each file as CSV into this directory
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the plan command
#[derive(Debug, Clone, Parser)]
pub struct PlanArgs {
    /// File listing one record path per line
    #[arg(value_name = "PATHS_FILE")]
    pub paths_file: PathBuf,

    /// Directory the CSV files would be written to
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars are hidden in quiet mode
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
