//! Configuration management and validation.
//!
//! Provides the settings for text ingestion, record identity defaults,
//! time windows and CSV output. Settings can be loaded from a TOML file
//! and are then overridden by command-line flags.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_DATA_TYPE, DEFAULT_HEADER_LINES,
    DEFAULT_TIME_BLOCK, IRREGULAR_INTERVAL,
};
use crate::error::{ExportError, Result};
use crate::julian::parse_hec_datetime;
use crate::path_key::PathKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identity and metadata applied to records assembled from text files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordDefaults {
    /// A part
    pub watershed: String,
    /// B part
    pub location: String,
    /// C part; the input file stem when unset
    pub parameter: Option<String>,
    /// D part; the month of the first sample when unset
    pub block: Option<String>,
    /// E part
    pub interval_label: String,
    /// F part
    pub version: String,
    pub units: String,
    pub data_type: String,
    /// Interval in minutes, negative for irregular series
    pub interval: i32,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            watershed: String::new(),
            location: String::new(),
            parameter: None,
            block: None,
            interval_label: DEFAULT_TIME_BLOCK.to_string(),
            version: String::new(),
            units: String::new(),
            data_type: DEFAULT_DATA_TYPE.to_string(),
            interval: IRREGULAR_INTERVAL,
        }
    }
}

impl RecordDefaults {
    /// Key for a record read from `source`
    pub fn key_for(&self, source: &Path) -> PathKey {
        let parameter = self.parameter.clone().unwrap_or_else(|| {
            source
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default()
        });

        PathKey::build(
            self.watershed.clone(),
            self.location.clone(),
            parameter,
            self.block.clone().unwrap_or_default(),
            self.interval_label.clone(),
            self.version.clone(),
        )
    }
}

/// Inclusive export window in `DDMonYYYY HHMM` form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

impl TimeWindow {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Window bounds as minute timestamps
    pub fn bounds(&self) -> Result<(i64, i64)> {
        let start = parse_hec_datetime(&self.start)?;
        let end = parse_hec_datetime(&self.end)?;
        if start > end {
            return Err(ExportError::configuration(format!(
                "time window {} - {} ends before it starts",
                self.start, self.end
            )));
        }
        Ok((start, end))
    }
}

/// Global configuration for an export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Lines to skip at the top of each input file
    pub header_lines: usize,

    /// Year the Julian days in the input files count from
    pub reference_year: Option<i32>,

    /// Number of files ingested concurrently
    pub workers: usize,

    /// Directory receiving the CSV files
    pub output_dir: PathBuf,

    /// Optional window applied to store reads
    pub time_window: Option<TimeWindow>,

    /// Resolve destinations without writing files
    pub dry_run: bool,

    /// Show a progress bar during batch export
    pub show_progress: bool,

    pub record: RecordDefaults,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            header_lines: DEFAULT_HEADER_LINES,
            reference_year: None,
            workers: num_cpus::get(),
            output_dir: PathBuf::from("."),
            time_window: None,
            dry_run: false,
            show_progress: true,
            record: RecordDefaults::default(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExportError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            ExportError::configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default config file location, e.g. `~/.config/w2-export/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load an explicit file, else the default file if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check settings that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ExportError::configuration("workers must be at least 1"));
        }
        if let Some(window) = &self.time_window {
            window.bounds()?;
        }
        Ok(())
    }

    /// Reference year, required for converting text files
    pub fn require_reference_year(&self) -> Result<i32> {
        self.reference_year.ok_or_else(|| {
            ExportError::configuration("a reference year is required to convert Julian days")
        })
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn with_header_lines(mut self, header_lines: usize) -> Self {
        self.header_lines = header_lines;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn with_record_defaults(mut self, record: RecordDefaults) -> Self {
        self.record = record;
        self
    }
}
