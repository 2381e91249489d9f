//! CSV output for assembled records.
//!
//! Time series are written as two columns: the spreadsheet serial date
//! (`minutes / 1440 + 1`, 5 decimals) and the value (3 decimals), under an
//! `Excel Date #,<parameter>` header. Files are rendered in memory and
//! moved into place only once complete, so a failed export never leaves a
//! partial file behind.

use crate::constants::{
    EXCEL_DATE_HEADER, EXCEL_DATE_PRECISION, EXCEL_SERIAL_OFFSET, MINUTES_PER_DAY,
    VALUE_PRECISION,
};
use crate::error::{ExportError, Result};
use crate::models::{PairedDataRecord, TimeSeriesRecord};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Spreadsheet serial date of a minute timestamp
pub fn excel_serial_date(minutes: i64) -> f64 {
    minutes as f64 / MINUTES_PER_DAY as f64 + EXCEL_SERIAL_OFFSET
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn render_failure(record: &str, e: impl std::fmt::Display) -> ExportError {
    ExportError::store_read(record, format!("failed to format CSV: {}", e))
}

/// Render a time-series record as CSV text
pub fn render_time_series(record: &TimeSeriesRecord) -> Result<String> {
    let identity = record.key().to_string();
    let mut writer = csv_writer();

    writer
        .write_record([EXCEL_DATE_HEADER, record.key().parameter.as_str()])
        .map_err(|e| render_failure(&identity, e))?;

    for (minutes, value) in record.samples() {
        writer
            .write_record([
                format!("{:.*}", EXCEL_DATE_PRECISION, excel_serial_date(minutes)),
                format!("{:.*}", VALUE_PRECISION, value),
            ])
            .map_err(|e| render_failure(&identity, e))?;
    }

    finish(writer, &identity)
}

/// Render a paired-data record as CSV text, one column per curve
pub fn render_paired(record: &PairedDataRecord) -> Result<String> {
    let identity = record.key().to_string();
    let mut writer = csv_writer();

    let header: Vec<&str> = std::iter::once(record.x_units())
        .chain(record.labels().iter().map(String::as_str))
        .collect();
    writer
        .write_record(&header)
        .map_err(|e| render_failure(&identity, e))?;

    for (row, x) in record.x().iter().enumerate() {
        let fields: Vec<String> = std::iter::once(*x)
            .chain(record.curves().iter().map(|curve| curve[row]))
            .map(|v| format!("{:.*}", EXCEL_DATE_PRECISION, v))
            .collect();
        writer
            .write_record(&fields)
            .map_err(|e| render_failure(&identity, e))?;
    }

    finish(writer, &identity)
}

fn finish(writer: csv::Writer<Vec<u8>>, identity: &str) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| render_failure(identity, e.error()))?;
    String::from_utf8(bytes).map_err(|e| render_failure(identity, e))
}

/// Write `contents` to `destination` through a temporary file in the same
/// directory, replacing any existing file.
pub fn write_atomically(destination: &Path, contents: &str) -> Result<()> {
    let write_error = |source: std::io::Error| ExportError::Write {
        path: destination.to_path_buf(),
        source,
    };

    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(directory).map_err(write_error)?;
    temp.write_all(contents.as_bytes()).map_err(write_error)?;
    temp.flush().map_err(write_error)?;
    temp.persist(destination).map_err(|e| write_error(e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), destination.display());
    Ok(())
}

/// Export a time-series record to `destination`
pub fn export_time_series(record: &TimeSeriesRecord, destination: &Path) -> Result<()> {
    let contents = render_time_series(record)?;
    write_atomically(destination, &contents)
}

/// Export a paired-data record to `destination`
pub fn export_paired(record: &PairedDataRecord, destination: &Path) -> Result<()> {
    let contents = render_paired(record)?;
    write_atomically(destination, &contents)
}

/// Writes one CSV file per record into an output directory
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Destination of a record, named after its reduced key
    pub fn destination(&self, record: &TimeSeriesRecord) -> PathBuf {
        self.output_dir.join(record.key().reduced().to_filename())
    }

    /// Export a record and return the written path
    pub fn export(&self, record: &TimeSeriesRecord) -> Result<PathBuf> {
        let destination = self.destination(record);
        export_time_series(record, &destination)?;
        Ok(destination)
    }
}
