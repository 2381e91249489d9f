//! Core data structures for W2 time-series export.
//!
//! Defines the time-series and paired-data records produced by the
//! assembler, the raw samples read from text files, and batch statistics.

use crate::julian::CalendarDateTime;
use crate::path_key::PathKey;
use std::path::PathBuf;
use std::time::Duration;

/// One `(julian day, value)` row of a W2 text file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub julian_day: f64,
    pub value: f64,
}

/// Numeric data type code carried by time-series records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    InstantaneousValue,
    PeriodAverage,
    PeriodCumulative,
    Other,
}

impl DataType {
    /// Map a type name such as `PER-AVG` to its data type
    pub fn from_name(name: &str) -> Self {
        match name {
            "INST-VAL" => DataType::InstantaneousValue,
            "PER-AVG" => DataType::PeriodAverage,
            "PER-CUM" => DataType::PeriodCumulative,
            _ => DataType::Other,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            DataType::InstantaneousValue => 1,
            DataType::PeriodAverage => 2,
            DataType::PeriodCumulative => 3,
            DataType::Other => 0,
        }
    }
}

/// Time-ordered series of values with identity metadata.
///
/// Timestamps are minutes since 31 Dec 1899 (see
/// [`CalendarDateTime::to_minutes`]). Fields are private so the timestamp
/// and value sequences always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    pub(crate) key: PathKey,
    pub(crate) times: Vec<i64>,
    pub(crate) values: Vec<f64>,
    pub(crate) units: String,
    pub(crate) type_name: String,
    pub(crate) data_type: DataType,
    pub(crate) interval: i32,
}

impl TimeSeriesRecord {
    pub fn key(&self) -> &PathKey {
        &self.key
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Interval in minutes; negative for irregular series
    pub fn interval(&self) -> i32 {
        self.interval
    }

    pub fn is_irregular(&self) -> bool {
        self.interval < 0
    }

    pub fn number_values(&self) -> usize {
        self.values.len()
    }

    pub fn start_time(&self) -> Option<i64> {
        self.times.first().copied()
    }

    pub fn end_time(&self) -> Option<i64> {
        self.times.last().copied()
    }

    /// Human-readable `DDMonYYYY HHMM` form of each timestamp
    pub fn time_strings(&self) -> Vec<String> {
        self.times
            .iter()
            .map(|&minutes| {
                CalendarDateTime::from_minutes(minutes)
                    .map(|date| date.hec_string())
                    .unwrap_or_else(|| minutes.to_string())
            })
            .collect()
    }

    pub fn samples(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    /// Copy keeping only samples with `start <= time <= end`
    pub fn windowed(&self, start: i64, end: i64) -> Self {
        let (times, values): (Vec<i64>, Vec<f64>) = self
            .samples()
            .filter(|(time, _)| (start..=end).contains(time))
            .unzip();
        Self {
            times,
            values,
            ..self.clone()
        }
    }
}

/// One independent ordinate sequence related to one or more curves
#[derive(Debug, Clone, PartialEq)]
pub struct PairedDataRecord {
    pub(crate) key: PathKey,
    pub(crate) x: Vec<f64>,
    pub(crate) curves: Vec<Vec<f64>>,
    pub(crate) labels: Vec<String>,
    pub(crate) x_units: String,
    pub(crate) y_units: String,
}

impl PairedDataRecord {
    pub fn key(&self) -> &PathKey {
        &self.key
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn curves(&self) -> &[Vec<f64>] {
        &self.curves
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn x_units(&self) -> &str {
        &self.x_units
    }

    pub fn y_units(&self) -> &str {
        &self.y_units
    }

    pub fn number_curves(&self) -> usize {
        self.curves.len()
    }

    pub fn number_ordinates(&self) -> usize {
        self.x.len()
    }
}

/// Failure recorded for one record of a batch
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub identity: String,
    pub message: String,
}

/// Batch export statistics
#[derive(Debug, Default)]
pub struct ExportStats {
    pub records_succeeded: usize,
    pub records_failed: usize,
    pub failures: Vec<RecordFailure>,
    pub files_written: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl ExportStats {
    pub fn record_success(&mut self, path: PathBuf) {
        self.records_succeeded += 1;
        self.files_written.push(path);
    }

    pub fn record_failure(&mut self, identity: impl Into<String>, message: impl Into<String>) {
        self.records_failed += 1;
        self.failures.push(RecordFailure {
            identity: identity.into(),
            message: message.into(),
        });
    }

    pub fn total(&self) -> usize {
        self.records_succeeded + self.records_failed
    }

    /// Fold the counts of another batch into this one
    pub fn merge(&mut self, other: ExportStats) {
        self.records_succeeded += other.records_succeeded;
        self.records_failed += other.records_failed;
        self.failures.extend(other.failures);
        self.files_written.extend(other.files_written);
        self.elapsed += other.elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::from_name("INST-VAL").code(), 1);
        assert_eq!(DataType::from_name("PER-AVG").code(), 2);
        assert_eq!(DataType::from_name("PER-CUM").code(), 3);
        assert_eq!(DataType::from_name("INST-CUM").code(), 0);
        assert_eq!(DataType::from_name("per-avg"), DataType::Other);
    }

    #[test]
    fn test_export_stats_merge() {
        let mut stats = ExportStats::default();
        stats.record_success(PathBuf::from("a.csv"));

        let mut other = ExportStats::default();
        other.record_failure("/A/B/C//E/F/", "no data");
        other.record_success(PathBuf::from("b.csv"));

        stats.merge(other);
        assert_eq!(stats.records_succeeded, 2);
        assert_eq!(stats.records_failed, 1);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.files_written.len(), 2);
        assert_eq!(stats.failures[0].identity, "/A/B/C//E/F/");
    }
}
