//! Batch export pipeline.
//!
//! Orchestrates the export of many records: catalog listing, reduction of
//! per-block keys to one identity per series, store reads, CSV output and
//! statistics. Each record is independent; read, parse and write failures
//! are logged against the record identity and the batch carries on.
//! Malformed keys and impossible dates end the batch.

use crate::assembler::record_from_samples;
use crate::config::{ExportConfig, TimeWindow};
use crate::constants::PROGRESS_TEMPLATE;
use crate::diagnostics::{StepSummary, difference_record};
use crate::error::{ExportError, Result};
use crate::exporter::{CsvExporter, export_paired};
use crate::ingest::ingest_files;
use crate::models::ExportStats;
use crate::path_key::{PathKey, unique_reduced_keys};
use crate::store::{
    MemoryConnector, MemoryStore, StoreConnector, StoreSession, StoredRecord, TimeSeriesStore,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Exports records from a store, one CSV file per series
#[derive(Debug, Clone)]
pub struct BatchExporter {
    exporter: CsvExporter,
    dry_run: bool,
    show_progress: bool,
}

impl BatchExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            exporter: CsvExporter::new(output_dir),
            dry_run: false,
            show_progress: false,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            exporter: CsvExporter::new(config.output_dir.clone()),
            dry_run: config.dry_run,
            show_progress: config.show_progress,
        }
    }

    /// Resolve destinations without writing files
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Export every series in the store.
    ///
    /// The catalog lists one entry per time block; entries are reduced to
    /// one key per series, in order of first appearance.
    pub fn export_all<S>(&self, store: &mut S) -> Result<ExportStats>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let identities = store.list_all_identities()?;
        info!("Assembling unique paths from {} catalog entries", identities.len());

        let keys = unique_reduced_keys(&identities)?;
        info!("Exporting {} unique records", keys.len());

        self.export_keys(store, &keys)
    }

    /// Export only the given keys, as given
    pub fn export_selected<S>(&self, store: &mut S, keys: &[PathKey]) -> Result<ExportStats>
    where
        S: TimeSeriesStore + ?Sized,
    {
        info!("Exporting {} selected records", keys.len());
        self.export_keys(store, keys)
    }

    fn export_keys<S>(&self, store: &mut S, keys: &[PathKey]) -> Result<ExportStats>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let start_time = Instant::now();
        let mut stats = ExportStats::default();
        let progress = self.progress_bar(keys.len());

        for key in keys {
            progress.set_message(key.parameter.clone());

            match self.export_one(store, key) {
                Ok(path) => {
                    debug!("Exported {} to {}", key, path.display());
                    stats.record_success(path);
                }
                Err(e) if e.is_fatal() => {
                    progress.abandon();
                    return Err(e);
                }
                Err(e) => {
                    error!("Failed to export {}: {}", key, e);
                    stats.record_failure(key.to_string(), e.to_string());
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        stats.elapsed = start_time.elapsed();
        Ok(stats)
    }

    fn export_one<S>(&self, store: &mut S, key: &PathKey) -> Result<PathBuf>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let record = store.fetch(key)?.into_time_series(key)?;

        if self.dry_run {
            let destination = self.exporter.destination(&record);
            info!(
                "Would write {} values of {} to {}",
                record.number_values(),
                key,
                destination.display()
            );
            return Ok(destination);
        }

        self.exporter.export(&record)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);
        progress
    }
}

/// Read a list of raw record keys, one per line; blank lines are ignored
pub fn read_paths_file(path: &Path) -> Result<Vec<PathKey>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathKey::parse)
        .collect()
}

/// Open a store, export from it and close it again.
///
/// With `selection` only those keys are exported, otherwise every series in
/// the store. The store is closed on every path out of this function.
pub fn run_export<C>(
    connector: &C,
    source: &Path,
    config: &ExportConfig,
    selection: Option<&[PathKey]>,
) -> Result<ExportStats>
where
    C: StoreConnector,
{
    let window = config
        .time_window
        .as_ref()
        .map(TimeWindow::bounds)
        .transpose()?;

    if !config.dry_run {
        std::fs::create_dir_all(&config.output_dir).map_err(|source| ExportError::Write {
            path: config.output_dir.clone(),
            source,
        })?;
    }

    let mut session = StoreSession::open(connector, source)?;
    if let Some((start, end)) = window {
        debug!("Applying time window {} - {}", start, end);
        session.set_time_window(start, end)?;
    }

    let exporter = BatchExporter::from_config(config);
    let result = match selection {
        Some(keys) => exporter.export_selected(&mut *session, keys),
        None => exporter.export_all(&mut *session),
    };
    session.close();

    result
}

/// Convert W2 text files into CSV files.
///
/// Files are read concurrently, converted to time series keyed by the
/// configured record defaults, and exported through an in-memory store.
/// A file that cannot be read or parsed counts as one failed record, as
/// does a file whose series was already loaded from an earlier file.
pub async fn convert_text_files(paths: &[PathBuf], config: &ExportConfig) -> Result<ExportStats> {
    convert_text_files_selected(paths, config, None).await
}

/// Convert W2 text files, exporting only `selection` when given
pub async fn convert_text_files_selected(
    paths: &[PathBuf],
    config: &ExportConfig,
    selection: Option<&[PathKey]>,
) -> Result<ExportStats> {
    let start_time = Instant::now();
    config.validate()?;
    let reference_year = config.require_reference_year()?;

    let ingested = ingest_files(paths, config.header_lines, config.workers).await;

    let mut stats = ExportStats::default();
    let mut store = MemoryStore::new();
    let mut sources: HashMap<String, PathBuf> = HashMap::new();
    let defaults = &config.record;

    for file in ingested {
        let identity = file.path.display().to_string();
        let samples = match file.samples {
            Ok(samples) if samples.is_empty() => {
                warn!("No data rows in {}", identity);
                stats.record_failure(identity, "no data rows after the header");
                continue;
            }
            Ok(samples) => samples,
            Err(e) => {
                stats.record_failure(identity, e.to_string());
                continue;
            }
        };

        let record = record_from_samples(
            &samples,
            reference_year,
            &defaults.units,
            &defaults.data_type,
            defaults.interval,
            defaults.key_for(&file.path),
        )?;

        // One CSV per reduced key, so a second file would merge into the first
        let series = record.key().reduced().to_string();
        if let Some(first) = sources.get(&series) {
            warn!("{} and {} both map to {}", first.display(), identity, series);
            stats.record_failure(
                identity,
                format!("same series {} as {}, skipped", series, first.display()),
            );
            continue;
        }
        sources.insert(series, file.path.clone());

        debug!("Loaded {} from {}", record.key(), identity);
        store.insert(StoredRecord::TimeSeries(record));
    }

    let connector = MemoryConnector::new(store);
    let exported = run_export(&connector, Path::new("text inputs"), config, selection)?;
    stats.merge(exported);
    stats.elapsed = start_time.elapsed();

    Ok(stats)
}

/// Time-step diagnosis of one input file
#[derive(Debug)]
pub struct FileDiagnosis {
    pub path: PathBuf,
    pub summary: Result<StepSummary>,
    /// Outcome of writing the difference CSV, when one was requested
    pub written: Option<Result<PathBuf>>,
}

/// Summarise the Julian-day steps of each file, optionally writing the
/// day-difference series of each as CSV into the output directory.
pub async fn diagnose_text_files(
    paths: &[PathBuf],
    config: &ExportConfig,
    write_csv: bool,
) -> Result<Vec<FileDiagnosis>> {
    config.validate()?;
    let ingested = ingest_files(paths, config.header_lines, config.workers).await;

    if write_csv && !config.dry_run {
        std::fs::create_dir_all(&config.output_dir)?;
    }

    let mut diagnoses = Vec::with_capacity(ingested.len());
    for file in ingested {
        let days: Vec<f64> = match file.samples {
            Ok(samples) => samples.iter().map(|s| s.julian_day).collect(),
            Err(e) => {
                diagnoses.push(FileDiagnosis {
                    path: file.path,
                    summary: Err(e),
                    written: None,
                });
                continue;
            }
        };

        let summary = StepSummary::from_days(&days);
        let written = if write_csv && !config.dry_run {
            Some(write_difference_csv(&file.path, &days, config))
        } else {
            None
        };

        diagnoses.push(FileDiagnosis {
            path: file.path,
            summary: Ok(summary),
            written,
        });
    }

    Ok(diagnoses)
}

fn write_difference_csv(path: &Path, days: &[f64], config: &ExportConfig) -> Result<PathBuf> {
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let key = config.record.key_for(path);

    let result = difference_record(days, &label, key).and_then(|record| {
        let destination = config.output_dir.join(record.key().reduced().to_filename());
        export_paired(&record, &destination).map(|()| destination)
    });

    if let Err(e) = &result {
        error!("Failed to write day differences for {}: {}", path.display(), e);
    }
    result
}

#[cfg(test)]
mod tests;
