//! Error handling tests: per-record failures, fatal errors and store release

use crate::assembler::make_time_series_record;
use crate::config::{ExportConfig, TimeWindow};
use crate::error::{ExportError, Result};
use crate::models::ExportStats;
use crate::path_key::PathKey;
use crate::processor::{BatchExporter, run_export};
use crate::store::{StoreConnector, StoredRecord, TimeSeriesStore};
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

/// Store serving a fixed catalog, failing reads of one parameter and
/// counting how often it is closed
struct MockStore {
    identities: Vec<String>,
    failing_parameter: Option<String>,
    window_error: bool,
    closes: Rc<Cell<usize>>,
}

impl TimeSeriesStore for MockStore {
    fn list_all_identities(&self) -> Result<Vec<String>> {
        Ok(self.identities.clone())
    }

    fn fetch(&mut self, key: &PathKey) -> Result<StoredRecord> {
        if self.failing_parameter.as_deref() == Some(key.parameter.as_str()) {
            return Err(ExportError::store_read(key.to_string(), "checksum mismatch"));
        }
        let record = make_time_series_record(
            vec![41639 * 1440],
            vec![1.0],
            "cms",
            "INST-VAL",
            60,
            key.clone(),
        )?;
        Ok(StoredRecord::TimeSeries(record))
    }

    fn set_time_window(&mut self, _start: i64, _end: i64) -> Result<()> {
        if self.window_error {
            return Err(ExportError::configuration("store rejects time windows"));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

struct MockConnector {
    identities: Vec<&'static str>,
    failing_parameter: Option<&'static str>,
    window_error: bool,
    closes: Rc<Cell<usize>>,
}

impl MockConnector {
    fn new(identities: Vec<&'static str>) -> Self {
        Self {
            identities,
            failing_parameter: None,
            window_error: false,
            closes: Rc::new(Cell::new(0)),
        }
    }

    fn closes(&self) -> usize {
        self.closes.get()
    }
}

impl StoreConnector for MockConnector {
    type Store = MockStore;

    fn open(&self, _source: &Path) -> Result<MockStore> {
        Ok(MockStore {
            identities: self.identities.iter().map(|s| s.to_string()).collect(),
            failing_parameter: self.failing_parameter.map(str::to_string),
            window_error: self.window_error,
            closes: self.closes.clone(),
        })
    }
}

fn config(output_dir: &Path) -> ExportConfig {
    ExportConfig::default()
        .with_output_dir(output_dir)
        .without_progress()
}

fn export(connector: &MockConnector, output_dir: &Path) -> Result<ExportStats> {
    run_export(connector, Path::new("crso.dss"), &config(output_dir), None)
}

const CATALOG: [&str; 4] = [
    "/CRSO/DWR/FLOW-IN/01JAN2014/1HOUR/OBS/",
    "/CRSO/DWR/FLOW-IN/01FEB2014/1HOUR/OBS/",
    "/CRSO/DWR/FLOW-OUT/01JAN2014/1HOUR/OBS/",
    "/CRSO/DWR/ELEV/01JAN2014/1HOUR/OBS/",
];

#[test]
fn test_success_closes_store_once() {
    let temp_dir = TempDir::new().unwrap();
    let connector = MockConnector::new(CATALOG.to_vec());

    let stats = export(&connector, temp_dir.path()).unwrap();

    assert_eq!(stats.records_succeeded, 3);
    assert_eq!(connector.closes(), 1);
}

#[test]
fn test_read_failure_is_scoped_to_one_record() {
    let temp_dir = TempDir::new().unwrap();
    let mut connector = MockConnector::new(CATALOG.to_vec());
    connector.failing_parameter = Some("FLOW-OUT");

    let stats = export(&connector, temp_dir.path()).unwrap();

    assert_eq!(stats.records_succeeded, 2);
    assert_eq!(stats.records_failed, 1);
    assert_eq!(stats.failures[0].identity, "/CRSO/DWR/FLOW-OUT//1HOUR/OBS/");
    assert!(stats.failures[0].message.contains("checksum mismatch"));
    assert!(temp_dir.path().join("CRSO%ELEV%OBS.csv").is_file());
    assert_eq!(connector.closes(), 1);
}

#[test]
fn test_write_failure_is_scoped_to_one_record() {
    let temp_dir = TempDir::new().unwrap();
    // A directory where the CSV file should go cannot be replaced
    fs::create_dir_all(temp_dir.path().join("CRSO%FLOW-IN%OBS.csv")).unwrap();
    let connector = MockConnector::new(CATALOG.to_vec());

    let stats = export(&connector, temp_dir.path()).unwrap();

    assert_eq!(stats.records_succeeded, 2);
    assert_eq!(stats.records_failed, 1);
    assert!(stats.failures[0].message.contains("CRSO%FLOW-IN%OBS.csv"));
    assert_eq!(connector.closes(), 1);
}

#[test]
fn test_malformed_catalog_key_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let connector = MockConnector::new(vec![
        "/CRSO/DWR/FLOW-IN/01JAN2014/1HOUR/OBS/",
        "/CRSO/DWR/FLOW-IN/1HOUR/OBS/",
    ]);

    let err = export(&connector, temp_dir.path()).unwrap_err();

    assert!(matches!(err, ExportError::MalformedKey { found: 5, .. }));
    assert!(!temp_dir.path().join("CRSO%FLOW-IN%OBS.csv").exists());
    assert_eq!(connector.closes(), 1);
}

#[test]
fn test_window_rejected_by_store_still_closes() {
    let temp_dir = TempDir::new().unwrap();
    let mut connector = MockConnector::new(CATALOG.to_vec());
    connector.window_error = true;
    let config = config(temp_dir.path())
        .with_time_window(TimeWindow::new("01Jan2014", "02Jan2014"));

    let err = run_export(&connector, Path::new("crso.dss"), &config, None).unwrap_err();

    assert!(matches!(err, ExportError::Configuration { .. }));
    assert_eq!(connector.closes(), 1);
}

#[test]
fn test_invalid_window_fails_before_opening() {
    let temp_dir = TempDir::new().unwrap();
    let connector = MockConnector::new(CATALOG.to_vec());
    let config =
        config(temp_dir.path()).with_time_window(TimeWindow::new("31Feb2014", "01Mar2014"));

    let err = run_export(&connector, Path::new("crso.dss"), &config, None).unwrap_err();

    assert!(matches!(err, ExportError::InvalidDateTime { .. }));
    assert_eq!(connector.closes(), 0);
}

#[test]
fn test_selected_keys_skip_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let connector = MockConnector::new(vec!["not a key"]);
    let selection = [PathKey::parse("/CRSO/DWR/ELEV//1HOUR/OBS/").unwrap()];

    let stats = run_export(
        &connector,
        Path::new("crso.dss"),
        &config(temp_dir.path()),
        Some(&selection),
    )
    .unwrap();

    assert_eq!(stats.records_succeeded, 1);
    assert_eq!(connector.closes(), 1);
}

#[test]
fn test_batch_exporter_counts_every_record() {
    let temp_dir = TempDir::new().unwrap();
    let connector = MockConnector::new(CATALOG.to_vec());
    let mut store = connector.open(Path::new("crso.dss")).unwrap();
    store.failing_parameter = Some("ELEV".to_string());

    let stats = BatchExporter::new(temp_dir.path())
        .export_all(&mut store)
        .unwrap();

    assert_eq!(stats.total(), 3);
    assert_eq!(stats.files_written.len(), 2);
    // Closing is left to the caller without a session
    assert_eq!(connector.closes(), 0);
}
