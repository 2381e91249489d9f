//! Time-series store access.
//!
//! Exports read records from a store addressed by [`PathKey`]. A store is
//! opened through a [`StoreConnector`] and held in a [`StoreSession`],
//! which closes it exactly once when the session ends, whatever the
//! outcome of the export.
//!
//! [`MemoryStore`] keeps records in process. Records are stored per time
//! block; fetching a reduced key merges every block of that series.

use crate::error::{ExportError, Result};
use crate::models::{PairedDataRecord, TimeSeriesRecord};
use crate::path_key::PathKey;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tracing::{debug, warn};

/// Record held by a store
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    TimeSeries(TimeSeriesRecord),
    PairedData(PairedDataRecord),
}

impl StoredRecord {
    pub fn key(&self) -> &PathKey {
        match self {
            StoredRecord::TimeSeries(record) => record.key(),
            StoredRecord::PairedData(record) => record.key(),
        }
    }

    /// The time series, or a read error naming `requested` for paired data
    pub fn into_time_series(self, requested: &PathKey) -> Result<TimeSeriesRecord> {
        match self {
            StoredRecord::TimeSeries(record) => Ok(record),
            StoredRecord::PairedData(_) => Err(ExportError::store_read(
                requested.to_string(),
                "record holds paired data, not a time series",
            )),
        }
    }
}

/// Source of stored records
pub trait TimeSeriesStore {
    /// Raw six-part keys of every stored record, one per time block
    fn list_all_identities(&self) -> Result<Vec<String>>;

    fn fetch(&mut self, key: &PathKey) -> Result<StoredRecord>;

    /// Limit fetched time series to timestamps in `[start, end]`
    fn set_time_window(&mut self, start: i64, end: i64) -> Result<()>;

    fn close(&mut self);
}

/// Opens stores from a source location
pub trait StoreConnector {
    type Store: TimeSeriesStore;

    fn open(&self, source: &Path) -> Result<Self::Store>;
}

/// Open store that is closed when the session is dropped
#[derive(Debug)]
pub struct StoreSession<S: TimeSeriesStore> {
    store: S,
    closed: bool,
}

impl<S: TimeSeriesStore> StoreSession<S> {
    pub fn open<C>(connector: &C, source: &Path) -> Result<Self>
    where
        C: StoreConnector<Store = S>,
    {
        let store = connector.open(source)?;
        debug!("Opened store {}", source.display());
        Ok(Self::new(store))
    }

    /// Take ownership of an already open store
    pub fn new(store: S) -> Self {
        Self {
            store,
            closed: false,
        }
    }

    /// Close the store now instead of at drop
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.store.close();
            debug!("Closed store");
        }
    }
}

impl<S: TimeSeriesStore> Deref for StoreSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S: TimeSeriesStore> DerefMut for StoreSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: TimeSeriesStore> Drop for StoreSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// In-process store of time-series and paired-data blocks
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<StoredRecord>,
    window: Option<(i64, i64)>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any record with the same full key
    pub fn insert(&mut self, record: StoredRecord) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.key() == record.key()) {
            warn!("Replacing stored record {}", record.key());
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn merge_blocks(&self, key: &PathKey) -> Result<StoredRecord> {
        let blocks: Vec<&StoredRecord> = self
            .records
            .iter()
            .filter(|record| record.key().reduced() == *key)
            .collect();

        let series: Vec<&TimeSeriesRecord> = blocks
            .iter()
            .filter_map(|record| match record {
                StoredRecord::TimeSeries(series) => Some(series),
                StoredRecord::PairedData(_) => None,
            })
            .collect();

        let Some(first) = series.first() else {
            return blocks
                .first()
                .map(|record| (*record).clone())
                .ok_or_else(|| ExportError::store_read(key.to_string(), "record not found"));
        };

        let mut samples: Vec<(i64, f64)> = series.iter().flat_map(|s| s.samples()).collect();
        samples.sort_by_key(|(time, _)| *time);
        let (times, values): (Vec<i64>, Vec<f64>) = samples.into_iter().unzip();

        debug!("Merged {} blocks for {}", series.len(), key);
        Ok(StoredRecord::TimeSeries(TimeSeriesRecord {
            key: key.clone(),
            times,
            values,
            ..(*first).clone()
        }))
    }

    fn apply_window(&self, record: StoredRecord) -> Result<StoredRecord> {
        match (record, self.window) {
            (StoredRecord::TimeSeries(series), Some((start, end))) => {
                let windowed = series.windowed(start, end);
                if windowed.number_values() == 0 {
                    return Err(ExportError::store_read(
                        series.key().to_string(),
                        "no values inside the time window",
                    ));
                }
                Ok(StoredRecord::TimeSeries(windowed))
            }
            (record, _) => Ok(record),
        }
    }
}

impl TimeSeriesStore for MemoryStore {
    fn list_all_identities(&self) -> Result<Vec<String>> {
        Ok(self.records.iter().map(|r| r.key().to_string()).collect())
    }

    fn fetch(&mut self, key: &PathKey) -> Result<StoredRecord> {
        if self.closed {
            return Err(ExportError::store_read(key.to_string(), "store is closed"));
        }

        let record = if key.is_reduced() {
            self.merge_blocks(key)?
        } else {
            self.records
                .iter()
                .find(|record| record.key() == key)
                .cloned()
                .ok_or_else(|| ExportError::store_read(key.to_string(), "record not found"))?
        };

        self.apply_window(record)
    }

    fn set_time_window(&mut self, start: i64, end: i64) -> Result<()> {
        if start > end {
            return Err(ExportError::configuration(format!(
                "time window starts after it ends ({} > {})",
                start, end
            )));
        }
        self.window = Some((start, end));
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Connector handing out copies of a prepared [`MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

impl StoreConnector for MemoryConnector {
    type Store = MemoryStore;

    fn open(&self, source: &Path) -> Result<MemoryStore> {
        debug!(
            "Opening in-memory store for {} ({} records)",
            source.display(),
            self.store.len()
        );
        Ok(self.store.clone())
    }
}
