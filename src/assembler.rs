//! Record assembly from converted timestamps, values and identity parts.

use crate::error::{ExportError, Result};
use crate::julian::{CalendarDateTime, julian_to_date};
use crate::models::{DataType, PairedDataRecord, Sample, TimeSeriesRecord};
use crate::path_key::PathKey;
use tracing::debug;

/// Build a time-series record.
///
/// `times` must already be sorted; the start and end times are taken from
/// the first and last elements without checking the order.
pub fn make_time_series_record(
    times: Vec<i64>,
    values: Vec<f64>,
    units: impl Into<String>,
    type_name: impl Into<String>,
    interval: i32,
    key: PathKey,
) -> Result<TimeSeriesRecord> {
    if times.len() != values.len() {
        return Err(ExportError::InvalidRecord {
            key: key.to_string(),
            reason: format!(
                "{} timestamps but {} values",
                times.len(),
                values.len()
            ),
        });
    }
    if times.is_empty() {
        return Err(ExportError::InvalidRecord {
            key: key.to_string(),
            reason: "a time series needs at least one value".to_string(),
        });
    }

    let type_name = type_name.into();
    Ok(TimeSeriesRecord {
        data_type: DataType::from_name(&type_name),
        key,
        times,
        values,
        units: units.into(),
        type_name,
        interval,
    })
}

/// Build a paired-data record with one labelled curve per entry of `curves`.
///
/// The C part of the record key is replaced by the first label.
pub fn make_paired_data_record(
    x: Vec<f64>,
    curves: Vec<Vec<f64>>,
    labels: Vec<String>,
    x_units: impl Into<String>,
    y_units: impl Into<String>,
    key: PathKey,
) -> Result<PairedDataRecord> {
    let invalid = |reason: String| ExportError::InvalidRecord {
        key: key.to_string(),
        reason,
    };

    if curves.is_empty() {
        return Err(invalid("paired data needs at least one curve".to_string()));
    }
    if labels.len() != curves.len() {
        return Err(invalid(format!(
            "{} labels for {} curves",
            labels.len(),
            curves.len()
        )));
    }
    if let Some((index, curve)) = curves.iter().enumerate().find(|(_, c)| c.len() != x.len()) {
        return Err(invalid(format!(
            "curve {} has {} ordinates, expected {}",
            index,
            curve.len(),
            x.len()
        )));
    }

    let key = PathKey {
        parameter: labels[0].clone(),
        ..key
    };

    Ok(PairedDataRecord {
        key,
        x,
        curves,
        labels,
        x_units: x_units.into(),
        y_units: y_units.into(),
    })
}

/// Convert every sample's Julian day and build a record from the result.
///
/// When the key has no time block, the block label of the first sample's
/// month is used.
pub fn record_from_samples(
    samples: &[Sample],
    reference_year: i32,
    units: &str,
    type_name: &str,
    interval: i32,
    key: PathKey,
) -> Result<TimeSeriesRecord> {
    let mut times = Vec::with_capacity(samples.len());
    let mut values = Vec::with_capacity(samples.len());
    let mut first_date: Option<CalendarDateTime> = None;

    for sample in samples {
        let date = julian_to_date(sample.julian_day, reference_year)?;
        let minutes = date.to_minutes().ok_or(ExportError::DateComputation {
            julian_day: sample.julian_day,
            day_of_year: date.day_of_year(),
            year: date.year(),
        })?;

        first_date.get_or_insert(date);
        times.push(minutes);
        values.push(sample.value);
    }

    let key = match first_date {
        Some(date) if key.block.is_empty() => PathKey {
            block: date.block_label(),
            ..key
        },
        _ => key,
    };

    debug!("Assembled {} samples for {}", times.len(), key);
    make_time_series_record(times, values, units, type_name, interval, key)
}
