//! Time-step diagnostics for Julian-day indexed series.
//!
//! The spacing between consecutive Julian days shows gaps, duplicated
//! rows and irregular output intervals in W2 files.

use crate::assembler::make_paired_data_record;
use crate::constants::{DAY_DIFFERENCE_UNITS, JULIAN_DAY_UNITS};
use crate::error::Result;
use crate::models::PairedDataRecord;
use crate::path_key::PathKey;

/// `result[i] = values[i + 1] - values[i]`; empty for fewer than two values
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Paired-data record of each Julian day against the step to the next one.
///
/// X is every day but the last, so both sequences have `n - 1` ordinates.
pub fn difference_record(days: &[f64], label: &str, key: PathKey) -> Result<PairedDataRecord> {
    let steps = first_differences(days);
    let x = days[..steps.len()].to_vec();

    make_paired_data_record(
        x,
        vec![steps],
        vec![label.to_string()],
        JULIAN_DAY_UNITS,
        DAY_DIFFERENCE_UNITS,
        key,
    )
}

/// Summary of the steps between consecutive Julian days
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    pub samples: usize,
    pub min_step: Option<f64>,
    pub max_step: Option<f64>,
    pub mean_step: Option<f64>,
    /// Steps that differ from the first step by more than the tolerance
    pub irregular_steps: usize,
    /// Steps that are zero or negative
    pub non_increasing_steps: usize,
}

impl StepSummary {
    const TOLERANCE: f64 = 1e-6;

    pub fn from_days(days: &[f64]) -> Self {
        let steps = first_differences(days);
        let first = steps.first().copied();

        let min_step = steps.iter().copied().reduce(f64::min);
        let max_step = steps.iter().copied().reduce(f64::max);
        let mean_step = (!steps.is_empty()).then(|| steps.iter().sum::<f64>() / steps.len() as f64);

        let irregular_steps = first.map_or(0, |first| {
            steps
                .iter()
                .filter(|step| (*step - first).abs() > Self::TOLERANCE)
                .count()
        });
        let non_increasing_steps = steps.iter().filter(|step| **step <= 0.0).count();

        Self {
            samples: days.len(),
            min_step,
            max_step,
            mean_step,
            irregular_steps,
            non_increasing_steps,
        }
    }

    pub fn is_regular(&self) -> bool {
        self.irregular_steps == 0
    }
}
