//! Sample aggregation

use serde::{Deserialize, Serialize};

use crate::{AutobreakError, AutobreakResult, SampleSet};

/// Statistic used to reduce a sample set to one representative latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Arithmetic mean, failure penalties included
    Mean,
    /// Nearest-rank percentile, 1 to 100
    Percentile(u8),
}

impl Default for Statistic {
    fn default() -> Self {
        Statistic::Mean
    }
}

impl Statistic {
    /// Check the statistic's parameters
    pub fn validate(&self) -> AutobreakResult<()> {
        match self {
            Statistic::Mean => Ok(()),
            Statistic::Percentile(p) => check_percentile(*p),
        }
    }

    /// Reduce a sample set
    pub fn apply(&self, samples: &SampleSet) -> AutobreakResult<f64> {
        match self {
            Statistic::Mean => mean(samples.as_slice()),
            Statistic::Percentile(p) => percentile(samples.as_slice(), *p),
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Percentile(p) => write!(f, "p{}", p),
        }
    }
}

fn check_percentile(p: u8) -> AutobreakResult<()> {
    if !(1..=100).contains(&p) {
        return Err(AutobreakError::InvalidArgument(format!(
            "percentile must be between 1 and 100, got {}",
            p
        )));
    }
    Ok(())
}

/// Arithmetic mean of the data
pub fn mean(data: &[f64]) -> AutobreakResult<f64> {
    if data.is_empty() {
        return Err(AutobreakError::InvalidArgument(
            "mean of empty data".to_string(),
        ));
    }
    let sum: f64 = data.iter().sum();
    Ok(sum / data.len() as f64)
}

/// Nearest-rank percentile of the data
///
/// Sorts a copy ascending and returns the element at rank
/// `ceil(p / 100 * n) - 1`, so the result is always one of the inputs.
pub fn percentile(data: &[f64], p: u8) -> AutobreakResult<f64> {
    check_percentile(p)?;
    if data.is_empty() {
        return Err(AutobreakError::InvalidArgument(
            "percentile of empty data".to_string(),
        ));
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);

    // p >= 1 and n >= 1, so rank >= 1
    let rank = (p as usize * sorted.len()).div_ceil(100);
    Ok(sorted[rank - 1])
}
