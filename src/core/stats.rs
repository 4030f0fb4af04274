//! Summary statistics over a window of readings.

use crate::core::thresholds::ThresholdSet;
use crate::sensor::types::Reading;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Aggregate figures used by the report exporter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of readings summarised
    pub count: usize,
    /// Arithmetic mean (None when empty)
    pub mean: Option<f64>,
    /// Smallest value (None when empty)
    pub min: Option<f64>,
    /// Largest value (None when empty)
    pub max: Option<f64>,
    /// Sample standard deviation (None with fewer than two readings)
    pub std_dev: Option<f64>,
    /// Readings strictly above the upper specification limit
    pub exceedances: usize,
}

/// Summarise readings against a threshold set.
pub fn summarize<'a, I>(readings: I, thresholds: &ThresholdSet) -> SummaryStatistics
where
    I: IntoIterator<Item = &'a Reading>,
{
    let values: Vec<f64> = readings.into_iter().map(|r| r.value).collect();
    if values.is_empty() {
        return SummaryStatistics::default();
    }

    let exceedances = values.iter().filter(|&&v| v > thresholds.usl).count();
    let std_dev = if values.len() > 1 {
        Some(Statistics::std_dev(values.iter()))
    } else {
        None
    };

    SummaryStatistics {
        count: values.len(),
        mean: Some(Statistics::mean(values.iter())),
        min: Some(Statistics::min(values.iter())),
        max: Some(Statistics::max(values.iter())),
        std_dev,
        exceedances,
    }
}

/// Mean of a slice of values, `None` when empty.
pub(crate) fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(Statistics::mean(values.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(values: &[f64]) -> Vec<Reading> {
        values.iter().map(|&v| Reading::new(v)).collect()
    }

    #[test]
    fn test_summary_of_window() {
        let limits = ThresholdSet::new(300.0, 400.0, 700.0, 800.0);
        let window = readings(&[650.0, 750.0, 850.0, 900.0]);

        let summary = summarize(&window, &limits);
        assert_eq!(summary.count, 4);
        assert!((summary.mean.unwrap() - 787.5).abs() < 1e-9);
        assert_eq!(summary.min, Some(650.0));
        assert_eq!(summary.max, Some(900.0));
        assert_eq!(summary.exceedances, 2);
        assert!(summary.std_dev.unwrap() > 0.0);
    }

    #[test]
    fn test_reading_at_usl_is_not_an_exceedance() {
        let limits = ThresholdSet::new(0.0, 1.0, 8.0, 15.0);
        let summary = summarize(&readings(&[15.0, 15.5]), &limits);
        assert_eq!(summary.exceedances, 1);
    }

    #[test]
    fn test_empty_summary() {
        let limits = ThresholdSet::new(0.0, 1.0, 2.0, 3.0);
        let summary = summarize(&[], &limits);
        assert_eq!(summary, SummaryStatistics::default());
        assert!(summary.mean.is_none());
    }

    #[test]
    fn test_single_reading_has_no_spread() {
        let limits = ThresholdSet::new(0.0, 1.0, 2.0, 3.0);
        let summary = summarize(&readings(&[2.5]), &limits);
        assert_eq!(summary.count, 1);
        assert!(summary.std_dev.is_none());
        assert_eq!(mean_of(&[2.0, 4.0]), Some(3.0));
        assert_eq!(mean_of(&[]), None);
    }
}
