//! Rolling sensor window paired with its active threshold set.
//!
//! One mutex guards both the window and the thresholds, so an append, a
//! threshold update and a classification never observe each other half
//! done. Readers get owned copies; nothing outside this type can alias the
//! window.

use crate::core::stats::{mean_of, summarize, SummaryStatistics};
use crate::core::thresholds::{Assessment, LimitBand, MonitorError, ThresholdSet};
use crate::core::window::{SensorWindow, WindowState};
use crate::sensor::types::Reading;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct ClassifierState {
    window: SensorWindow,
    thresholds: ThresholdSet,
}

/// Windowed aggregate over the most recent span of readings.
///
/// Reported alongside the point classification; it does not feed back into
/// [`SensorWindowClassifier::classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedAssessment {
    /// Length of the span in seconds
    pub span_secs: i64,
    /// Readings inside the span
    pub count: usize,
    /// Mean value inside the span
    pub mean: Option<f64>,
    /// Classification of the mean
    pub assessment: Assessment,
    /// Mean per zone inside the span
    pub zone_averages: BTreeMap<String, f64>,
    /// Zone with the highest mean
    pub worst_zone: Option<String>,
}

/// Consistent view of a classifier taken under a single lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSnapshot {
    pub latest: Option<Reading>,
    pub assessment: Assessment,
    pub band: Option<LimitBand>,
    pub thresholds: ThresholdSet,
    pub summary: SummaryStatistics,
    pub state: WindowState,
    pub capacity: usize,
}

/// Fixed-capacity reading window with threshold classification.
#[derive(Debug)]
pub struct SensorWindowClassifier {
    state: Mutex<ClassifierState>,
}

impl SensorWindowClassifier {
    /// Create an empty classifier.
    pub fn new(capacity: usize, thresholds: ThresholdSet) -> Result<Self, MonitorError> {
        thresholds.validate()?;
        Ok(Self {
            state: Mutex::new(ClassifierState {
                window: SensorWindow::new(capacity),
                thresholds,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ClassifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a reading, evicting the oldest one when at capacity.
    pub fn append(&self, reading: Reading) {
        self.lock().window.push(reading);
    }

    /// Append several readings in order, e.g. synthetic history.
    pub fn extend<I: IntoIterator<Item = Reading>>(&self, readings: I) {
        let mut state = self.lock();
        for reading in readings {
            state.window.push(reading);
        }
    }

    /// Most recently appended reading.
    pub fn latest(&self) -> Option<Reading> {
        self.lock().window.latest().cloned()
    }

    /// Classify the latest reading against the active thresholds.
    pub fn classify(&self) -> Assessment {
        let state = self.lock();
        assess(&state.window, &state.thresholds)
    }

    /// Classify the latest reading against an explicit threshold set.
    pub fn classify_with(&self, thresholds: &ThresholdSet) -> Assessment {
        assess(&self.lock().window, thresholds)
    }

    /// Aggregate the readings of the last `span` and classify their mean.
    ///
    /// The span is measured back from the newest timestamp in the window,
    /// so a late reading carrying an older timestamp does not move it.
    pub fn classify_windowed(&self, span: Duration) -> WindowedAssessment {
        let state = self.lock();
        let span_secs = span.num_seconds();

        let Some(newest) = state.window.iter().map(|r| r.timestamp).max() else {
            return WindowedAssessment {
                span_secs,
                count: 0,
                mean: None,
                assessment: Assessment::InsufficientData,
                zone_averages: BTreeMap::new(),
                worst_zone: None,
            };
        };

        let cutoff = newest - span;
        let recent: Vec<&Reading> = state.window.since(cutoff).collect();
        let values: Vec<f64> = recent.iter().map(|r| r.value).collect();
        let mean = mean_of(&values);

        let mut by_zone: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for reading in &recent {
            if let Some(zone) = &reading.zone {
                by_zone.entry(zone.clone()).or_default().push(reading.value);
            }
        }
        let zone_averages: BTreeMap<String, f64> = by_zone
            .into_iter()
            .filter_map(|(zone, values)| mean_of(&values).map(|m| (zone, m)))
            .collect();
        let worst_zone = zone_averages
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(zone, _)| zone.clone());

        WindowedAssessment {
            span_secs,
            count: values.len(),
            mean,
            assessment: mean
                .map(|m| Assessment::Risk(state.thresholds.classify(m)))
                .unwrap_or(Assessment::InsufficientData),
            zone_averages,
            worst_zone,
        }
    }

    /// Replace the active thresholds, returning the stored set.
    ///
    /// An invalid set is rejected and the previous thresholds stay active.
    pub fn update_thresholds(&self, thresholds: ThresholdSet) -> Result<ThresholdSet, MonitorError> {
        thresholds.validate()?;
        let mut state = self.lock();
        state.thresholds = thresholds;
        Ok(state.thresholds)
    }

    /// The active thresholds.
    pub fn thresholds(&self) -> ThresholdSet {
        self.lock().thresholds
    }

    /// Summary statistics over the whole window.
    pub fn summary_statistics(&self) -> SummaryStatistics {
        let state = self.lock();
        summarize(state.window.iter(), &state.thresholds)
    }

    /// Readings in append order.
    pub fn readings(&self) -> Vec<Reading> {
        self.lock().window.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().window.capacity()
    }

    pub fn state(&self) -> WindowState {
        self.lock().window.state()
    }

    /// Everything a renderer needs, read atomically.
    pub fn snapshot(&self) -> ClassifierSnapshot {
        let state = self.lock();
        let latest = state.window.latest().cloned();
        ClassifierSnapshot {
            assessment: assess(&state.window, &state.thresholds),
            band: latest.as_ref().map(|r| state.thresholds.band(r.value)),
            latest,
            thresholds: state.thresholds,
            summary: summarize(state.window.iter(), &state.thresholds),
            state: state.window.state(),
            capacity: state.window.capacity(),
        }
    }
}

fn assess(window: &SensorWindow, thresholds: &ThresholdSet) -> Assessment {
    match window.latest() {
        Some(reading) => Assessment::Risk(thresholds.classify(reading.value)),
        None => Assessment::InsufficientData,
    }
}
