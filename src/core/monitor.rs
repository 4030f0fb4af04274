//! Multi-gas monitor: one classifier per monitored gas.

use crate::config::Config;
use crate::core::classifier::{ClassifierSnapshot, SensorWindowClassifier};
use crate::core::thresholds::{Assessment, MonitorError, ThresholdSet};
use crate::sensor::types::{Gas, Reading, SensorEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Status of a single gas, as shown on a dashboard card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasStatus {
    pub gas: Gas,
    pub unit: String,
    /// Latest value formatted for display, "N/A" when there is none
    pub display: String,
    #[serde(flatten)]
    pub snapshot: ClassifierSnapshot,
}

impl GasStatus {
    fn new(gas: Gas, snapshot: ClassifierSnapshot) -> Self {
        let display = match &snapshot.latest {
            Some(reading) => format!("{:.1} {}", reading.value, gas.unit()),
            None => "N/A".to_string(),
        };
        Self {
            gas,
            unit: gas.unit().to_string(),
            display,
            snapshot,
        }
    }
}

/// Status of every monitored gas plus the combined risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub taken_at: DateTime<Utc>,
    pub overall: Assessment,
    pub gases: Vec<GasStatus>,
}

/// Set of per-gas classifiers.
#[derive(Debug)]
pub struct GasMonitor {
    classifiers: BTreeMap<Gas, SensorWindowClassifier>,
}

/// Thread-safe shared monitor.
pub type SharedMonitor = Arc<GasMonitor>;

impl GasMonitor {
    /// Create a monitor for the given gases and their thresholds.
    pub fn new<I>(capacity: usize, thresholds: I) -> Result<Self, MonitorError>
    where
        I: IntoIterator<Item = (Gas, ThresholdSet)>,
    {
        let classifiers = thresholds
            .into_iter()
            .map(|(gas, limits)| SensorWindowClassifier::new(capacity, limits).map(|c| (gas, c)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { classifiers })
    }

    /// Build a monitor for the gases and thresholds in a configuration.
    pub fn from_config(config: &Config) -> Result<Self, MonitorError> {
        Self::new(
            config.capacity,
            config
                .sensors
                .gases()
                .into_iter()
                .map(|gas| (gas, config.thresholds_for(gas))),
        )
    }

    /// Monitored gases in dashboard order.
    pub fn gases(&self) -> Vec<Gas> {
        self.classifiers.keys().copied().collect()
    }

    /// The classifier of a gas.
    pub fn classifier(&self, gas: Gas) -> Result<&SensorWindowClassifier, MonitorError> {
        self.classifiers
            .get(&gas)
            .ok_or(MonitorError::UnknownGas(gas))
    }

    /// Append a reading and return the resulting classification.
    pub fn record(&self, gas: Gas, reading: Reading) -> Result<Assessment, MonitorError> {
        let classifier = self.classifier(gas)?;
        classifier.append(reading);
        Ok(classifier.classify())
    }

    /// Append a producer event.
    pub fn record_event(&self, event: SensorEvent) -> Result<Assessment, MonitorError> {
        self.record(event.gas, event.reading)
    }

    /// Most severe classification across all gases.
    pub fn overall(&self) -> Assessment {
        self.classifiers
            .values()
            .map(SensorWindowClassifier::classify)
            .fold(Assessment::InsufficientData, Assessment::worst)
    }

    /// Dashboard status of a single gas.
    pub fn status(&self, gas: Gas) -> Result<GasStatus, MonitorError> {
        Ok(GasStatus::new(gas, self.classifier(gas)?.snapshot()))
    }

    /// Status of every gas.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let gases: Vec<GasStatus> = self
            .classifiers
            .iter()
            .map(|(gas, classifier)| GasStatus::new(*gas, classifier.snapshot()))
            .collect();
        let overall = gases
            .iter()
            .map(|status| status.snapshot.assessment)
            .fold(Assessment::InsufficientData, Assessment::worst);

        MonitorSnapshot {
            taken_at: Utc::now(),
            overall,
            gases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::thresholds::RiskLevel;

    fn monitor() -> GasMonitor {
        GasMonitor::new(
            10,
            [Gas::So2, Gas::H2s].map(|gas| (gas, gas.default_thresholds())),
        )
        .unwrap()
    }

    #[test]
    fn test_overall_is_worst_gas() {
        let monitor = monitor();
        assert_eq!(monitor.overall(), Assessment::InsufficientData);

        monitor.record(Gas::So2, Reading::new(500.0)).unwrap();
        assert_eq!(monitor.overall(), Assessment::Risk(RiskLevel::Safe));

        let h2s = monitor.record(Gas::H2s, Reading::new(9.0)).unwrap();
        assert_eq!(h2s, Assessment::Risk(RiskLevel::Warning));
        assert_eq!(monitor.overall(), Assessment::Risk(RiskLevel::Warning));

        monitor.record(Gas::H2s, Reading::new(16.0)).unwrap();
        assert_eq!(monitor.snapshot().overall, Assessment::Risk(RiskLevel::Danger));
    }

    #[test]
    fn test_unknown_gas_is_rejected() {
        let monitor = monitor();
        assert_eq!(
            monitor.record(Gas::Co, Reading::new(1.0)),
            Err(MonitorError::UnknownGas(Gas::Co))
        );
        assert!(monitor.status(Gas::O2).is_err());
    }

    #[test]
    fn test_status_display() {
        let monitor = monitor();
        assert_eq!(monitor.status(Gas::So2).unwrap().display, "N/A");

        monitor.record(Gas::So2, Reading::new(512.34)).unwrap();
        let status = monitor.status(Gas::So2).unwrap();
        assert_eq!(status.display, "512.3 ppm");
        assert_eq!(status.unit, "ppm");
    }

    #[test]
    fn test_from_config_uses_selected_gases() {
        let mut config = Config::default();
        config.sensors = crate::config::SensorSelection::from_csv("so2,o2");
        config.capacity = 144;

        let monitor = GasMonitor::from_config(&config).unwrap();
        assert_eq!(monitor.gases(), vec![Gas::So2, Gas::O2]);
        assert_eq!(monitor.classifier(Gas::So2).unwrap().capacity(), 144);
    }
}
