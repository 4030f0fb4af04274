//! Reading and gas types shared by producers, classifiers and exporters.

use crate::core::thresholds::ThresholdSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A monitored gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gas {
    So2,
    Co2,
    Co,
    H2s,
    O2,
}

impl Gas {
    /// All gases, in dashboard order.
    pub const ALL: [Gas; 5] = [Gas::So2, Gas::Co2, Gas::Co, Gas::H2s, Gas::O2];

    /// Lowercase identifier used in config files and URLs.
    pub fn id(&self) -> &'static str {
        match self {
            Gas::So2 => "so2",
            Gas::Co2 => "co2",
            Gas::Co => "co",
            Gas::H2s => "h2s",
            Gas::O2 => "o2",
        }
    }

    /// Chemical formula for display.
    pub fn formula(&self) -> &'static str {
        match self {
            Gas::So2 => "SO₂",
            Gas::Co2 => "CO₂",
            Gas::Co => "CO",
            Gas::H2s => "H₂S",
            Gas::O2 => "O₂",
        }
    }

    /// Measurement unit of this gas' readings.
    pub fn unit(&self) -> &'static str {
        match self {
            Gas::O2 => "%",
            _ => "ppm",
        }
    }

    /// Factory calibration limits used until the operator edits them.
    pub fn default_thresholds(&self) -> ThresholdSet {
        match self {
            Gas::So2 => ThresholdSet::new(300.0, 400.0, 700.0, 800.0),
            Gas::Co2 => ThresholdSet::new(250.0, 300.0, 1000.0, 5000.0),
            Gas::Co => ThresholdSet::new(0.0, 2.0, 25.0, 50.0),
            Gas::H2s => ThresholdSet::new(0.0, 1.0, 8.0, 15.0),
            Gas::O2 => ThresholdSet::new(19.5, 20.0, 22.0, 23.5),
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.formula())
    }
}

/// Error returned when a gas identifier is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGasName(pub String);

impl fmt::Display for UnknownGasName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown gas '{}' (expected one of: so2, co2, co, h2s, o2)",
            self.0
        )
    }
}

impl std::error::Error for UnknownGasName {}

impl FromStr for Gas {
    type Err = UnknownGasName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace('₂', "2")
            .replace(['_', '-'], "");
        match normalized.as_str() {
            "so2" => Ok(Gas::So2),
            "co2" => Ok(Gas::Co2),
            "co" => Ok(Gas::Co),
            "h2s" => Ok(Gas::H2s),
            "o2" => Ok(Gas::O2),
            _ => Err(UnknownGasName(s.to_string())),
        }
    }
}

/// A single timestamped sensor measurement.
///
/// Readings are immutable once created. Values are not range-checked: an
/// out-of-range value is a legitimate observation and gets classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the measurement was taken
    pub timestamp: DateTime<Utc>,
    /// Measured concentration in the gas' unit
    pub value: f64,
    /// Optional monitoring zone the sensor belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl Reading {
    /// Create a reading taken now.
    pub fn new(value: f64) -> Self {
        Self::at(Utc::now(), value)
    }

    /// Create a reading with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            zone: None,
        }
    }

    /// Tag the reading with a monitoring zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

/// A reading produced for a specific gas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEvent {
    pub gas: Gas,
    pub reading: Reading,
}

impl SensorEvent {
    pub fn new(gas: Gas, reading: Reading) -> Self {
        Self { gas, reading }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.reading.timestamp
    }
}
