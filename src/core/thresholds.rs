//! Calibration limits and the risk rule applied against them.
//!
//! The rule is one-sided: only the upper limits can raise the risk level.
//! Values under the lower limits are reported through [`LimitBand`] for
//! chart annotation but never change the label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four calibration limits of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Lower specification limit
    pub lsl: f64,
    /// Lower control limit
    pub lcl: f64,
    /// Upper control limit
    pub ucl: f64,
    /// Upper specification limit
    pub usl: f64,
}

impl ThresholdSet {
    pub const fn new(lsl: f64, lcl: f64, ucl: f64, usl: f64) -> Self {
        Self { lsl, lcl, ucl, usl }
    }

    /// Check `lsl <= lcl <= ucl <= usl` with every limit finite.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let limits = [self.lsl, self.lcl, self.ucl, self.usl];
        let finite = limits.iter().all(|v| v.is_finite());
        let ordered = limits.windows(2).all(|pair| pair[0] <= pair[1]);
        if finite && ordered {
            Ok(())
        } else {
            Err(MonitorError::InvalidThresholdOrdering { thresholds: *self })
        }
    }

    /// Classify a value. Most severe check first; comparisons are strict.
    pub fn classify(&self, value: f64) -> RiskLevel {
        if value > self.usl {
            RiskLevel::Danger
        } else if value > self.ucl {
            RiskLevel::Warning
        } else {
            RiskLevel::Safe
        }
    }

    /// Position of a value relative to all four limits.
    pub fn band(&self, value: f64) -> LimitBand {
        if value > self.usl {
            LimitBand::AboveUsl
        } else if value > self.ucl {
            LimitBand::AboveUcl
        } else if value < self.lsl {
            LimitBand::BelowLsl
        } else if value < self.lcl {
            LimitBand::BelowLcl
        } else {
            LimitBand::WithinControl
        }
    }
}

impl fmt::Display for ThresholdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LSL {} | LCL {} | UCL {} | USL {}",
            self.lsl, self.lcl, self.ucl, self.usl
        )
    }
}

/// Three-level risk label, ordered `Safe < Warning < Danger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Warning,
    Danger,
}

impl RiskLevel {
    /// Indicator color shown next to the label.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "green",
            RiskLevel::Warning => "orange",
            RiskLevel::Danger => "red",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Safe => "Safe",
            RiskLevel::Warning => "Warning",
            RiskLevel::Danger => "Danger",
        };
        f.write_str(label)
    }
}

/// Outcome of a classification request.
///
/// `InsufficientData` is returned instead of fabricating a label when there
/// is nothing to classify; it displays as "N/A".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "level", rename_all = "snake_case")]
pub enum Assessment {
    InsufficientData,
    Risk(RiskLevel),
}

impl Assessment {
    /// The risk level, or `EmptyWindow` for the no-data sentinel.
    pub fn risk(&self) -> Result<RiskLevel, MonitorError> {
        match self {
            Assessment::Risk(level) => Ok(*level),
            Assessment::InsufficientData => Err(MonitorError::EmptyWindow),
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Assessment::InsufficientData)
    }

    /// Label for display; "N/A" when there is no data.
    pub fn label(&self) -> String {
        match self {
            Assessment::Risk(level) => level.to_string(),
            Assessment::InsufficientData => "N/A".to_string(),
        }
    }

    /// Combine two assessments, keeping the more severe known level.
    pub fn worst(self, other: Assessment) -> Assessment {
        match (self, other) {
            (Assessment::Risk(a), Assessment::Risk(b)) => Assessment::Risk(a.max(b)),
            (Assessment::Risk(a), Assessment::InsufficientData)
            | (Assessment::InsufficientData, Assessment::Risk(a)) => Assessment::Risk(a),
            (Assessment::InsufficientData, Assessment::InsufficientData) => {
                Assessment::InsufficientData
            }
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Chart annotation band of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitBand {
    BelowLsl,
    BelowLcl,
    WithinControl,
    AboveUcl,
    AboveUsl,
}

/// Errors raised by the monitoring core.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Classification requested before any reading was appended
    EmptyWindow,
    /// A threshold set violating `lsl <= lcl <= ucl <= usl`
    InvalidThresholdOrdering { thresholds: ThresholdSet },
    /// The gas is not monitored
    UnknownGas(crate::sensor::Gas),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::EmptyWindow => write!(f, "No readings available yet"),
            MonitorError::InvalidThresholdOrdering { thresholds } => write!(
                f,
                "Thresholds must satisfy LSL <= LCL <= UCL <= USL and be finite (got {thresholds})"
            ),
            MonitorError::UnknownGas(gas) => write!(f, "Gas {gas} is not monitored"),
        }
    }
}

impl std::error::Error for MonitorError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn so2_limits() -> ThresholdSet {
        ThresholdSet::new(300.0, 400.0, 700.0, 800.0)
    }

    #[test]
    fn test_validate_ordering() {
        assert!(so2_limits().validate().is_ok());
        assert!(ThresholdSet::new(5.0, 5.0, 5.0, 5.0).validate().is_ok());

        let swapped = ThresholdSet::new(300.0, 400.0, 800.0, 700.0);
        assert_eq!(
            swapped.validate(),
            Err(MonitorError::InvalidThresholdOrdering {
                thresholds: swapped
            })
        );
        assert!(ThresholdSet::new(f64::NAN, 1.0, 2.0, 3.0)
            .validate()
            .is_err());
        assert!(ThresholdSet::new(0.0, 1.0, 2.0, f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_usl_boundary_is_strict() {
        let limits = so2_limits();
        assert_eq!(limits.classify(800.0), RiskLevel::Warning);
        assert_eq!(limits.classify(800.0 + 1e-9), RiskLevel::Danger);
        assert_eq!(limits.classify(700.0), RiskLevel::Safe);
        assert_eq!(limits.classify(700.5), RiskLevel::Warning);
    }

    #[test]
    fn test_low_values_stay_safe() {
        let limits = so2_limits();
        assert_eq!(limits.classify(-50.0), RiskLevel::Safe);
        assert_eq!(limits.band(-50.0), LimitBand::BelowLsl);
        assert_eq!(limits.band(350.0), LimitBand::BelowLcl);
        assert_eq!(limits.band(500.0), LimitBand::WithinControl);
        assert_eq!(limits.band(750.0), LimitBand::AboveUcl);
        assert_eq!(limits.band(900.0), LimitBand::AboveUsl);
    }

    #[test]
    fn test_classification_is_monotonic() {
        let limits = so2_limits();
        let values: Vec<f64> = (0..2000).map(|i| f64::from(i) * 0.5).collect();
        for pair in values.windows(2) {
            assert!(limits.classify(pair[0]) <= limits.classify(pair[1]));
        }
    }

    #[test]
    fn test_assessment_labels_and_worst() {
        assert_eq!(Assessment::InsufficientData.label(), "N/A");
        assert_eq!(Assessment::Risk(RiskLevel::Danger).to_string(), "Danger");
        assert_eq!(
            Assessment::InsufficientData.risk(),
            Err(MonitorError::EmptyWindow)
        );
        assert_eq!(
            Assessment::Risk(RiskLevel::Safe).worst(Assessment::Risk(RiskLevel::Warning)),
            Assessment::Risk(RiskLevel::Warning)
        );
        assert_eq!(
            Assessment::InsufficientData.worst(Assessment::Risk(RiskLevel::Safe)),
            Assessment::Risk(RiskLevel::Safe)
        );
        assert!(RiskLevel::Safe < RiskLevel::Warning && RiskLevel::Warning < RiskLevel::Danger);
    }
}
