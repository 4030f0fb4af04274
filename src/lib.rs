//! Gas Monitor Agent - rolling-window gas sensor monitoring.
//!
//! This library keeps a bounded window of recent readings per gas
//! (SO₂, CO₂, CO, H₂S, O₂), classifies the latest reading against four
//! calibration limits, and exports summary reports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gas Monitor Agent                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Simulator  │──▶│   Window    │──▶│ Classifier  │       │
//! │  │ (5s ticks)  │   │ (FIFO, N)   │   │ (LSL..USL)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                 │               │
//! │                           ▼                 ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │   Report    │   │  Telemetry  │       │
//! │                    │   Export    │   │    Sink     │       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use gas_monitor_agent::{Assessment, Reading, RiskLevel, SensorWindowClassifier, ThresholdSet};
//!
//! let limits = ThresholdSet::new(300.0, 400.0, 700.0, 800.0);
//! let classifier = SensorWindowClassifier::new(2, limits).unwrap();
//! assert_eq!(classifier.classify(), Assessment::InsufficientData);
//!
//! for value in [650.0, 750.0, 850.0] {
//!     classifier.append(Reading::new(value));
//! }
//! assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Danger));
//! assert_eq!(classifier.summary_statistics().exceedances, 1);
//! ```

pub mod activity;
pub mod config;
pub mod core;
pub mod sensor;

#[cfg(feature = "telemetry")]
pub mod telemetry;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use config::{Config, SensorSelection};
pub use core::{
    Assessment, GasMonitor, LimitBand, MonitorError, MonitoringReport, ReportBuilder, RiskLevel,
    SensorWindowClassifier, SharedMonitor, SummaryStatistics, ThresholdSet,
};
pub use sensor::{Gas, Reading, SensorEvent, Simulator, SimulatorConfig};

// Telemetry re-exports (when enabled)
#[cfg(feature = "telemetry")]
pub use telemetry::{
    BlockingTelemetryClient, TelemetryClient, TelemetryConfig, TelemetryError, TelemetrySnapshot,
    TelemetryWorker,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Explanation of how risk labels are assigned, shown by `gas-monitor legend`.
pub const RISK_LEGEND: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                GAS MONITOR - RISK CLASSIFICATION                 ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Each gas has four calibration limits:                           ║
║    LSL ≤ LCL ≤ UCL ≤ USL                                         ║
║                                                                  ║
║  The latest reading is labelled:                                 ║
║    • Danger   when the value is above USL                        ║
║    • Warning  when the value is above UCL                        ║
║    • Safe     otherwise                                          ║
║    • N/A      when no reading has been received yet              ║
║                                                                  ║
║  Values below LSL/LCL are annotated on charts but never          ║
║  change the label. The label is a fixed threshold rule, not      ║
║  a trained model.                                                ║
║                                                                  ║
║  Edit limits with:                                               ║
║    gas-monitor thresholds --gas so2 --ucl 700 --usl 800          ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_legend_contents() {
        assert!(RISK_LEGEND.contains("USL"));
        assert!(RISK_LEGEND.contains("Danger"));
        assert!(RISK_LEGEND.contains("N/A"));
    }
}
