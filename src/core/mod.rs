//! Core functionality for the gas monitor.
//!
//! This module contains:
//! - The rolling reading window and its threshold classifier
//! - Summary statistics for report export
//! - The multi-gas monitor and the report builder

pub mod classifier;
pub mod monitor;
pub mod report;
pub mod stats;
pub mod thresholds;
pub mod window;

// Re-export commonly used types
pub use classifier::{ClassifierSnapshot, SensorWindowClassifier, WindowedAssessment};
pub use monitor::{GasMonitor, GasStatus, MonitorSnapshot, SharedMonitor};
pub use report::{GasReport, MonitoringReport, ReportBuilder, PRODUCER_NAME};
pub use stats::{summarize, SummaryStatistics};
pub use thresholds::{Assessment, LimitBand, MonitorError, RiskLevel, ThresholdSet};
pub use window::{SensorWindow, WindowState};
