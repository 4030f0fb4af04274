//! Monitoring report builder.
//!
//! A report captures, per gas, the active thresholds, the summary statistics
//! of the current window and the latest classification. Reports are
//! exported as JSON or as a plain-text document.

use crate::core::monitor::GasMonitor;
use crate::core::stats::SummaryStatistics;
use crate::core::thresholds::{Assessment, ThresholdSet};
use crate::sensor::types::{Gas, Reading};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "gas-monitor-agent";

/// Report section for a single gas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasReport {
    pub gas: Gas,
    pub unit: String,
    pub thresholds: ThresholdSet,
    pub summary: SummaryStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<Reading>,
    pub assessment: Assessment,
}

/// Exported monitoring report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    /// IANA timezone used when rendering times
    pub timezone: String,
    pub producer: String,
    pub producer_version: String,
    pub instance_id: String,
    pub overall: Assessment,
    pub sections: Vec<GasReport>,
}

impl MonitoringReport {
    fn local_time(&self, at: DateTime<Utc>) -> String {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string(),
            Err(_) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }

    /// Render the report as a plain-text document.
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    fn file_stem(&self) -> String {
        let short_id = self.report_id.get(..8).unwrap_or(&self.report_id);
        format!(
            "report_{}_{}",
            self.generated_at.format("%Y%m%d_%H%M%S"),
            short_id
        )
    }

    /// Write the report as pretty JSON into `dir`, returning the file path.
    pub fn write_json(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.file_stem()));
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Write the plain-text rendering into `dir`, returning the file path.
    pub fn write_text(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.txt", self.file_stem()));
        std::fs::write(&path, self.render_text())?;
        Ok(path)
    }
}

impl fmt::Display for MonitoringReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gas Monitoring Report")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Report ID: {}", self.report_id)?;
        writeln!(f, "Generated: {}", self.local_time(self.generated_at))?;
        writeln!(f, "Overall risk: {}", self.overall)?;

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{} Monitoring ({})", section.gas, section.unit)?;
            writeln!(f, "{}", "-".repeat(24))?;
            writeln!(f, "Sensor Thresholds")?;
            writeln!(f, "  LSL: {}", section.thresholds.lsl)?;
            writeln!(f, "  LCL: {}", section.thresholds.lcl)?;
            writeln!(f, "  UCL: {}", section.thresholds.ucl)?;
            writeln!(f, "  USL: {}", section.thresholds.usl)?;
            writeln!(f, "Summary Statistics")?;
            writeln!(f, "  Readings: {}", section.summary.count)?;
            writeln!(f, "  Mean: {}", format_stat(section.summary.mean))?;
            writeln!(f, "  Min: {}", format_stat(section.summary.min))?;
            writeln!(f, "  Max: {}", format_stat(section.summary.max))?;
            writeln!(f, "  Readings above USL: {}", section.summary.exceedances)?;
            match &section.latest {
                Some(reading) => writeln!(
                    f,
                    "Latest: {:.2} {} at {} ({})",
                    reading.value,
                    section.unit,
                    self.local_time(reading.timestamp),
                    section.assessment
                )?,
                None => writeln!(f, "Latest: N/A")?,
            }
        }
        Ok(())
    }
}

fn format_stat(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Builder for monitoring reports.
pub struct ReportBuilder {
    instance_id: Uuid,
    timezone: Tz,
}

impl ReportBuilder {
    /// Create a builder with a unique instance ID, rendering times in UTC.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            timezone: Tz::UTC,
        }
    }

    /// Render report times in the given timezone.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Get the instance ID.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a report from the current state of a monitor.
    pub fn build(&self, monitor: &GasMonitor) -> MonitoringReport {
        let snapshot = monitor.snapshot();
        let sections = snapshot
            .gases
            .into_iter()
            .map(|status| GasReport {
                gas: status.gas,
                unit: status.unit,
                thresholds: status.snapshot.thresholds,
                summary: status.snapshot.summary,
                latest: status.snapshot.latest,
                assessment: status.snapshot.assessment,
            })
            .collect();

        MonitoringReport {
            report_id: Uuid::new_v4().to_string(),
            generated_at: snapshot.taken_at,
            timezone: self.timezone.name().to_string(),
            producer: PRODUCER_NAME.to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            instance_id: self.instance_id.to_string(),
            overall: snapshot.overall,
            sections,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
