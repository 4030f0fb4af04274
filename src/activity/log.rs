//! Activity log of the monitor.
//!
//! Counts what the agent did (readings recorded, status changes, exports,
//! telemetry pushes) and persists the totals between runs. No reading
//! values are stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session.
#[derive(Debug)]
pub struct ActivityLog {
    readings_recorded: AtomicU64,
    classifications: AtomicU64,
    status_changes: AtomicU64,
    threshold_updates: AtomicU64,
    reports_exported: AtomicU64,
    telemetry_pushes: AtomicU64,
    telemetry_failures: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            readings_recorded: AtomicU64::new(0),
            classifications: AtomicU64::new(0),
            status_changes: AtomicU64::new(0),
            threshold_updates: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            telemetry_pushes: AtomicU64::new(0),
            telemetry_failures: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an activity log that resumes from, and saves to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous activity stats: {e}");
        }

        log
    }

    pub fn record_reading(&self) {
        self.readings_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_readings(&self, count: u64) {
        self.readings_recorded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_classification(&self) {
        self.classifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_change(&self) {
        self.status_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_threshold_update(&self) {
        self.threshold_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_telemetry_push(&self) {
        self.telemetry_pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_telemetry_failure(&self) {
        self.telemetry_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            readings_recorded: self.readings_recorded.load(Ordering::Relaxed),
            classifications: self.classifications.load(Ordering::Relaxed),
            status_changes: self.status_changes.load(Ordering::Relaxed),
            threshold_updates: self.threshold_updates.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            telemetry_pushes: self.telemetry_pushes.load(Ordering::Relaxed),
            telemetry_failures: self.telemetry_failures.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Readings recorded: {}\n\
             - Classifications: {}\n\
             - Status changes: {}\n\
             - Threshold updates: {}\n\
             - Reports exported: {}\n\
             - Telemetry pushes: {} ({} failed)\n\
             - Session duration: {} seconds",
            stats.readings_recorded,
            stats.classifications,
            stats.status_changes,
            stats.threshold_updates,
            stats.reports_exported,
            stats.telemetry_pushes,
            stats.telemetry_failures,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                readings_recorded: stats.readings_recorded,
                classifications: stats.classifications,
                status_changes: stats.status_changes,
                threshold_updates: stats.threshold_updates,
                reports_exported: stats.reports_exported,
                telemetry_pushes: stats.telemetry_pushes,
                telemetry_failures: stats.telemetry_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.readings_recorded
                    .store(persisted.readings_recorded, Ordering::Relaxed);
                self.classifications
                    .store(persisted.classifications, Ordering::Relaxed);
                self.status_changes
                    .store(persisted.status_changes, Ordering::Relaxed);
                self.threshold_updates
                    .store(persisted.threshold_updates, Ordering::Relaxed);
                self.reports_exported
                    .store(persisted.reports_exported, Ordering::Relaxed);
                self.telemetry_pushes
                    .store(persisted.telemetry_pushes, Ordering::Relaxed);
                self.telemetry_failures
                    .store(persisted.telemetry_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.readings_recorded,
            &self.classifications,
            &self.status_changes,
            &self.threshold_updates,
            &self.reports_exported,
            &self.telemetry_pushes,
            &self.telemetry_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub readings_recorded: u64,
    pub classifications: u64,
    pub status_changes: u64,
    pub threshold_updates: u64,
    pub reports_exported: u64,
    pub telemetry_pushes: u64,
    pub telemetry_failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    readings_recorded: u64,
    classifications: u64,
    status_changes: u64,
    threshold_updates: u64,
    reports_exported: u64,
    #[serde(default)]
    telemetry_pushes: u64,
    #[serde(default)]
    telemetry_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

/// Create a new shared activity log.
pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

/// Create a new shared activity log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
