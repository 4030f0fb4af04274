//! Configuration for the gas monitor agent.

use crate::core::thresholds::ThresholdSet;
use crate::sensor::types::Gas;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on seeded history per gas (one week of one-minute readings).
pub const MAX_HISTORY_SEED: usize = 10_080;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Readings kept per gas window
    pub capacity: usize,

    /// Time between simulated sensor ticks
    #[serde(with = "duration_serde")]
    pub tick_interval: Duration,

    /// Which gases to monitor
    pub sensors: SensorSelection,

    /// Operator-edited thresholds; gases without an entry use their defaults
    #[serde(default)]
    pub thresholds: BTreeMap<Gas, ThresholdSet>,

    /// Synthetic history readings seeded per gas at startup
    pub history_seed: usize,

    /// Spacing of the seeded history
    #[serde(with = "duration_serde")]
    pub history_spacing: Duration,

    /// Span of the windowed average shown next to the point status (hours)
    pub windowed_span_hours: u32,

    /// IANA timezone used in exported reports
    pub timezone: String,

    /// Path for exported reports
    pub export_path: PathBuf,

    /// Path for activity logs
    pub data_path: PathBuf,

    /// Whether monitoring is currently paused
    pub paused: bool,

    /// Remote telemetry sink settings
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gas-monitor-agent");

        Self {
            capacity: 100,
            tick_interval: Duration::from_secs(5),
            sensors: SensorSelection::default(),
            thresholds: BTreeMap::new(),
            history_seed: 100,
            history_spacing: Duration::from_secs(60),
            windowed_span_hours: 24,
            timezone: "UTC".to_string(),
            export_path: data_dir.join("reports"),
            data_path: data_dir,
            paused: false,
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults if absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gas-monitor-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Active thresholds for a gas.
    pub fn thresholds_for(&self, gas: Gas) -> ThresholdSet {
        self.thresholds
            .get(&gas)
            .copied()
            .unwrap_or_else(|| gas.default_thresholds())
    }

    /// Store thresholds for a gas after checking their ordering.
    pub fn set_thresholds(&mut self, gas: Gas, thresholds: ThresholdSet) -> Result<(), ConfigError> {
        thresholds
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.thresholds.insert(gas, thresholds);
        Ok(())
    }

    /// Parsed report timezone.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| ConfigError::Invalid(format!("timezone '{}': {e}", self.timezone)))
    }

    /// Check values a hand-edited config file could get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".to_string()));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "tick_interval must be at least 1 second".to_string(),
            ));
        }
        if self.history_seed > MAX_HISTORY_SEED {
            return Err(ConfigError::Invalid(format!(
                "history_seed must be at most {MAX_HISTORY_SEED}"
            )));
        }
        if !self.sensors.any_enabled() {
            return Err(ConfigError::Invalid(
                "at least one gas must be monitored".to_string(),
            ));
        }
        for (gas, thresholds) in &self.thresholds {
            thresholds
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("{gas}: {e}")))?;
        }
        self.timezone()?;
        Ok(())
    }
}

/// Which gases to monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSelection {
    pub so2: bool,
    pub co2: bool,
    pub co: bool,
    pub h2s: bool,
    pub o2: bool,
}

impl Default for SensorSelection {
    fn default() -> Self {
        Self {
            so2: true,
            co2: true,
            co: true,
            h2s: true,
            o2: true,
        }
    }
}

impl SensorSelection {
    /// Parse a selection from a comma-separated string ("so2,h2s" or "all").
    pub fn from_csv(s: &str) -> Self {
        let items: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let all = items.iter().any(|s| s == "all");
        let wants = |gas: Gas| all || items.iter().any(|s| s.parse::<Gas>() == Ok(gas));

        Self {
            so2: wants(Gas::So2),
            co2: wants(Gas::Co2),
            co: wants(Gas::Co),
            h2s: wants(Gas::H2s),
            o2: wants(Gas::O2),
        }
    }

    /// Whether a gas is selected.
    pub fn contains(&self, gas: Gas) -> bool {
        match gas {
            Gas::So2 => self.so2,
            Gas::Co2 => self.co2,
            Gas::Co => self.co,
            Gas::H2s => self.h2s,
            Gas::O2 => self.o2,
        }
    }

    /// Selected gases in dashboard order.
    pub fn gases(&self) -> Vec<Gas> {
        Gas::ALL
            .into_iter()
            .filter(|gas| self.contains(*gas))
            .collect()
    }

    /// Check if at least one gas is selected.
    pub fn any_enabled(&self) -> bool {
        Gas::ALL.iter().any(|gas| self.contains(*gas))
    }
}

/// Remote telemetry sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Base URL of the data store (e.g. a Realtime Database root)
    pub base_url: Option<String>,
    /// Node the snapshot is written to
    pub path: String,
    /// Optional auth token appended as `?auth=`
    pub auth_token: Option<String>,
    /// Minimum seconds between pushes
    pub interval_secs: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            path: "gas-monitor/status".to_string(),
            auth_token: None,
            interval_secs: 60,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_selection_parsing() {
        let selection = SensorSelection::from_csv("so2,h2s");
        assert_eq!(selection.gases(), vec![Gas::So2, Gas::H2s]);

        let selection = SensorSelection::from_csv("SO2");
        assert!(selection.so2);
        assert!(!selection.co2);

        let selection = SensorSelection::from_csv("all");
        assert_eq!(selection.gases(), Gas::ALL.to_vec());

        assert!(!SensorSelection::from_csv("nox").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.tick_interval, Duration::from_secs(5));
        assert!(!config.paused);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.thresholds_for(Gas::So2),
            ThresholdSet::new(300.0, 400.0, 700.0, 800.0)
        );
    }

    #[test]
    fn test_set_thresholds_rejects_bad_ordering() {
        let mut config = Config::default();
        let edited = ThresholdSet::new(1.0, 2.0, 3.0, 4.0);
        config.set_thresholds(Gas::H2s, edited).unwrap();
        assert_eq!(config.thresholds_for(Gas::H2s), edited);

        let bad = ThresholdSet::new(4.0, 3.0, 2.0, 1.0);
        assert!(config.set_thresholds(Gas::H2s, bad).is_err());
        assert_eq!(config.thresholds_for(Gas::H2s), edited);
    }

    #[test]
    fn test_validate_catches_hand_edits() {
        let mut config = Config::default();
        config.timezone = "Mars/Olympus".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .thresholds
            .insert(Gas::Co, ThresholdSet::new(9.0, 1.0, 2.0, 3.0));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.history_seed = MAX_HISTORY_SEED + 1;
        assert!(config.validate().is_err());
        config.history_seed = MAX_HISTORY_SEED;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("gas-monitor-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config
            .set_thresholds(Gas::So2, ThresholdSet::new(100.0, 200.0, 300.0, 400.0))
            .unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.thresholds_for(Gas::So2), config.thresholds_for(Gas::So2));
        assert_eq!(loaded.tick_interval, config.tick_interval);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
