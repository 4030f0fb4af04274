//! Remote telemetry sink.
//!
//! Pushes a single status snapshot to an HTTP-accessible data store using
//! the Realtime Database REST shape (`PATCH {base}/{path}.json`). Pushes
//! are fire-and-forget: a failure is logged and counted, never retried and
//! never surfaced to the dashboard.

use crate::activity::SharedActivityLog;
use crate::config::TelemetrySettings;
use crate::core::monitor::GasStatus;
use crate::sensor::types::Gas;
use chrono::Utc;
use crossbeam_channel::{bounded, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};

/// Environment variable overriding the configured sink URL.
pub const TELEMETRY_URL_ENV: &str = "GAS_MONITOR_TELEMETRY_URL";

/// Telemetry sink configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Data store root, without trailing slash
    pub base_url: String,
    /// Node written to, without leading slash or `.json`
    pub path: String,
    /// Optional auth token sent as the `auth` query parameter
    pub auth_token: Option<String>,
}

impl TelemetryConfig {
    /// Create a new telemetry configuration.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path: path
                .into()
                .trim_matches('/')
                .trim_end_matches(".json")
                .to_string(),
            auth_token: None,
        }
    }

    /// Attach an auth token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Build from persisted settings, letting the environment override the URL.
    pub fn from_settings(settings: &TelemetrySettings) -> Result<Self, TelemetryError> {
        let base_url = std::env::var(TELEMETRY_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| settings.base_url.clone())
            .ok_or_else(|| {
                TelemetryError::Config(format!(
                    "No telemetry URL configured (set telemetry.base_url or {TELEMETRY_URL_ENV})"
                ))
            })?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(TelemetryError::Config(format!(
                "Telemetry URL must start with http:// or https:// (got '{base_url}')"
            )));
        }

        let mut config = Self::new(base_url, settings.path.clone());
        config.auth_token = settings.auth_token.clone();
        Ok(config)
    }

    /// URL of the node snapshots are written to. The auth token is added
    /// as an encoded query parameter when the request is built.
    pub fn endpoint_url(&self) -> String {
        format!("{}/{}.json", self.base_url, self.path)
    }
}

/// Telemetry error types.
#[derive(Debug)]
pub enum TelemetryError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Sink returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
}

impl TelemetryError {
    /// Whether the failure is transient (network or 5xx), as opposed to a
    /// misconfiguration that will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            TelemetryError::Network(_) => true,
            TelemetryError::Server { status, .. } => *status >= 500,
            TelemetryError::Config(_) | TelemetryError::Serialization(_) => false,
        }
    }
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::Config(msg) => write!(f, "Telemetry config error: {msg}"),
            TelemetryError::Network(msg) => write!(f, "Telemetry network error: {msg}"),
            TelemetryError::Server { status, message } => {
                write!(f, "Telemetry sink error ({status}): {message}")
            }
            TelemetryError::Serialization(msg) => {
                write!(f, "Telemetry serialization error: {msg}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {}

/// Status snapshot written to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub device_id: String,
    pub gas: Gas,
    /// Latest value, absent when the window is empty
    pub value: Option<f64>,
    pub unit: String,
    /// Risk label, "N/A" when there is no data
    pub status: String,
    /// RFC3339 time the snapshot was taken
    pub timestamp: String,
}

impl TelemetrySnapshot {
    /// Build a snapshot from a gas status.
    pub fn from_status(status: &GasStatus, device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            gas: status.gas,
            value: status.snapshot.latest.as_ref().map(|r| r.value),
            unit: status.unit.clone(),
            status: status.snapshot.assessment.label(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Device identifier derived from the hostname plus a random suffix.
pub fn device_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!(
        "gas-monitor-{}-{}",
        hostname,
        &uuid::Uuid::new_v4().to_string()[..8]
    )
}

/// Async client for the telemetry sink.
pub struct TelemetryClient {
    config: TelemetryConfig,
    client: reqwest::Client,
    device_id: String,
}

impl TelemetryClient {
    /// Create a new telemetry client.
    pub fn new(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| TelemetryError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            device_id: device_id(),
        })
    }

    /// Build the PATCH request for a snapshot.
    pub fn build_request(
        &self,
        snapshot: &TelemetrySnapshot,
    ) -> Result<reqwest::Request, TelemetryError> {
        let mut builder = self.client.patch(self.config.endpoint_url());
        if let Some(token) = &self.config.auth_token {
            builder = builder.query(&[("auth", token.as_str())]);
        }
        builder
            .json(snapshot)
            .build()
            .map_err(|e| TelemetryError::Serialization(e.to_string()))
    }

    /// Push one snapshot, returning the sink's echo of the written node.
    pub async fn push(
        &self,
        snapshot: &TelemetrySnapshot,
    ) -> Result<serde_json::Value, TelemetryError> {
        let request = self.build_request(snapshot)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| TelemetryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TelemetryError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TelemetryError::Serialization(e.to_string()))
    }

    /// Push a snapshot; failures are logged and reported as `false`.
    pub async fn push_best_effort(&self, snapshot: &TelemetrySnapshot) -> bool {
        match self.push(snapshot).await {
            Ok(_) => {
                tracing::debug!(gas = snapshot.gas.id(), status = %snapshot.status, "telemetry pushed");
                true
            }
            Err(e) => {
                tracing::warn!(
                    gas = snapshot.gas.id(),
                    transient = e.is_transient(),
                    "telemetry push failed: {e}"
                );
                false
            }
        }
    }

    /// Get the device ID.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

/// Blocking telemetry client for use in synchronous contexts.
pub struct BlockingTelemetryClient {
    inner: TelemetryClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingTelemetryClient {
    /// Create a new blocking telemetry client.
    pub fn new(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TelemetryError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: TelemetryClient::new(config)?,
            runtime,
        })
    }

    /// Create a client from persisted settings.
    pub fn from_settings(settings: &TelemetrySettings) -> Result<Self, TelemetryError> {
        Self::new(TelemetryConfig::from_settings(settings)?)
    }

    pub fn push(&self, snapshot: &TelemetrySnapshot) -> Result<serde_json::Value, TelemetryError> {
        self.runtime.block_on(self.inner.push(snapshot))
    }

    pub fn push_best_effort(&self, snapshot: &TelemetrySnapshot) -> bool {
        self.runtime.block_on(self.inner.push_best_effort(snapshot))
    }

    /// Get the device ID.
    pub fn device_id(&self) -> &str {
        self.inner.device_id()
    }

    pub fn endpoint_url(&self) -> String {
        self.inner.config().endpoint_url()
    }
}

/// Batches queued for the worker; a busy worker makes new batches skip.
const WORKER_QUEUE: usize = 1;

/// Background thread that pushes snapshot batches so the monitoring loop
/// never waits on the network.
pub struct TelemetryWorker {
    sender: Option<Sender<Vec<TelemetrySnapshot>>>,
    handle: Option<JoinHandle<()>>,
    device_id: String,
    endpoint_url: String,
}

impl TelemetryWorker {
    /// Move `client` onto a worker thread. Push outcomes are counted in `activity`.
    pub fn spawn(
        client: BlockingTelemetryClient,
        activity: SharedActivityLog,
    ) -> Result<Self, TelemetryError> {
        let (sender, receiver) = bounded::<Vec<TelemetrySnapshot>>(WORKER_QUEUE);
        let device_id = client.device_id().to_string();
        let endpoint_url = client.endpoint_url();

        let handle = thread::Builder::new()
            .name("gas-telemetry".to_string())
            .spawn(move || {
                for batch in receiver {
                    for snapshot in &batch {
                        if client.push_best_effort(snapshot) {
                            activity.record_telemetry_push();
                        } else {
                            activity.record_telemetry_failure();
                        }
                    }
                }
            })
            .map_err(|e| TelemetryError::Config(format!("Failed to spawn telemetry thread: {e}")))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            device_id,
            endpoint_url,
        })
    }

    /// Queue a batch without blocking. Returns `false` when the previous
    /// batch is still in flight and this one was skipped.
    pub fn submit(&self, batch: Vec<TelemetrySnapshot>) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(batch) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("telemetry worker busy, skipping batch");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("telemetry worker stopped");
                false
            }
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Stop accepting batches. A push already in flight finishes on its own
    /// thread; shutdown does not wait for it.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for TelemetryWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
