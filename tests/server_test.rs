//! Integration tests for the dashboard HTTP API

#[cfg(feature = "server")]
mod server_tests {
    use gas_monitor_agent::activity::create_shared_log;
    use gas_monitor_agent::server::{run, ServerConfig};
    use gas_monitor_agent::{Gas, GasMonitor};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    async fn start_server() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
        let monitor = GasMonitor::new(
            2,
            [
                (Gas::So2, Gas::So2.default_thresholds()),
                (Gas::H2s, Gas::H2s.default_thresholds()),
            ],
        )
        .expect("default thresholds are ordered");
        let config = ServerConfig::new(0);

        let (addr, shutdown_tx) = run(config, Arc::new(monitor), create_shared_log())
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        (addr, shutdown_tx)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx) = start_server().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_empty_window_reports_not_available() {
        let (addr, shutdown_tx) = start_server().await;
        let client = reqwest::Client::new();

        let latest: serde_json::Value = client
            .get(format!("http://{}/gases/so2/latest", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(latest["display"], "N/A");
        assert!(latest["reading"].is_null());

        let status: serde_json::Value = client
            .get(format!("http://{}/gases/so2/status", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(status["label"], "N/A");
        assert_eq!(status["assessment"]["status"], "insufficient_data");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_posted_readings_drive_status() {
        let (addr, shutdown_tx) = start_server().await;
        let client = reqwest::Client::new();

        for (value, expected) in [(650.0, "Safe"), (750.0, "Warning"), (850.0, "Danger")] {
            let response = client
                .post(format!("http://{}/gases/so2/readings", addr))
                .json(&serde_json::json!({ "value": value, "zone": "Zone A" }))
                .send()
                .await
                .expect("Failed to send request");
            assert_eq!(response.status(), reqwest::StatusCode::CREATED);

            let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
            assert_eq!(body["label"], expected);
        }

        // Capacity 2 keeps only the last two readings.
        let readings: Vec<serde_json::Value> = client
            .get(format!("http://{}/gases/so2/readings", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0]["value"], 750.0);
        assert_eq!(readings[1]["value"], 850.0);

        let summary: serde_json::Value = client
            .get(format!("http://{}/gases/so2/summary", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(summary["count"], 2);
        assert_eq!(summary["mean"], 800.0);
        assert_eq!(summary["exceedances"], 1);

        let overview: serde_json::Value = client
            .get(format!("http://{}/gases", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(overview["overall"]["level"], "Danger");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_threshold_update_round_trip() {
        let (addr, shutdown_tx) = start_server().await;
        let client = reqwest::Client::new();

        let limits = serde_json::json!({ "lsl": 0.0, "lcl": 1.0, "ucl": 10.0, "usl": 20.0 });
        let response = client
            .put(format!("http://{}/gases/h2s/thresholds", addr))
            .json(&limits)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let echoed: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(echoed, limits);

        let stored: serde_json::Value = client
            .get(format!("http://{}/gases/h2s/thresholds", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(stored, limits);

        // 16 ppm is Danger under the defaults, Warning under the edited limits.
        let body: serde_json::Value = client
            .post(format!("http://{}/gases/h2s/readings", addr))
            .json(&serde_json::json!({ "value": 16.0 }))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(body["label"], "Warning");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_unordered_thresholds_rejected() {
        let (addr, shutdown_tx) = start_server().await;
        let client = reqwest::Client::new();

        let response = client
            .put(format!("http://{}/gases/so2/thresholds", addr))
            .json(&serde_json::json!({ "lsl": 300.0, "lcl": 400.0, "ucl": 900.0, "usl": 800.0 }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INVALID_THRESHOLDS");

        // Previous limits stay active.
        let stored: serde_json::Value = client
            .get(format!("http://{}/gases/so2/thresholds", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(stored["ucl"], 700.0);
        assert_eq!(stored["usl"], 800.0);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_unknown_and_unmonitored_gas() {
        let (addr, shutdown_tx) = start_server().await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("http://{}/gases/xenon/status", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        // CO is a known gas but this monitor does not track it.
        let response = client
            .get(format!("http://{}/gases/co/status", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "UNKNOWN_GAS");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_report_endpoint() {
        let (addr, shutdown_tx) = start_server().await;
        let client = reqwest::Client::new();

        client
            .post(format!("http://{}/gases/h2s/readings", addr))
            .json(&serde_json::json!({ "value": 2.0 }))
            .send()
            .await
            .expect("Failed to send request");

        let report: serde_json::Value = client
            .get(format!("http://{}/report", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(report["producer"], "gas-monitor-agent");
        assert_eq!(report["sections"].as_array().map(|s| s.len()), Some(2));

        let _ = shutdown_tx.send(());
    }
}
