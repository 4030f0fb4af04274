//! Gas Monitor CLI
//!
//! Rolling-window gas sensor monitor with threshold risk classification.

use chrono::Utc;
use clap::{Parser, Subcommand};
use gas_monitor_agent::{
    activity::{create_shared_log_with_persistence, SharedActivityLog},
    config::{Config, SensorSelection},
    core::{Assessment, GasMonitor, MonitoringReport, ReportBuilder, RiskLevel, ThresholdSet},
    sensor::{Gas, ReadingGenerator, SensorEvent, Simulator, SimulatorConfig},
    RISK_LEGEND, VERSION,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "telemetry")]
use gas_monitor_agent::telemetry::{BlockingTelemetryClient, TelemetrySnapshot, TelemetryWorker};

#[derive(Parser)]
#[command(name = "gas-monitor")]
#[command(version = VERSION)]
#[command(about = "Rolling-window gas sensor monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring simulated sensor readings
    Start {
        /// Gases to monitor (so2, co2, co, h2s, o2, or all)
        #[arg(long)]
        gases: Option<String>,

        /// Seconds between sensor ticks
        #[arg(long)]
        interval: Option<u64>,

        /// Readings kept per gas window
        #[arg(long)]
        capacity: Option<usize>,

        /// RNG seed for a reproducible simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Push status snapshots to the telemetry sink (requires telemetry feature)
        #[arg(long)]
        telemetry: bool,

        /// Serve the dashboard API on this port (requires server feature)
        #[arg(long)]
        serve: Option<u16>,
    },

    /// Pause monitoring
    Pause,

    /// Resume monitoring
    Resume,

    /// Show configuration and cumulative activity
    Status,

    /// Explain how risk labels are assigned
    Legend,

    /// Show or edit sensor thresholds
    Thresholds {
        /// Gas to edit; omit to list all thresholds
        #[arg(long)]
        gas: Option<String>,

        #[arg(long)]
        lsl: Option<f64>,

        #[arg(long)]
        lcl: Option<f64>,

        #[arg(long)]
        ucl: Option<f64>,

        #[arg(long)]
        usl: Option<f64>,

        /// Restore factory thresholds for the gas
        #[arg(long)]
        reset: bool,
    },

    /// Classify one reading and push it to the telemetry sink
    Push {
        #[arg(long)]
        gas: String,

        #[arg(long)]
        value: f64,
    },

    /// Combine exported reports
    Export {
        /// Directory holding reports
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show configuration
    Config,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            gases,
            interval,
            capacity,
            seed,
            telemetry,
            serve,
        } => {
            cmd_start(StartOptions {
                gases,
                interval,
                capacity,
                seed,
                telemetry,
                serve,
            });
        }
        Commands::Pause => {
            cmd_pause();
        }
        Commands::Resume => {
            cmd_resume();
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Legend => {
            println!("{RISK_LEGEND}");
        }
        Commands::Thresholds {
            gas,
            lsl,
            lcl,
            ucl,
            usl,
            reset,
        } => {
            cmd_thresholds(gas, [lsl, lcl, ucl, usl], reset);
        }
        Commands::Push { gas, value } => {
            cmd_push(&gas, value);
        }
        Commands::Export { output, format } => {
            cmd_export(output, &format);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load config, using defaults: {e}");
        Config::default()
    })
}

struct StartOptions {
    gases: Option<String>,
    interval: Option<u64>,
    capacity: Option<usize>,
    seed: Option<u64>,
    telemetry: bool,
    serve: Option<u16>,
}

fn cmd_start(options: StartOptions) {
    println!("Gas Monitor Agent v{VERSION}");
    println!();

    let mut config = load_config();
    if let Some(gases) = &options.gases {
        config.sensors = SensorSelection::from_csv(gases);
    }
    if let Some(secs) = options.interval {
        config.tick_interval = Duration::from_secs(secs);
    }
    if let Some(capacity) = options.capacity {
        config.capacity = capacity;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    let timezone = config.timezone().unwrap_or(chrono_tz::Tz::UTC);

    let monitor = match GasMonitor::from_config(&config) {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let activity = create_shared_log_with_persistence(config.data_path.join("activity.json"));
    let report_builder = ReportBuilder::new().with_timezone(timezone);

    println!("Starting monitoring...");
    println!(
        "  Gases: {}",
        monitor
            .gases()
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Window capacity: {} readings", config.capacity);
    println!("  Tick interval: {}s", config.tick_interval.as_secs());
    println!("  Instance ID: {}", report_builder.instance_id());

    // Seed synthetic history so charts and statistics are populated from the start.
    let mut generator = ReadingGenerator::new(options.seed);
    seed_history(&monitor, &mut generator, &config, &activity);

    let mut last_status: BTreeMap<Gas, Assessment> = BTreeMap::new();
    for gas in monitor.gases() {
        if let Ok(status) = monitor.status(gas) {
            println!(
                "  {}: {} ({})",
                gas, status.display, status.snapshot.assessment
            );
            last_status.insert(gas, status.snapshot.assessment);
        }
    }

    #[cfg(feature = "telemetry")]
    let mut telemetry_worker = if options.telemetry {
        match BlockingTelemetryClient::from_settings(&config.telemetry)
            .and_then(|client| TelemetryWorker::spawn(client, activity.clone()))
        {
            Ok(worker) => {
                println!(
                    "  Telemetry: enabled (every {}s to {})",
                    config.telemetry.interval_secs,
                    worker.endpoint_url()
                );
                println!("  Device ID: {}", worker.device_id());
                Some(worker)
            }
            Err(e) => {
                eprintln!("Warning: Telemetry initialization failed: {e}");
                eprintln!("Continuing without telemetry.");
                None
            }
        }
    } else {
        println!("  Telemetry: disabled");
        None
    };

    #[cfg(not(feature = "telemetry"))]
    if options.telemetry {
        eprintln!("Warning: --telemetry flag ignored (telemetry feature not enabled at compile time)");
    }

    #[cfg(feature = "server")]
    let (server_runtime, server_shutdown) = match options.serve {
        Some(port) => match start_server(port, &config, monitor.clone(), activity.clone()) {
            Ok((runtime, addr, shutdown)) => {
                println!("  Dashboard API: http://{addr}");
                (Some(runtime), Some(shutdown))
            }
            Err(e) => {
                eprintln!("Warning: Could not start dashboard API: {e}");
                (None, None)
            }
        },
        None => (None, None),
    };

    #[cfg(not(feature = "server"))]
    if options.serve.is_some() {
        eprintln!("Warning: --serve flag ignored (server feature not enabled at compile time)");
    }

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let mut simulator = Simulator::new(SimulatorConfig {
        gases: monitor.gases(),
        interval: config.tick_interval,
        seed: options.seed.map(|s| s.wrapping_add(1)),
    });

    // Support pause/resume and threshold edits from another process by polling the config file.
    let mut paused = config.paused;
    let mut applied_thresholds = config.thresholds.clone();
    let mut last_config_check = std::time::Instant::now();

    if paused {
        println!("Monitoring is currently paused.");
        println!("Run `gas-monitor resume` to start.");
        println!();
    } else if let Err(e) = simulator.start() {
        eprintln!("Error starting simulator: {e}");
        std::process::exit(1);
    }

    #[cfg(feature = "telemetry")]
    let mut last_telemetry_push: Option<std::time::Instant> = None;

    let receiver = simulator.receiver().clone();

    while running.load(Ordering::SeqCst) {
        if last_config_check.elapsed() >= Duration::from_secs(1) {
            if let Ok(cfg) = Config::load() {
                applied_thresholds =
                    apply_threshold_edits(&applied_thresholds, &cfg, &monitor, &activity);

                if let Some(now_paused) = pause_change(paused, &cfg) {
                    paused = now_paused;

                    if paused {
                        println!();
                        println!("Pausing monitoring...");
                        simulator.stop();
                        while receiver.try_recv().is_ok() {}
                    } else {
                        println!();
                        println!("Resuming monitoring...");
                        if let Err(e) = simulator.start() {
                            eprintln!("Error resuming simulator: {e}");
                            std::process::exit(1);
                        }
                    }
                }
            }
            last_config_check = std::time::Instant::now();
        }

        if paused {
            thread::sleep(Duration::from_millis(100));
            continue;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                handle_event(event, &monitor, &activity, &mut last_status);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Simulator disconnected unexpectedly");
                break;
            }
        }

        #[cfg(feature = "telemetry")]
        if let Some(ref worker) = telemetry_worker {
            let due = last_telemetry_push
                .map(|t| t.elapsed() >= Duration::from_secs(config.telemetry.interval_secs))
                .unwrap_or(true);
            if due {
                let batch = monitor
                    .snapshot()
                    .gases
                    .iter()
                    .map(|status| TelemetrySnapshot::from_status(status, worker.device_id()))
                    .collect();
                worker.submit(batch);
                last_telemetry_push = Some(std::time::Instant::now());
            }
        }
    }

    println!();
    println!("Stopping monitoring...");
    simulator.stop();

    #[cfg(feature = "telemetry")]
    if let Some(worker) = telemetry_worker.as_mut() {
        worker.shutdown();
    }

    #[cfg(feature = "server")]
    {
        if let Some(shutdown) = server_shutdown {
            let _ = shutdown.send(());
        }
        if let Some(runtime) = server_runtime {
            runtime.shutdown_timeout(Duration::from_secs(2));
        }
    }

    let report = report_builder.build(&monitor);
    match (
        report.write_json(&config.export_path),
        report.write_text(&config.export_path),
    ) {
        (Ok(json_path), Ok(text_path)) => {
            activity.record_report_exported();
            println!("Exported report to {json_path:?} and {text_path:?}");
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error writing report: {e}");
        }
    }

    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity log: {e}");
    }

    println!();
    println!("Overall risk at shutdown: {}", report.overall);
    println!("{}", activity.summary());
}

/// Record one producer event and report status transitions.
fn handle_event(
    event: SensorEvent,
    monitor: &GasMonitor,
    activity: &SharedActivityLog,
    last_status: &mut BTreeMap<Gas, Assessment>,
) {
    let gas = event.gas;
    let value = event.reading.value;
    let at = event.timestamp();

    let assessment = match monitor.record_event(event) {
        Ok(assessment) => assessment,
        Err(e) => {
            tracing::warn!("Dropping reading: {e}");
            return;
        }
    };
    activity.record_reading();
    activity.record_classification();

    println!(
        "[{}] {} {:.1} {} -> {}",
        at.format("%H:%M:%S"),
        gas,
        value,
        gas.unit(),
        assessment
    );

    let previous = last_status.insert(gas, assessment);
    if previous.is_some_and(|p| p != assessment) {
        activity.record_status_change();
        match assessment {
            Assessment::Risk(RiskLevel::Danger) => {
                tracing::warn!(gas = gas.id(), value, "{gas} entered Danger")
            }
            _ => tracing::info!(gas = gas.id(), value, "{gas} status changed to {assessment}"),
        }
    }
}

/// Apply thresholds edited through `gas-monitor thresholds` while running.
///
/// Only gases whose config entry changed since `previous` are touched, so a
/// set stored at runtime (e.g. through `PUT /gases/:gas/thresholds`) is not
/// reverted by an unchanged file. Returns the entries now considered applied.
fn apply_threshold_edits(
    previous: &BTreeMap<Gas, ThresholdSet>,
    config: &Config,
    monitor: &GasMonitor,
    activity: &SharedActivityLog,
) -> BTreeMap<Gas, ThresholdSet> {
    for gas in monitor.gases() {
        if previous.get(&gas) == config.thresholds.get(&gas) {
            continue;
        }
        let Ok(classifier) = monitor.classifier(gas) else {
            continue;
        };
        match classifier.update_thresholds(config.thresholds_for(gas)) {
            Ok(stored) => {
                activity.record_threshold_update();
                tracing::info!(gas = gas.id(), thresholds = %stored, "thresholds reloaded");
            }
            Err(e) => tracing::warn!(gas = gas.id(), "ignoring edited thresholds: {e}"),
        }
    }
    config.thresholds.clone()
}

/// New pause state when the config file flipped it.
fn pause_change(paused: bool, config: &Config) -> Option<bool> {
    (config.paused != paused).then_some(config.paused)
}

/// Back-fill each window with synthetic history; never more than it can hold.
fn seed_history(
    monitor: &GasMonitor,
    generator: &mut ReadingGenerator,
    config: &Config,
    activity: &SharedActivityLog,
) {
    let count = config.history_seed.min(config.capacity);
    let spacing = chrono::Duration::seconds(config.history_spacing.as_secs() as i64);
    for gas in monitor.gases() {
        let Ok(classifier) = monitor.classifier(gas) else {
            continue;
        };
        let history = generator.history(gas, count, spacing);
        activity.record_readings(history.len() as u64);
        classifier.extend(history);
    }
}

#[cfg(feature = "server")]
fn start_server(
    port: u16,
    config: &Config,
    monitor: gas_monitor_agent::SharedMonitor,
    activity: SharedActivityLog,
) -> anyhow::Result<(
    tokio::runtime::Runtime,
    std::net::SocketAddr,
    tokio::sync::oneshot::Sender<()>,
)> {
    use gas_monitor_agent::server::{run, ServerConfig};

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let mut server_config = ServerConfig::new(port);
    server_config.windowed_span_hours = config.windowed_span_hours;
    server_config.timezone = config.timezone()?;

    let (addr, shutdown) = runtime.block_on(run(server_config, monitor, activity))?;
    Ok((runtime, addr, shutdown))
}

fn cmd_pause() {
    let mut config = load_config();
    config.paused = true;
    if let Err(e) = config.save() {
        eprintln!("Error saving config: {e}");
        std::process::exit(1);
    }
    println!("Monitoring paused. Use 'gas-monitor resume' to continue.");
}

fn cmd_resume() {
    let mut config = load_config();
    config.paused = false;
    if let Err(e) = config.save() {
        eprintln!("Error saving config: {e}");
        std::process::exit(1);
    }
    println!("Monitoring resumed.");
}

fn cmd_status() {
    let config = load_config();

    println!("Gas Monitor Status");
    println!("==================");
    println!();

    println!("Configuration:");
    println!(
        "  Gases: {}",
        config
            .sensors
            .gases()
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Window capacity: {}", config.capacity);
    println!("  Tick interval: {}s", config.tick_interval.as_secs());
    println!("  Paused: {}", config.paused);
    println!(
        "  Telemetry sink: {}",
        config.telemetry.base_url.as_deref().unwrap_or("not configured")
    );
    println!();

    let stats_path = config.data_path.join("activity.json");
    let stats = std::fs::read_to_string(&stats_path)
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok());
    match stats {
        Some(stats) => {
            println!("Cumulative Statistics:");
            for key in [
                "readings_recorded",
                "classifications",
                "status_changes",
                "threshold_updates",
                "reports_exported",
                "telemetry_pushes",
                "telemetry_failures",
            ] {
                if let Some(value) = stats.get(key) {
                    println!("  {}: {value}", key.replace('_', " "));
                }
            }
        }
        None => println!("No previous session data found."),
    }
}

fn cmd_thresholds(gas: Option<String>, limits: [Option<f64>; 4], reset: bool) {
    let mut config = load_config();

    let Some(gas) = gas else {
        println!("Sensor Thresholds");
        println!("=================");
        for gas in Gas::ALL {
            let marker = if config.thresholds.contains_key(&gas) {
                " (edited)"
            } else {
                ""
            };
            println!("  {:<4} {}{}", gas.to_string(), config.thresholds_for(gas), marker);
        }
        return;
    };

    let gas = match gas.parse::<Gas>() {
        Ok(gas) => gas,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if reset {
        config.thresholds.remove(&gas);
    } else {
        let current = config.thresholds_for(gas);
        let [lsl, lcl, ucl, usl] = limits;
        let edited = ThresholdSet::new(
            lsl.unwrap_or(current.lsl),
            lcl.unwrap_or(current.lcl),
            ucl.unwrap_or(current.ucl),
            usl.unwrap_or(current.usl),
        );
        if edited == current {
            println!("{gas}: {current}");
            return;
        }
        if let Err(e) = config.set_thresholds(gas, edited) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = config.save() {
        eprintln!("Error saving config: {e}");
        std::process::exit(1);
    }
    println!("{gas}: {}", config.thresholds_for(gas));
}

#[cfg(feature = "telemetry")]
fn cmd_push(gas: &str, value: f64) {
    use gas_monitor_agent::Reading;

    let config = load_config();
    let gas = match gas.parse::<Gas>() {
        Ok(gas) => gas,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let monitor = match GasMonitor::new(1, [(gas, config.thresholds_for(gas))]) {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let assessment = monitor.record(gas, Reading::new(value)).unwrap_or(Assessment::InsufficientData);
    println!("{gas} {value} {} -> {assessment}", gas.unit());

    let client = match BlockingTelemetryClient::from_settings(&config.telemetry) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let status = match monitor.status(gas) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let snapshot = TelemetrySnapshot::from_status(&status, client.device_id());
    match client.push(&snapshot) {
        Ok(echo) => println!("Data sent successfully: {echo}"),
        Err(e) => {
            // Failure is reported but not fatal to the caller's pipeline.
            eprintln!("Failed to send data: {e}");
        }
    }
}

#[cfg(not(feature = "telemetry"))]
fn cmd_push(_gas: &str, _value: f64) {
    eprintln!("Error: push requires the telemetry feature (build with --features telemetry)");
    std::process::exit(1);
}

fn cmd_export(output: Option<PathBuf>, format: &str) {
    let config = load_config();
    let export_dir = output.unwrap_or(config.export_path.clone());

    let mut report_files: Vec<PathBuf> = std::fs::read_dir(&export_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension().map(|e| e == "json").unwrap_or(false)
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| n.starts_with("report_"))
                            .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();
    report_files.sort();

    if report_files.is_empty() {
        println!("No reports found in {export_dir:?}");
        println!("Run 'gas-monitor start' to begin monitoring.");
        return;
    }

    println!("Found {} report(s) in {:?}", report_files.len(), export_dir);

    let reports: Vec<MonitoringReport> = report_files
        .iter()
        .filter_map(|file| std::fs::read_to_string(file).ok())
        .filter_map(|content| serde_json::from_str(&content).ok())
        .collect();

    let output_path = export_dir.join(format!(
        "export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        if format == "jsonl" { "jsonl" } else { "json" }
    ));

    let result = if format == "jsonl" {
        let lines: Vec<String> = reports
            .iter()
            .filter_map(|r| serde_json::to_string(r).ok())
            .collect();
        std::fs::write(&output_path, lines.join("\n"))
    } else {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => std::fs::write(&output_path, json),
            Err(e) => {
                eprintln!("Error serializing: {e}");
                return;
            }
        }
    };

    match result {
        Ok(_) => println!("Exported {} reports to {output_path:?}", reports.len()),
        Err(e) => eprintln!("Error writing export: {e}"),
    }
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
