//! Simulated gas sensor feed.
//!
//! Stands in for real acquisition hardware: a background thread emits one
//! reading per configured gas on every tick and delivers them over a
//! bounded channel. The distributions follow the mock data the monitoring
//! dashboards were built against.

use crate::sensor::types::{Gas, Reading, SensorEvent};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Zones the simulated sensors are spread across.
pub const ZONES: [&str; 3] = ["Zone A", "Zone B", "Zone C"];

/// Channel capacity between the simulator thread and the consumer.
const CHANNEL_CAPACITY: usize = 10_000;

/// How the simulated value of a gas is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spread {
    /// Gaussian noise around a mean
    Normal { mean: f64, std_dev: f64 },
    /// Integer offset in `[below, above]` added to a base value
    Offset { base: f64, below: i32, above: i32 },
}

/// Simulation parameters for one gas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasProfile {
    pub spread: Spread,
    /// Lower clamp applied to every drawn value
    pub floor: f64,
    /// Upper clamp applied to every drawn value
    pub ceiling: f64,
}

impl GasProfile {
    /// Default profile for a gas.
    pub fn for_gas(gas: Gas) -> Self {
        match gas {
            Gas::So2 => Self {
                spread: Spread::Offset {
                    base: 500.0,
                    below: -100,
                    above: 150,
                },
                floor: 0.0,
                ceiling: f64::MAX,
            },
            Gas::Co2 => Self::normal(350.0, 20.0),
            Gas::Co => Self::normal(10.0, 1.0),
            Gas::H2s => Self::normal(5.0, 0.5),
            Gas::O2 => Self::normal(20.0, 1.0),
        }
    }

    fn normal(mean: f64, std_dev: f64) -> Self {
        Self {
            spread: Spread::Normal { mean, std_dev },
            floor: 0.0,
            ceiling: f64::MAX,
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        let raw = match self.spread {
            Spread::Normal { mean, std_dev } => match Normal::new(mean, std_dev) {
                Ok(dist) => dist.sample(rng),
                Err(_) => mean,
            },
            Spread::Offset { base, below, above } => base + f64::from(rng.gen_range(below..=above)),
        };
        raw.clamp(self.floor, self.ceiling)
    }
}

/// Deterministic (when seeded) generator of synthetic readings.
pub struct ReadingGenerator {
    rng: StdRng,
}

impl ReadingGenerator {
    /// Create a generator; `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Draw one reading for `gas` stamped at `at`.
    pub fn generate(&mut self, gas: Gas, at: DateTime<Utc>) -> Reading {
        let value = GasProfile::for_gas(gas).sample(&mut self.rng);
        let zone = ZONES[self.rng.gen_range(0..ZONES.len())];
        Reading::at(at, value).with_zone(zone)
    }

    /// Synthetic history of `count` readings ending now, oldest first.
    pub fn history(&mut self, gas: Gas, count: usize, spacing: ChronoDuration) -> Vec<Reading> {
        let now = Utc::now();
        (0..count)
            .rev()
            .map(|steps_back| {
                let steps = i32::try_from(steps_back).unwrap_or(i32::MAX);
                let at = now - spacing * steps;
                self.generate(gas, at)
            })
            .collect()
    }
}

/// Configuration for the simulated feed.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Gases to emit readings for
    pub gases: Vec<Gas>,
    /// Time between ticks
    pub interval: Duration,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            gases: Gas::ALL.to_vec(),
            interval: Duration::from_secs(5),
            seed: None,
        }
    }
}

/// Errors that can occur while driving the simulator.
#[derive(Debug)]
pub enum SimulatorError {
    AlreadyRunning,
    Spawn(String),
}

impl std::fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulatorError::AlreadyRunning => write!(f, "Simulator is already running"),
            SimulatorError::Spawn(e) => write!(f, "Failed to spawn simulator thread: {e}"),
        }
    }
}

impl std::error::Error for SimulatorError {}

/// Periodic producer of simulated sensor events.
pub struct Simulator {
    config: SimulatorConfig,
    sender: Sender<SensorEvent>,
    receiver: Receiver<SensorEvent>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    starts: u64,
}

impl Simulator {
    /// Create a new simulator. Nothing is emitted until [`Simulator::start`].
    pub fn new(config: SimulatorConfig) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            starts: 0,
        }
    }

    /// Start emitting readings on a background thread.
    pub fn start(&mut self) -> Result<(), SimulatorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SimulatorError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let sender = self.sender.clone();
        let gases = self.config.gases.clone();
        let interval = self.config.interval;
        // Offset the seed per start so a resumed run does not replay values.
        let seed = self.config.seed.map(|s| s.wrapping_add(self.starts));

        let handle = thread::Builder::new()
            .name("gas-simulator".to_string())
            .spawn(move || run_feed(running, sender, gases, interval, seed))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SimulatorError::Spawn(e.to_string())
            })?;

        self.handle = Some(handle);
        self.starts += 1;
        tracing::debug!(interval_ms = interval.as_millis() as u64, "simulator started");
        Ok(())
    }

    /// Stop emitting readings and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("simulator thread panicked");
            }
        }
    }

    /// Check if the simulator is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for sensor events.
    pub fn receiver(&self) -> &Receiver<SensorEvent> {
        &self.receiver
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<SensorEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_feed(
    running: Arc<AtomicBool>,
    sender: Sender<SensorEvent>,
    gases: Vec<Gas>,
    interval: Duration,
    seed: Option<u64>,
) {
    let mut generator = ReadingGenerator::new(seed);
    let poll = interval.min(Duration::from_millis(50));

    while running.load(Ordering::SeqCst) {
        let now = Utc::now();
        for &gas in &gases {
            let event = SensorEvent::new(gas, generator.generate(gas, now));
            match sender.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(gas = gas.id(), "event channel full, dropping reading");
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }

        // Sleep in short slices so stop() is honoured promptly.
        let mut waited = Duration::ZERO;
        while waited < interval && running.load(Ordering::SeqCst) {
            thread::sleep(poll);
            waited += poll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let at = Utc::now();
        let mut a = ReadingGenerator::new(Some(42));
        let mut b = ReadingGenerator::new(Some(42));
        for gas in Gas::ALL {
            assert_eq!(a.generate(gas, at), b.generate(gas, at));
        }
    }

    #[test]
    fn test_so2_offset_range() {
        let mut generator = ReadingGenerator::new(Some(7));
        for _ in 0..500 {
            let reading = generator.generate(Gas::So2, Utc::now());
            assert!((400.0..=650.0).contains(&reading.value), "{}", reading.value);
            assert!(reading.zone.is_some());
        }
    }

    #[test]
    fn test_history_is_ascending() {
        let mut generator = ReadingGenerator::new(Some(1));
        let history = generator.history(Gas::H2s, 144, ChronoDuration::minutes(10));

        assert_eq!(history.len(), 144);
        assert!(history
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp));
        assert!(history.iter().all(|r| r.value >= 0.0));
    }

    #[test]
    fn test_simulator_emits_and_rejects_double_start() {
        let mut simulator = Simulator::new(SimulatorConfig {
            gases: vec![Gas::So2, Gas::Co],
            interval: Duration::from_millis(20),
            seed: Some(3),
        });

        simulator.start().unwrap();
        assert!(simulator.is_running());
        assert!(matches!(
            simulator.start(),
            Err(SimulatorError::AlreadyRunning)
        ));

        let first = simulator
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .expect("no event emitted");
        assert!(first.gas == Gas::So2 || first.gas == Gas::Co);

        simulator.stop();
        assert!(!simulator.is_running());
    }
}
