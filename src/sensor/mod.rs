//! Sensor feed module for the gas monitor.
//!
//! Real acquisition hardware is out of scope; the simulator produces
//! readings with the same shape a live feed would.

pub mod simulator;
pub mod types;

// Re-export commonly used types
pub use simulator::{GasProfile, ReadingGenerator, Simulator, SimulatorConfig, SimulatorError};
pub use types::{Gas, Reading, SensorEvent, UnknownGasName};
