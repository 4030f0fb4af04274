//! Run a short seeded simulation and print each gas card as the dashboard would.
//!
//! ```sh
//! cargo run --example simulate_demo
//! ```

use gas_monitor_agent::sensor::{ReadingGenerator, Simulator, SimulatorConfig};
use gas_monitor_agent::{Gas, GasMonitor, ReportBuilder};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let monitor = GasMonitor::new(
        20,
        Gas::ALL.iter().map(|&gas| (gas, gas.default_thresholds())),
    )?;

    let mut generator = ReadingGenerator::new(Some(42));
    for gas in monitor.gases() {
        monitor
            .classifier(gas)?
            .extend(generator.history(gas, 10, chrono::Duration::minutes(1)));
    }

    let mut simulator = Simulator::new(SimulatorConfig {
        gases: monitor.gases(),
        interval: Duration::from_millis(200),
        seed: Some(43),
    });
    simulator.start()?;

    let receiver = simulator.receiver().clone();
    for _ in 0..15 {
        let event = receiver.recv_timeout(Duration::from_secs(2))?;
        let gas = event.gas;
        let assessment = monitor.record_event(event)?;
        let status = monitor.status(gas)?;
        println!("{:<4} {:>12}  {}", gas.to_string(), status.display, assessment);
    }
    simulator.stop();

    println!();
    println!("Overall: {}", monitor.overall());
    println!();
    println!("{}", ReportBuilder::new().build(&monitor).render_text());
    Ok(())
}
