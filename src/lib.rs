//! # iot-twin-sim
//!
//! Discrete-event simulator of a resource-constrained IoT sensor node and
//! its Digital Twin. The simulator advances a deterministic fixed-timestep
//! model of the device hardware (processor, memory, battery, radio,
//! sensors), replicates state to a virtual mirror under one of four sync
//! strategies, and runs analytical passes (fault detection, resource
//! exhaustion prediction) over the evolving telemetry.
//!
//! ## Components
//!
//! - **device**: coupled stochastic resource models advanced on a shared tick
//! - **edge**: filter, prioritize, and compress pipeline between device and sync
//! - **sync**: policy-driven state replication (full-state, delta,
//!   event-driven, adaptive)
//! - **twin**: mirrored state with drift accounting between sync events
//! - **analysis**: fault rules, trend extrapolation, what-if comparison
//! - **runner**: the single-threaded tick loop wiring everything together
//!
//! ## Usage
//!
//! ```no_run
//! use iot_twin_sim::{config::SimConfig, runner::Simulation};
//!
//! let config = SimConfig::load(None).expect("config");
//! let mut sim = Simulation::new(config);
//! let outcome = sim.run().expect("run");
//! println!("ran {} ticks", outcome.ticks_run);
//! ```

pub mod analysis;
pub mod config;
pub mod device;
pub mod edge;
pub mod logger;
pub mod runner;
pub mod sync;
pub mod telemetry;
pub mod twin;

/// Canonical encoded length of a value, used wherever the simulation needs
/// a byte count for a payload (sync sizing, edge compression estimates).
///
/// Serialization of the crate's own snapshot types cannot fail; if it ever
/// did, a zero-byte count is the conservative usable value (runtime
/// anomalies are accounted, not raised).
pub(crate) fn encoded_len<T: serde::Serialize>(value: &T) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0)
}
