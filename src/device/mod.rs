//! # Device Model
//!
//! Coupled stochastic resource models for a constrained IoT sensor node,
//! each advanced on a shared tick:
//!
//! - **Sensors**: synthetic temperature/humidity/light readings with noise
//!   and anomaly injection
//! - **CPU**: task-queue utilization with Gaussian jitter
//! - **Memory**: fixed RAM pool with sensor buffers and optional leak
//! - **Battery**: per-operation drain with warning thresholds
//! - **Network**: bandwidth, congestion, and packet loss
//! - **SensorNode**: the orchestrator composing the five above

pub mod battery;
pub mod cpu;
pub mod memory;
pub mod network;
pub mod node;
pub mod sensors;

pub use battery::{BatteryModel, BatteryState, EnergyBreakdown};
pub use cpu::{CpuModel, CpuState};
pub use memory::{MemoryModel, MemoryState};
pub use network::{NetworkModel, NetworkState, TransmitResult};
pub use node::{DeviceSnapshot, NodeTickResult, SensorNode, SensorSummary};
pub use sensors::{AnomalyRecord, SensorDataGenerator, SensorKind, SensorReading};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Operation types a device tick can be charged for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Sensing,
    Processing,
    Transmission,
    Idle,
}

/// Round to a fixed number of decimal places (sensor readings are reported
/// at instrument precision, not raw f64).
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
