//! # Sensor Node
//!
//! The device orchestrator: composes the CPU, memory, battery, network, and
//! sensor models into one device that performs sensing, processing, and
//! transmission cycles. Owns the run's single seeded RNG so every
//! stochastic draw happens in a fixed order per tick.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::device::{
    BatteryModel, BatteryState, CpuModel, CpuState, MemoryModel, MemoryState, NetworkModel,
    NetworkState, Operation, SensorDataGenerator, SensorReading, TransmitResult,
};

/// Sensor section of the device snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSummary {
    pub last_reading: Option<SensorReading>,
    pub total_readings: u64,
    pub anomaly_count: u64,
}

/// Complete device state, rebuilt on demand each tick. Downstream consumers
/// receive value copies; nothing writes back through a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub cpu: CpuState,
    pub memory: MemoryState,
    pub battery: BatteryState,
    pub network: NetworkState,
    pub sensors: SensorSummary,
    pub is_active: bool,
    pub tick: u64,
}

/// Result of advancing the device by one tick.
#[derive(Debug, Clone)]
pub struct NodeTickResult {
    pub tick: u64,
    pub is_active: bool,
    pub new_reading: Option<SensorReading>,
    pub is_sensing_tick: bool,
    /// Battery warning fractions newly crossed this tick.
    pub battery_warnings: Vec<f64>,
    /// Snapshot of the device as of the end of this tick (pre-transmission).
    pub state: DeviceSnapshot,
}

/// Simulates a complete IoT sensor node with constrained resources.
pub struct SensorNode {
    sampling_rate_s: u64,

    cpu: CpuModel,
    memory: MemoryModel,
    battery: BatteryModel,
    network: NetworkModel,
    sensors: SensorDataGenerator,
    rng: StdRng,

    tick_count: u64,
    total_readings: u64,
    last_reading: Option<SensorReading>,
    is_active: bool,
}

impl SensorNode {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            sampling_rate_s: config.simulation.sampling_rate_seconds,
            cpu: CpuModel::new(&config.device.processor),
            memory: MemoryModel::new(&config.device.memory),
            battery: BatteryModel::new(&config.device.battery),
            network: NetworkModel::new(&config.device.network),
            sensors: SensorDataGenerator::new(&config.sensors),
            rng: StdRng::seed_from_u64(config.simulation.random_seed),
            tick_count: 0,
            total_readings: 0,
            last_reading: None,
            is_active: true,
        }
    }

    /// Advance the device by one simulation tick.
    pub fn tick(&mut self, time_step_s: f64) -> NodeTickResult {
        if !self.is_active || self.battery.is_depleted() {
            self.is_active = false;
            return NodeTickResult {
                tick: self.tick_count,
                is_active: false,
                new_reading: None,
                is_sensing_tick: false,
                battery_warnings: Vec::new(),
                state: self.full_state(),
            };
        }

        self.tick_count += 1;
        let mut new_reading = None;
        let mut active_operations: Vec<Operation> = Vec::new();

        let is_sensing_tick = self.tick_count % self.sampling_rate_s == 0;

        if is_sensing_tick {
            self.cpu.schedule_task(Operation::Sensing);
            active_operations.push(Operation::Sensing);

            let reading = self
                .sensors
                .generate_reading(self.tick_count, time_step_s, &mut self.rng);
            self.last_reading = Some(reading.clone());
            self.total_readings += 1;

            self.memory.allocate_sensor_buffer();

            self.cpu.schedule_task(Operation::Processing);
            active_operations.push(Operation::Processing);

            new_reading = Some(reading);
        } else {
            active_operations.push(Operation::Idle);
        }

        self.cpu.tick(time_step_s, &mut self.rng);
        self.memory.tick(time_step_s);
        self.battery.tick(&active_operations, time_step_s);
        self.network.tick(time_step_s);

        let battery_warnings = self.battery.check_warnings();

        NodeTickResult {
            tick: self.tick_count,
            is_active: self.is_active,
            new_reading,
            is_sensing_tick,
            battery_warnings,
            state: self.full_state(),
        }
    }

    /// Transmit data over the network, consuming CPU, battery, and
    /// bandwidth. The radio draws power for the full transmission duration
    /// whether or not the packet survives.
    pub fn transmit_data(&mut self, payload_bytes: usize) -> TransmitResult {
        if !self.is_active {
            return TransmitResult::rejected();
        }

        self.cpu.schedule_task(Operation::Transmission);

        let max_bytes_per_sec = self.network.max_bandwidth_kbps() * 1000.0 / 8.0;
        let tx_duration_s = if max_bytes_per_sec > 0.0 {
            payload_bytes as f64 / max_bytes_per_sec
        } else {
            1.0
        };
        self.battery.consume(Operation::Transmission, tx_duration_s);

        let result = self.network.transmit(payload_bytes, &mut self.rng);

        if result.success {
            self.memory.free_sensor_buffers(None);
        }

        result
    }

    /// Rebuild the full device state snapshot.
    pub fn full_state(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            cpu: self.cpu.state(),
            memory: self.memory.state(),
            battery: self.battery.state(),
            network: self.network.state(),
            sensors: SensorSummary {
                last_reading: self.last_reading.clone(),
                total_readings: self.total_readings,
                anomaly_count: self.sensors.total_anomalies(),
            },
            is_active: self.is_active,
            tick: self.tick_count,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_readings(&self) -> u64 {
        self.total_readings
    }

    pub fn cpu(&self) -> &CpuModel {
        &self.cpu
    }

    pub fn memory(&self) -> &MemoryModel {
        &self.memory
    }

    pub fn battery(&self) -> &BatteryModel {
        &self.battery
    }

    pub fn network(&self) -> &NetworkModel {
        &self.network
    }

    pub fn sensors(&self) -> &SensorDataGenerator {
        &self.sensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> SensorNode {
        SensorNode::new(&SimConfig::default())
    }

    #[test]
    fn sensing_follows_sampling_cadence() {
        let mut config = SimConfig::default();
        config.simulation.sampling_rate_seconds = 5;
        let mut node = SensorNode::new(&config);

        let mut sensing_ticks = Vec::new();
        for _ in 0..20 {
            let result = node.tick(1.0);
            if result.is_sensing_tick {
                sensing_ticks.push(result.tick);
            }
        }

        assert_eq!(sensing_ticks, vec![5, 10, 15, 20]);
        assert_eq!(node.total_readings(), 4);
    }

    #[test]
    fn idle_ticks_produce_no_reading() {
        let mut node = node();
        let result = node.tick(1.0);
        assert!(!result.is_sensing_tick);
        assert!(result.new_reading.is_none());
    }

    #[test]
    fn sensing_tick_allocates_buffer() {
        let mut config = SimConfig::default();
        config.simulation.sampling_rate_seconds = 1;
        let mut node = SensorNode::new(&config);

        node.tick(1.0);
        assert_eq!(node.full_state().memory.buffer_count, 1);
    }

    #[test]
    fn successful_transmit_frees_buffers() {
        let mut config = SimConfig::default();
        config.simulation.sampling_rate_seconds = 1;
        config.device.network.base_packet_loss_rate = 0.0;
        config.device.network.congested_packet_loss_rate = 0.0;
        let mut node = SensorNode::new(&config);

        for _ in 0..3 {
            node.tick(1.0);
        }
        assert_eq!(node.full_state().memory.buffer_count, 3);

        let result = node.transmit_data(256);
        assert!(result.success);
        assert_eq!(node.full_state().memory.buffer_count, 0);
    }

    #[test]
    fn transmit_charges_battery_even_on_loss() {
        let mut config = SimConfig::default();
        config.device.network.base_packet_loss_rate = 1.0;
        config.device.network.congested_packet_loss_rate = 1.0;
        let mut node = SensorNode::new(&config);

        let before = node.full_state().battery.total_consumed_mah;
        let result = node.transmit_data(1024);
        assert!(!result.success);

        let after = node.full_state().battery.total_consumed_mah;
        assert!(after > before, "radio power must be spent on lost packets");
    }

    #[test]
    fn depleted_battery_deactivates_device() {
        let mut config = SimConfig::default();
        config.device.battery.capacity_mah = 0.01;
        config.simulation.sampling_rate_seconds = 1;
        let mut node = SensorNode::new(&config);

        let mut saw_inactive = false;
        for _ in 0..200 {
            let result = node.tick(1.0);
            if !result.is_active {
                saw_inactive = true;
                break;
            }
        }

        assert!(saw_inactive);
        assert!(!node.is_active());
        assert!(node.full_state().battery.depleted);

        // Once inactive, ticks are zero-activity and do not advance the count.
        let frozen = node.tick_count();
        let result = node.tick(1.0);
        assert!(!result.is_active);
        assert!(result.new_reading.is_none());
        assert_eq!(node.tick_count(), frozen);
    }

    #[test]
    fn inactive_device_rejects_transmissions() {
        let mut config = SimConfig::default();
        config.device.battery.capacity_mah = 0.001;
        let mut node = SensorNode::new(&config);

        for _ in 0..10 {
            node.tick(1.0);
        }
        assert!(!node.is_active());

        let result = node.transmit_data(100);
        assert!(!result.success);
        assert!(!result.packet_loss);
        assert_eq!(result.bytes_sent, 0);
    }

    #[test]
    fn snapshots_are_value_copies() {
        let mut node = node();
        node.tick(1.0);

        let a = node.full_state();
        node.tick(1.0);
        let b = node.full_state();

        // Advancing the device does not mutate an earlier snapshot.
        assert_eq!(a.tick, 1);
        assert_eq!(b.tick, 2);
    }
}
