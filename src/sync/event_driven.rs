//! Event-driven sync: replicate only when a key gauge moved significantly,
//! with a heartbeat after long silence. Cheapest strategy while the system
//! is stable, at the cost of missing slow drift between heartbeats.

use crate::config::SyncConfig;
use crate::device::DeviceSnapshot;
use crate::sync::{PayloadType, SyncPayload};

/// Heartbeat fires after this many base intervals without a sync.
const HEARTBEAT_INTERVALS: u64 = 6;

/// The four gauges compared against the last-synced baseline. The payload
/// itself is always the full snapshot; only the comparison baseline is
/// reduced to these fields.
#[derive(Debug, Clone, Copy)]
struct GaugeBaseline {
    cpu_utilization: f64,
    memory_utilization: f64,
    battery_percentage: f64,
    network_bandwidth_utilization: f64,
}

impl GaugeBaseline {
    fn from_state(state: &DeviceSnapshot) -> Self {
        Self {
            cpu_utilization: state.cpu.utilization,
            memory_utilization: state.memory.utilization,
            battery_percentage: state.battery.percentage,
            network_bandwidth_utilization: state.network.bandwidth_utilization,
        }
    }

    fn changed_beyond(&self, state: &DeviceSnapshot, threshold: f64) -> bool {
        let pairs = [
            (self.cpu_utilization, state.cpu.utilization),
            (self.memory_utilization, state.memory.utilization),
            (self.battery_percentage, state.battery.percentage),
            (
                self.network_bandwidth_utilization,
                state.network.bandwidth_utilization,
            ),
        ];
        pairs.iter().any(|(old, new)| (new - old).abs() > threshold)
    }
}

pub struct EventDrivenSync {
    change_threshold: f64,
    max_silent_interval: u64,
    last_sync_tick: u64,
    last_synced_state: Option<GaugeBaseline>,
}

impl EventDrivenSync {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            change_threshold: config.event_change_threshold,
            max_silent_interval: config.full_state_interval_s * HEARTBEAT_INTERVALS,
            last_sync_tick: 0,
            last_synced_state: None,
        }
    }

    pub fn should_sync(&self, tick: u64, state: &DeviceSnapshot) -> bool {
        // Heartbeat: force a sync after long silence.
        if tick.saturating_sub(self.last_sync_tick) >= self.max_silent_interval {
            return true;
        }

        match &self.last_synced_state {
            None => true,
            Some(baseline) => baseline.changed_beyond(state, self.change_threshold),
        }
    }

    pub fn prepare_payload(&mut self, state: &DeviceSnapshot) -> SyncPayload {
        self.last_synced_state = Some(GaugeBaseline::from_state(state));
        self.last_sync_tick = state.tick;
        SyncPayload::full(PayloadType::EventDriven, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::sample_state;
    use crate::sync::PayloadData;

    #[test]
    fn first_call_always_syncs() {
        let sync = EventDrivenSync::new(&SyncConfig::default());
        let state = sample_state(5);
        assert!(sync.should_sync(5, &state));
    }

    #[test]
    fn stable_state_stays_silent() {
        let mut sync = EventDrivenSync::new(&SyncConfig::default());
        let state = sample_state(10);
        sync.prepare_payload(&state);

        assert!(!sync.should_sync(state.tick + 1, &state));
    }

    #[test]
    fn significant_change_triggers_sync() {
        let mut sync = EventDrivenSync::new(&SyncConfig::default());
        let state = sample_state(10);
        sync.prepare_payload(&state);

        let mut moved = state.clone();
        moved.cpu.utilization += 0.2; // > 0.05 threshold
        assert!(sync.should_sync(state.tick + 1, &moved));
    }

    #[test]
    fn heartbeat_fires_after_silence() {
        let mut sync = EventDrivenSync::new(&SyncConfig::default());
        let state = sample_state(10);
        sync.prepare_payload(&state);

        // No change at all, but 6 × interval later the heartbeat forces it.
        let heartbeat_tick = state.tick + 6 * SyncConfig::default().full_state_interval_s;
        assert!(!sync.should_sync(heartbeat_tick - 1, &state));
        assert!(sync.should_sync(heartbeat_tick, &state));
    }

    #[test]
    fn payload_is_full_state() {
        let mut sync = EventDrivenSync::new(&SyncConfig::default());
        let state = sample_state(10);

        let payload = sync.prepare_payload(&state);
        assert_eq!(payload.payload_type, PayloadType::EventDriven);
        assert!(matches!(payload.data, PayloadData::Full(_)));
    }
}
