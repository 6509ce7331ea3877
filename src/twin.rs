//! # Digital Twin
//!
//! Virtual mirror of the physical device. Holds the last received snapshot
//! plus a predicted snapshot it extrapolates between syncs, and accounts
//! the drift between prediction and reality at every sync event.

use serde::Serialize;

use crate::device::DeviceSnapshot;

/// Drift grows by this much per tick of silence since the last sync.
const DRIFT_PER_TICK: f64 = 0.0005;

/// One received sync in the twin's history.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub tick: u64,
    pub state: DeviceSnapshot,
    pub drift: f64,
}

/// Twin state summary.
#[derive(Debug, Clone, Serialize)]
pub struct TwinState {
    pub current_drift: f64,
    pub avg_accuracy: f64,
    pub max_drift: f64,
    pub max_drift_tick: usize,
    pub total_syncs: u64,
    pub sync_success_rate: f64,
    pub last_sync_tick: u64,
}

/// Virtual representation of the physical IoT sensor node.
#[derive(Default)]
pub struct DigitalTwin {
    /// Last known device state, as received.
    device_state: Option<DeviceSnapshot>,
    /// Extrapolated state; owned copy so prediction never mutates history.
    predicted_state: Option<DeviceSnapshot>,
    state_history: Vec<SyncRecord>,
    drift_history: Vec<f64>,
    accuracy_history: Vec<f64>,

    total_syncs: u64,
    last_sync_tick: u64,
    sync_success_count: u64,
    sync_fail_count: u64,

    current_drift: f64,
}

impl DigitalTwin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive a state update from the physical device. Drift is measured
    /// against the *predicted* state before both copies are replaced.
    pub fn receive_sync(&mut self, device_state: &DeviceSnapshot, tick: u64) {
        self.current_drift = match &self.predicted_state {
            Some(predicted) => Self::calculate_drift(predicted, device_state),
            None => 0.0,
        };

        self.device_state = Some(device_state.clone());
        self.predicted_state = Some(device_state.clone());
        self.last_sync_tick = tick;
        self.total_syncs += 1;
        self.sync_success_count += 1;

        self.accuracy_history.push(1.0 - self.current_drift);
        self.drift_history.push(self.current_drift);

        self.state_history.push(SyncRecord {
            tick,
            state: device_state.clone(),
            drift: self.current_drift,
        });
    }

    /// Record a failed sync attempt without touching the mirrored state.
    pub fn record_sync_failure(&mut self, _tick: u64) {
        self.sync_fail_count += 1;
        self.total_syncs += 1;
    }

    /// Advance the twin one tick with no sync: drift grows linearly with
    /// silence, and the predicted battery keeps draining at the average
    /// historical rate.
    pub fn tick(&mut self, current_tick: u64) {
        let last_sync_tick = self.last_sync_tick;

        let predicted = match &mut self.predicted_state {
            Some(p) => p,
            None => return,
        };

        let ticks_since_sync = current_tick.saturating_sub(last_sync_tick);
        self.current_drift = (ticks_since_sync as f64 * DRIFT_PER_TICK).min(1.0);

        let battery = &mut predicted.battery;
        if battery.remaining_mah > 0.0 && last_sync_tick > 0 {
            let drain_rate = battery.total_consumed_mah / last_sync_tick.max(1) as f64;
            battery.remaining_mah =
                (battery.remaining_mah - drain_rate * ticks_since_sync as f64).max(0.0);
        }

        self.accuracy_history.push((1.0 - self.current_drift).max(0.0));
        self.drift_history.push(self.current_drift);
    }

    /// Normalized drift between predicted and actual snapshots: mean of the
    /// battery (per capacity), memory (per pool size), and CPU (already
    /// normalized) divergences, over whichever comparisons are possible.
    fn calculate_drift(predicted: &DeviceSnapshot, actual: &DeviceSnapshot) -> f64 {
        let mut diffs = Vec::with_capacity(3);

        if predicted.battery.remaining_mah != 0.0 && actual.battery.remaining_mah != 0.0 {
            let cap = actual.battery.capacity_mah;
            diffs.push((predicted.battery.remaining_mah - actual.battery.remaining_mah).abs() / cap);
        }

        if predicted.memory.total_kb != 0.0 && actual.memory.total_kb != 0.0 {
            diffs.push(
                (predicted.memory.used_kb - actual.memory.used_kb).abs() / actual.memory.total_kb,
            );
        }

        diffs.push((predicted.cpu.utilization - actual.cpu.utilization).abs());

        if diffs.is_empty() {
            return 0.0;
        }
        diffs.iter().sum::<f64>() / diffs.len() as f64
    }

    pub fn current_drift(&self) -> f64 {
        self.current_drift
    }

    pub fn last_sync_tick(&self) -> u64 {
        self.last_sync_tick
    }

    pub fn device_state(&self) -> Option<&DeviceSnapshot> {
        self.device_state.as_ref()
    }

    pub fn state_history(&self) -> &[SyncRecord] {
        &self.state_history
    }

    pub fn avg_accuracy(&self) -> f64 {
        if self.accuracy_history.is_empty() {
            return 1.0;
        }
        self.accuracy_history.iter().sum::<f64>() / self.accuracy_history.len() as f64
    }

    /// Maximum observed drift and the history index where it happened.
    pub fn max_drift(&self) -> (f64, usize) {
        let mut max_drift = 0.0;
        let mut max_index = 0;
        for (i, &drift) in self.drift_history.iter().enumerate() {
            if drift > max_drift {
                max_drift = drift;
                max_index = i;
            }
        }
        (max_drift, max_index)
    }

    pub fn sync_success_rate(&self) -> f64 {
        if self.total_syncs == 0 {
            return 1.0;
        }
        self.sync_success_count as f64 / self.total_syncs as f64
    }

    pub fn state(&self) -> TwinState {
        let (max_drift, max_drift_tick) = self.max_drift();
        TwinState {
            current_drift: self.current_drift,
            avg_accuracy: self.avg_accuracy(),
            max_drift,
            max_drift_tick,
            total_syncs: self.total_syncs,
            sync_success_rate: self.sync_success_rate(),
            last_sync_tick: self.last_sync_tick,
        }
    }
}
