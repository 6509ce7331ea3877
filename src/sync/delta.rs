//! Delta sync: differential updates of numeric leaves that moved beyond a
//! relative threshold. Same cadence as full-state, smaller payloads.

use std::collections::BTreeMap;

use crate::config::SyncConfig;
use crate::device::DeviceSnapshot;
use crate::sync::{flatten_numeric, PayloadData, PayloadType, SyncPayload};

pub struct DeltaSync {
    interval_s: u64,
    delta_threshold: f64,
    last_sync_tick: u64,
    /// Flattened view of the last-synced snapshot, owned value map.
    last_synced_state: Option<BTreeMap<String, f64>>,
}

impl DeltaSync {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            interval_s: config.full_state_interval_s,
            delta_threshold: config.delta_threshold,
            last_sync_tick: 0,
            last_synced_state: None,
        }
    }

    pub fn should_sync(&self, tick: u64) -> bool {
        tick.saturating_sub(self.last_sync_tick) >= self.interval_s
    }

    pub fn prepare_payload(&mut self, state: &DeviceSnapshot) -> SyncPayload {
        let current = flatten_numeric(state);

        let previous = match &self.last_synced_state {
            None => {
                // First sync sends everything.
                self.last_synced_state = Some(current);
                self.last_sync_tick = state.tick;
                return SyncPayload::full(PayloadType::FullState, state);
            }
            Some(prev) => prev,
        };

        let mut delta = BTreeMap::new();
        for (key, &value) in &current {
            match previous.get(key) {
                Some(&old) if !Self::changed_significantly(old, value, self.delta_threshold) => {}
                _ => {
                    delta.insert(key.clone(), value);
                }
            }
        }

        let fields_total = current.len();
        let fields_changed = delta.len();

        self.last_synced_state = Some(current);
        self.last_sync_tick = state.tick;

        SyncPayload {
            payload_type: PayloadType::Delta,
            data: PayloadData::Delta(delta),
            fields_changed: Some(fields_changed),
            fields_total: Some(fields_total),
            interval_used: None,
        }
    }

    /// Relative change beyond the threshold. A zero baseline counts as
    /// changed for any non-zero new value.
    fn changed_significantly(old: f64, new: f64, threshold: f64) -> bool {
        if old == 0.0 {
            return new != 0.0;
        }
        ((new - old) / old).abs() > threshold
    }
}
