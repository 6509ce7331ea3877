//! Adaptive sync: full-state replication at a battery-aware interval.
//! Frequent while the battery is healthy, sparse as it drains.

use crate::config::SyncConfig;
use crate::device::DeviceSnapshot;
use crate::sync::{PayloadData, PayloadType, SyncPayload};

pub struct AdaptiveSync {
    high_battery_interval: u64,
    medium_battery_interval: u64,
    low_battery_interval: u64,
    high_battery_threshold: f64,
    low_battery_threshold: f64,

    last_sync_tick: u64,
    current_interval: u64,
}

impl AdaptiveSync {
    pub fn new(config: &SyncConfig) -> Self {
        let adaptive = &config.adaptive;
        Self {
            high_battery_interval: adaptive.high_battery_interval_s,
            medium_battery_interval: adaptive.medium_battery_interval_s,
            low_battery_interval: adaptive.low_battery_interval_s,
            high_battery_threshold: adaptive.high_battery_threshold,
            low_battery_threshold: adaptive.low_battery_threshold,
            last_sync_tick: 0,
            current_interval: adaptive.high_battery_interval_s,
        }
    }

    pub fn should_sync(&mut self, tick: u64, battery_pct: f64) -> bool {
        self.update_interval(battery_pct);
        tick.saturating_sub(self.last_sync_tick) >= self.current_interval
    }

    fn update_interval(&mut self, battery_pct: f64) {
        self.current_interval = if battery_pct > self.high_battery_threshold {
            self.high_battery_interval
        } else if battery_pct > self.low_battery_threshold {
            self.medium_battery_interval
        } else {
            self.low_battery_interval
        };
    }

    pub fn current_interval(&self) -> u64 {
        self.current_interval
    }

    pub fn prepare_payload(&mut self, state: &DeviceSnapshot) -> SyncPayload {
        self.last_sync_tick = state.tick;
        SyncPayload {
            payload_type: PayloadType::Adaptive,
            data: PayloadData::Full(state.clone()),
            fields_changed: None,
            fields_total: None,
            interval_used: Some(self.current_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::sample_state;
    use rstest::rstest;

    #[rstest]
    #[case(0.9, 5)]
    #[case(0.51, 5)]
    #[case(0.5, 15)]
    #[case(0.3, 15)]
    #[case(0.15, 60)]
    #[case(0.05, 60)]
    fn interval_tracks_battery_band(#[case] battery_pct: f64, #[case] expected: u64) {
        let mut sync = AdaptiveSync::new(&SyncConfig::default());
        sync.should_sync(0, battery_pct);
        assert_eq!(sync.current_interval(), expected);
    }

    #[test]
    fn syncs_at_selected_interval() {
        let mut sync = AdaptiveSync::new(&SyncConfig::default());
        assert!(!sync.should_sync(4, 0.9));
        assert!(sync.should_sync(5, 0.9));

        // Low battery stretches the interval.
        assert!(!sync.should_sync(30, 0.10));
        assert!(sync.should_sync(60, 0.10));
    }

    #[test]
    fn payload_tags_the_interval_used() {
        let mut sync = AdaptiveSync::new(&SyncConfig::default());
        sync.should_sync(0, 0.3);
        let state = sample_state(15);

        let payload = sync.prepare_payload(&state);
        assert_eq!(payload.payload_type, PayloadType::Adaptive);
        assert_eq!(payload.interval_used, Some(15));
    }
}
