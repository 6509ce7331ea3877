//! Full-state sync: the entire device snapshot at fixed intervals.

use crate::config::SyncConfig;
use crate::device::DeviceSnapshot;
use crate::sync::{PayloadType, SyncPayload};

pub struct FullStateSync {
    interval_s: u64,
    last_sync_tick: u64,
}

impl FullStateSync {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            interval_s: config.full_state_interval_s,
            last_sync_tick: 0,
        }
    }

    pub fn should_sync(&self, tick: u64) -> bool {
        tick.saturating_sub(self.last_sync_tick) >= self.interval_s
    }

    pub fn prepare_payload(&mut self, state: &DeviceSnapshot) -> SyncPayload {
        self.last_sync_tick = state.tick;
        SyncPayload::full(PayloadType::FullState, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::sample_state;
    use crate::sync::PayloadData;

    #[test]
    fn syncs_at_interval() {
        let sync = FullStateSync::new(&SyncConfig::default());
        assert!(!sync.should_sync(1));
        assert!(sync.should_sync(10));
        assert!(sync.should_sync(11));
    }

    #[test]
    fn payload_is_full_state_and_advances_bookkeeping() {
        let mut sync = FullStateSync::new(&SyncConfig::default());
        let state = sample_state(10);

        let payload = sync.prepare_payload(&state);
        assert_eq!(payload.payload_type, PayloadType::FullState);
        assert!(matches!(payload.data, PayloadData::Full(_)));

        // Bookkeeping moved to the synced tick.
        assert!(!sync.should_sync(state.tick + 1));
        assert!(sync.should_sync(state.tick + 10));
    }
}
