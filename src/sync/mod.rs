//! # Sync Engine & Strategies
//!
//! Policy-driven state replication between the device and its Digital Twin.
//! Four strategies share one contract: `should_sync` decides whether this
//! tick replicates, `prepare_payload` builds the data and advances the
//! strategy's last-sync bookkeeping.
//!
//! - **Full-state**: entire snapshot at fixed intervals. Highest accuracy,
//!   highest cost.
//! - **Delta**: same cadence, but only numeric leaves that moved beyond a
//!   relative threshold.
//! - **Event-driven**: replicates on significant change, with a heartbeat
//!   after long silence. Cheapest when the system is stable.
//! - **Adaptive**: full state at a battery-aware interval.
//!
//! Strategy selection happens once at engine construction; the strategies
//! are a closed tagged variant, not open dispatch.

pub mod adaptive;
pub mod delta;
pub mod engine;
pub mod event_driven;
pub mod full_state;

pub use adaptive::AdaptiveSync;
pub use delta::DeltaSync;
pub use engine::{PreparedPayload, SyncEngine, SyncEvent, SyncStats};
pub use event_driven::EventDrivenSync;
pub use full_state::FullStateSync;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

use crate::config::SyncConfig;
use crate::device::DeviceSnapshot;

/// Which sync strategy the engine runs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncStrategyKind {
    #[value(name = "full_state")]
    FullState,
    #[value(name = "delta")]
    Delta,
    #[value(name = "event_driven")]
    EventDriven,
    #[value(name = "adaptive")]
    Adaptive,
}

/// Payload type tag. A delta strategy's first emission is a full-state
/// payload, so this is distinct from the strategy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    FullState,
    Delta,
    EventDriven,
    Adaptive,
}

/// Payload body: either a full snapshot or a flattened delta map.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PayloadData {
    Full(DeviceSnapshot),
    Delta(BTreeMap<String, f64>),
}

/// One sync payload as handed to the radio.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPayload {
    #[serde(rename = "type")]
    pub payload_type: PayloadType,
    pub data: PayloadData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_changed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_used: Option<u64>,
}

impl SyncPayload {
    fn full(payload_type: PayloadType, state: &DeviceSnapshot) -> Self {
        Self {
            payload_type,
            data: PayloadData::Full(state.clone()),
            fields_changed: None,
            fields_total: None,
            interval_used: None,
        }
    }
}

/// Closed set of sync strategies behind the common contract.
pub enum SyncStrategy {
    FullState(FullStateSync),
    Delta(DeltaSync),
    EventDriven(EventDrivenSync),
    Adaptive(AdaptiveSync),
}

impl SyncStrategy {
    pub fn new(kind: SyncStrategyKind, config: &SyncConfig) -> Self {
        match kind {
            SyncStrategyKind::FullState => Self::FullState(FullStateSync::new(config)),
            SyncStrategyKind::Delta => Self::Delta(DeltaSync::new(config)),
            SyncStrategyKind::EventDriven => Self::EventDriven(EventDrivenSync::new(config)),
            SyncStrategyKind::Adaptive => Self::Adaptive(AdaptiveSync::new(config)),
        }
    }

    /// Should a sync occur at this tick?
    pub fn should_sync(&mut self, tick: u64, state: &DeviceSnapshot, battery_pct: f64) -> bool {
        match self {
            Self::FullState(s) => s.should_sync(tick),
            Self::Delta(s) => s.should_sync(tick),
            Self::EventDriven(s) => s.should_sync(tick, state),
            Self::Adaptive(s) => s.should_sync(tick, battery_pct),
        }
    }

    /// Build the payload and advance last-sync bookkeeping.
    pub fn prepare_payload(&mut self, state: &DeviceSnapshot) -> SyncPayload {
        match self {
            Self::FullState(s) => s.prepare_payload(state),
            Self::Delta(s) => s.prepare_payload(state),
            Self::EventDriven(s) => s.prepare_payload(state),
            Self::Adaptive(s) => s.prepare_payload(state),
        }
    }
}

/// Flatten a snapshot into dotted-path → numeric-leaf pairs.
///
/// Only numbers survive; booleans flatten to 0/1 so a latch flipping shows
/// up as a changed field. Strings and lists are skipped. The result is an
/// owned value map with no references into the live device state.
pub(crate) fn flatten_numeric(state: &DeviceSnapshot) -> BTreeMap<String, f64> {
    let mut flat = BTreeMap::new();
    if let Ok(value) = serde_json::to_value(state) {
        flatten_value(&value, String::new(), &mut flat);
    }
    flat
}

fn flatten_value(value: &serde_json::Value, prefix: String, out: &mut BTreeMap<String, f64>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_value(child, full_key, out);
            }
        }
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                out.insert(prefix, f);
            }
        }
        serde_json::Value::Bool(b) => {
            out.insert(prefix, if *b { 1.0 } else { 0.0 });
        }
        _ => {}
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::sample_state;

    #[test]
    fn flatten_produces_dotted_numeric_leaves() {
        let state = sample_state(10);
        let flat = flatten_numeric(&state);

        assert!(flat.contains_key("cpu.utilization"));
        assert!(flat.contains_key("battery.remaining_mah"));
        assert!(flat.contains_key("memory.used_kb"));
        assert!(flat.contains_key("tick"));
    }

    #[test]
    fn flatten_maps_booleans_to_zero_one() {
        let state = sample_state(10);
        let flat = flatten_numeric(&state);

        assert_eq!(flat.get("is_active"), Some(&1.0));
        assert_eq!(flat.get("battery.depleted"), Some(&0.0));
    }

    #[test]
    fn flatten_skips_strings() {
        let state = sample_state(10);
        let flat = flatten_numeric(&state);
        assert!(!flat.contains_key("network.type"));
    }

    #[test]
    fn strategy_kind_round_trips_snake_case() {
        for (text, kind) in [
            ("full_state", SyncStrategyKind::FullState),
            ("delta", SyncStrategyKind::Delta),
            ("event_driven", SyncStrategyKind::EventDriven),
            ("adaptive", SyncStrategyKind::Adaptive),
        ] {
            assert_eq!(kind.to_string(), text);
            let parsed: SyncStrategyKind = text.parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
