//! # Sync Engine
//!
//! Wraps the chosen strategy: decides when to sync, sizes payloads by their
//! canonical JSON encoding, and keeps the append-only event log and
//! byte/sync counters.

use serde::Serialize;

use crate::config::SyncConfig;
use crate::device::DeviceSnapshot;
use crate::encoded_len;
use crate::sync::{SyncPayload, SyncStrategy, SyncStrategyKind};

/// A payload plus its wire size.
#[derive(Debug, Clone)]
pub struct PreparedPayload {
    pub payload: SyncPayload,
    pub size_bytes: usize,
}

/// One entry in the engine's event log.
#[derive(Debug, Clone, Serialize)]
pub struct SyncEvent {
    pub tick: u64,
    pub size_bytes: usize,
    pub success: bool,
    pub strategy: SyncStrategyKind,
}

/// Aggregated sync statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStats {
    pub strategy: SyncStrategyKind,
    pub total_syncs: u64,
    pub total_bytes_synced: u64,
    pub avg_payload_bytes: f64,
}

/// Controls data synchronization between the device and its Digital Twin.
pub struct SyncEngine {
    kind: SyncStrategyKind,
    strategy: SyncStrategy,

    total_syncs: u64,
    total_bytes_synced: u64,
    events: Vec<SyncEvent>,
}

impl SyncEngine {
    /// Build the engine for a strategy. `override_kind` (e.g. from the CLI)
    /// wins over the configured default.
    pub fn new(config: &SyncConfig, override_kind: Option<SyncStrategyKind>) -> Self {
        let kind = override_kind.unwrap_or(config.default_strategy);
        Self {
            kind,
            strategy: SyncStrategy::new(kind, config),
            total_syncs: 0,
            total_bytes_synced: 0,
            events: Vec::new(),
        }
    }

    pub fn kind(&self) -> SyncStrategyKind {
        self.kind
    }

    pub fn should_sync(&mut self, tick: u64, state: &DeviceSnapshot, battery_pct: f64) -> bool {
        self.strategy.should_sync(tick, state, battery_pct)
    }

    /// Build the payload and measure its canonical encoded size.
    pub fn prepare_payload(&mut self, state: &DeviceSnapshot) -> PreparedPayload {
        let payload = self.strategy.prepare_payload(state);
        let size_bytes = encoded_len(&payload);
        PreparedPayload {
            payload,
            size_bytes,
        }
    }

    /// Record a sync attempt. Only successful syncs count toward bytes.
    pub fn record_sync(&mut self, tick: u64, size_bytes: usize, success: bool) {
        self.total_syncs += 1;
        if success {
            self.total_bytes_synced += size_bytes as u64;
        }
        self.events.push(SyncEvent {
            tick,
            size_bytes,
            success,
            strategy: self.kind,
        });
    }

    pub fn events(&self) -> &[SyncEvent] {
        &self.events
    }

    pub fn total_syncs(&self) -> u64 {
        self.total_syncs
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            strategy: self.kind,
            total_syncs: self.total_syncs,
            total_bytes_synced: self.total_bytes_synced,
            avg_payload_bytes: if self.total_syncs > 0 {
                self.total_bytes_synced as f64 / self.total_syncs as f64
            } else {
                0.0
            },
        }
    }
}
