//! # Network Model
//!
//! Simulates a LoRa/BLE-class radio link: limited bandwidth, payload size
//! caps, congestion, and statistical packet loss. The transport is modelled
//! per-payload rather than per-packet-on-the-wire.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;

/// Network state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    #[serde(rename = "type")]
    pub net_type: String,
    pub bandwidth_utilization: f64,
    pub peak_bandwidth_utilization: f64,
    pub total_bytes_sent: u64,
    pub total_packets_sent: u64,
    pub total_packets_lost: u64,
    pub packet_loss_rate: f64,
    pub congestion_events: u64,
}

/// Outcome of one transmission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitResult {
    pub success: bool,
    pub bytes_sent: usize,
    pub packet_loss: bool,
    pub congested: bool,
}

impl TransmitResult {
    /// A transmission refused before it reached the radio (inactive device).
    pub fn rejected() -> Self {
        Self {
            success: false,
            bytes_sent: 0,
            packet_loss: false,
            congested: false,
        }
    }
}

/// Simulates network communication for a constrained IoT device.
pub struct NetworkModel {
    net_type: String,
    max_bandwidth_kbps: f64,
    max_payload_bytes: usize,
    base_packet_loss_rate: f64,
    congestion_threshold: f64,
    congested_packet_loss_rate: f64,

    bytes_sent_this_tick: u64,
    total_bytes_sent: u64,
    total_packets_sent: u64,
    total_packets_lost: u64,
    current_bandwidth_utilization: f64,
    peak_bandwidth_utilization: f64,
    congestion_events: u64,
    utilization_history: Vec<f64>,
}

impl NetworkModel {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            net_type: config.net_type.clone(),
            max_bandwidth_kbps: config.max_bandwidth_kbps,
            max_payload_bytes: config.max_payload_bytes,
            base_packet_loss_rate: config.base_packet_loss_rate,
            congestion_threshold: config.congestion_threshold,
            congested_packet_loss_rate: config.congested_packet_loss_rate,
            bytes_sent_this_tick: 0,
            total_bytes_sent: 0,
            total_packets_sent: 0,
            total_packets_lost: 0,
            current_bandwidth_utilization: 0.0,
            peak_bandwidth_utilization: 0.0,
            congestion_events: 0,
            utilization_history: Vec::new(),
        }
    }

    /// Attempt to transmit a payload. Loss probability depends on whether
    /// the link is currently congested. Lost packets still count as sent.
    pub fn transmit(&mut self, payload_bytes: usize, rng: &mut StdRng) -> TransmitResult {
        let congested = self.current_bandwidth_utilization >= self.congestion_threshold;

        let loss_rate = if congested {
            self.congested_packet_loss_rate
        } else {
            self.base_packet_loss_rate
        };

        if rng.gen::<f64>() < loss_rate {
            self.total_packets_lost += 1;
            self.total_packets_sent += 1;
            return TransmitResult {
                success: false,
                bytes_sent: 0,
                packet_loss: true,
                congested,
            };
        }

        let actual_bytes = payload_bytes.min(self.max_payload_bytes);
        self.bytes_sent_this_tick += actual_bytes as u64;
        self.total_bytes_sent += actual_bytes as u64;
        self.total_packets_sent += 1;

        TransmitResult {
            success: true,
            bytes_sent: actual_bytes,
            packet_loss: false,
            congested,
        }
    }

    /// Close out the tick: compute bandwidth utilization from the bytes
    /// sent this tick, then reset the per-tick counter.
    pub fn tick(&mut self, time_step_s: f64) -> f64 {
        let max_bytes = self.max_bandwidth_kbps * 1000.0 / 8.0 * time_step_s;
        self.current_bandwidth_utilization = if max_bytes > 0.0 {
            (self.bytes_sent_this_tick as f64 / max_bytes).min(1.0)
        } else {
            0.0
        };

        if self.current_bandwidth_utilization > self.peak_bandwidth_utilization {
            self.peak_bandwidth_utilization = self.current_bandwidth_utilization;
        }

        if self.current_bandwidth_utilization >= self.congestion_threshold {
            self.congestion_events += 1;
        }

        self.utilization_history.push(self.current_bandwidth_utilization);
        self.bytes_sent_this_tick = 0;

        self.current_bandwidth_utilization
    }

    pub fn max_bandwidth_kbps(&self) -> f64 {
        self.max_bandwidth_kbps
    }

    pub fn packet_loss_rate(&self) -> f64 {
        if self.total_packets_sent == 0 {
            return 0.0;
        }
        self.total_packets_lost as f64 / self.total_packets_sent as f64
    }

    pub fn avg_utilization(&self) -> f64 {
        if self.utilization_history.is_empty() {
            return 0.0;
        }
        self.utilization_history.iter().sum::<f64>() / self.utilization_history.len() as f64
    }

    pub fn state(&self) -> NetworkState {
        NetworkState {
            net_type: self.net_type.clone(),
            bandwidth_utilization: self.current_bandwidth_utilization,
            peak_bandwidth_utilization: self.peak_bandwidth_utilization,
            total_bytes_sent: self.total_bytes_sent,
            total_packets_sent: self.total_packets_sent,
            total_packets_lost: self.total_packets_lost,
            packet_loss_rate: self.packet_loss_rate(),
            congestion_events: self.congestion_events,
        }
    }
}
