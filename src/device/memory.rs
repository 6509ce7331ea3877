//! # Memory Model
//!
//! Simulates a fixed-size RAM pool: firmware base usage, per-reading sensor
//! buffers, and an optional slow leak. Usage clamps at the pool size; every
//! tick spent at capacity counts as an OOM event.

use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;

/// Memory state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub used_kb: f64,
    pub total_kb: f64,
    pub utilization: f64,
    pub buffer_count: u32,
    pub leaked_kb: f64,
    pub peak_usage_kb: f64,
    pub oom_events: u64,
}

/// Simulates RAM allocation and deallocation for a constrained device.
pub struct MemoryModel {
    total_ram_kb: f64,
    base_usage_kb: f64,
    per_reading_buffer_kb: f64,
    max_buffer_readings: u32,
    leak_enabled: bool,
    leak_rate_kb_per_minute: f64,

    current_usage_kb: f64,
    buffer_count: u32,
    leaked_kb: f64,
    peak_usage_kb: f64,
    oom_events: u64,
    usage_history: Vec<f64>,
}

impl MemoryModel {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            total_ram_kb: config.total_ram_kb,
            base_usage_kb: config.base_usage_kb,
            per_reading_buffer_kb: config.per_reading_buffer_kb,
            max_buffer_readings: config.max_buffer_readings,
            leak_enabled: config.leak_enabled,
            leak_rate_kb_per_minute: config.leak_rate_kb_per_minute,
            current_usage_kb: config.base_usage_kb,
            buffer_count: 0,
            leaked_kb: 0.0,
            peak_usage_kb: config.base_usage_kb,
            oom_events: 0,
            usage_history: Vec::new(),
        }
    }

    /// Allocate one sensor reading buffer, up to the configured cap.
    pub fn allocate_sensor_buffer(&mut self) {
        if self.buffer_count < self.max_buffer_readings {
            self.buffer_count += 1;
            self.update_usage();
        }
    }

    /// Free up to `count` buffers; `None` frees them all.
    pub fn free_sensor_buffers(&mut self, count: Option<u32>) {
        let count = count.unwrap_or(self.buffer_count);
        self.buffer_count = self.buffer_count.saturating_sub(count);
        self.update_usage();
    }

    /// Advance by one tick; applies the leak if enabled.
    pub fn tick(&mut self, time_step_s: f64) -> f64 {
        if self.leak_enabled && self.leak_rate_kb_per_minute > 0.0 {
            self.leaked_kb += self.leak_rate_kb_per_minute * (time_step_s / 60.0);
        }

        self.update_usage();
        self.usage_history.push(self.current_usage_kb);

        self.current_usage_kb
    }

    fn update_usage(&mut self) {
        let buffer_usage = self.buffer_count as f64 * self.per_reading_buffer_kb;
        self.current_usage_kb = self.base_usage_kb + buffer_usage + self.leaked_kb;

        if self.current_usage_kb >= self.total_ram_kb {
            self.current_usage_kb = self.total_ram_kb;
            self.oom_events += 1;
        }

        if self.current_usage_kb > self.peak_usage_kb {
            self.peak_usage_kb = self.current_usage_kb;
        }
    }

    pub fn utilization(&self) -> f64 {
        self.current_usage_kb / self.total_ram_kb
    }

    pub fn available_kb(&self) -> f64 {
        (self.total_ram_kb - self.current_usage_kb).max(0.0)
    }

    pub fn avg_utilization(&self) -> f64 {
        if self.usage_history.is_empty() {
            return 0.0;
        }
        let avg = self.usage_history.iter().sum::<f64>() / self.usage_history.len() as f64;
        avg / self.total_ram_kb
    }

    /// Leak heuristic: true when, over the trailing window, more than 85% of
    /// step-to-step transitions are strictly increasing.
    pub fn is_leak_detected(&self, window_size: usize) -> bool {
        if self.usage_history.len() < window_size {
            return false;
        }
        let window = &self.usage_history[self.usage_history.len() - window_size..];
        let increases = window.windows(2).filter(|w| w[1] > w[0]).count();
        increases as f64 / (window.len() - 1) as f64 > 0.85
    }

    pub fn state(&self) -> MemoryState {
        MemoryState {
            used_kb: self.current_usage_kb,
            total_kb: self.total_ram_kb,
            utilization: self.utilization(),
            buffer_count: self.buffer_count,
            leaked_kb: self.leaked_kb,
            peak_usage_kb: self.peak_usage_kb,
            oom_events: self.oom_events,
        }
    }
}
