//! Sliding-window moving-average filter for sensor noise removal.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::device::{round_to, SensorKind, SensorReading};

/// Filters sensor data using a per-channel sliding window.
pub struct DataFilter {
    window_size: usize,
    windows: HashMap<SensorKind, VecDeque<f64>>,
}

impl DataFilter {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            windows: HashMap::new(),
        }
    }

    /// Push the reading's values into their windows and return a smoothed
    /// copy. The first sample on a channel passes through unchanged; from
    /// the second on, the window mean (2 decimals) replaces the raw value.
    pub fn filter_reading(&mut self, reading: &SensorReading) -> SensorReading {
        let mut filtered = reading.clone();
        let window_size = self.window_size;

        for kind in [SensorKind::Temperature, SensorKind::Humidity, SensorKind::Light] {
            let value = match kind {
                SensorKind::Temperature => reading.temperature,
                SensorKind::Humidity => reading.humidity,
                SensorKind::Light => reading.light,
            };

            let window = self
                .windows
                .entry(kind)
                .or_insert_with(|| VecDeque::with_capacity(window_size));
            if window.len() == window_size {
                window.pop_front();
            }
            window.push_back(value);

            if window.len() >= 2 {
                let avg = window.iter().sum::<f64>() / window.len() as f64;
                let smoothed = round_to(avg, 2);
                match kind {
                    SensorKind::Temperature => filtered.temperature = smoothed,
                    SensorKind::Humidity => filtered.humidity = smoothed,
                    SensorKind::Light => filtered.light = smoothed,
                }
            }
        }

        filtered
    }

    /// σ-test against the channel's window. Needs at least 3 samples and a
    /// non-zero spread to call anything an outlier.
    pub fn is_outlier(&self, sensor: SensorKind, value: f64, sigma: f64) -> bool {
        let window = match self.windows.get(&sensor) {
            Some(w) if w.len() >= 3 => w,
            _ => return false,
        };

        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return false;
        }

        (value - mean).abs() > sigma * std_dev
    }
}
