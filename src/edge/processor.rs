//! # Edge Processor
//!
//! Orchestrates the edge pipeline for each new reading:
//! filter → prioritize → estimate compressed size.

use serde::Serialize;

use crate::config::EdgeConfig;
use crate::device::{DeviceSnapshot, SensorKind, SensorReading};
use crate::edge::{DataCompressor, DataFilter, Priority, PriorityDataQueue};
use crate::encoded_len;

/// CPU/memory utilization above which a reading is fast-tracked.
const CRITICAL_RESOURCE_UTILIZATION: f64 = 0.95;

/// Battery percentage below which a reading is fast-tracked.
const CRITICAL_BATTERY_PCT: f64 = 5.0;

/// Result of running one reading through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedReading {
    pub data: SensorReading,
    pub priority: Priority,
    pub compressed: bool,
    pub filtered: bool,
    pub original_bytes: usize,
    pub processed_bytes: usize,
    pub has_anomaly: bool,
}

/// Edge processing statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeStats {
    pub enabled: bool,
    pub total_processed: u64,
    pub total_filtered: u64,
    pub data_reduction_ratio: f64,
    pub bytes_saved_by_compression: u64,
    pub anomalies_fast_tracked: u64,
}

/// Orchestrates edge computing operations on device data.
pub struct EdgeProcessor {
    enabled: bool,
    compression_enabled: bool,
    #[allow(dead_code)]
    anomaly_immediate_sync: bool,

    data_filter: DataFilter,
    compressor: DataCompressor,
    priority_queue: PriorityDataQueue,

    total_processed: u64,
    total_filtered: u64,
    total_compressed_bytes_saved: u64,
    anomalies_fast_tracked: u64,
}

impl EdgeProcessor {
    pub fn new(config: &EdgeConfig) -> Self {
        Self {
            enabled: config.enabled,
            compression_enabled: config.compression_enabled,
            anomaly_immediate_sync: config.anomaly_immediate_sync,
            data_filter: DataFilter::new(config.filter_window_size),
            compressor: DataCompressor::new(config.compression_ratio),
            priority_queue: PriorityDataQueue::new(),
            total_processed: 0,
            total_filtered: 0,
            total_compressed_bytes_saved: 0,
            anomalies_fast_tracked: 0,
        }
    }

    /// Run a sensor reading through the pipeline. When the layer is
    /// disabled, the reading passes through untouched and unaccounted.
    pub fn process(
        &mut self,
        sensor_reading: &SensorReading,
        device_state: &DeviceSnapshot,
    ) -> ProcessedReading {
        if !self.enabled {
            return ProcessedReading {
                data: sensor_reading.clone(),
                priority: Priority::Normal,
                compressed: false,
                filtered: false,
                original_bytes: 0,
                processed_bytes: 0,
                has_anomaly: false,
            };
        }

        self.total_processed += 1;

        // Step 1: smooth the noise.
        let filtered_reading = self.data_filter.filter_reading(sensor_reading);
        let is_filtered = filtered_reading != *sensor_reading;
        if is_filtered {
            self.total_filtered += 1;
        }

        // Step 2: pick the lane.
        let has_anomaly = sensor_reading.has_anomalies();
        let has_critical_resource = Self::check_critical_resources(device_state);

        let priority = if has_anomaly || has_critical_resource {
            if has_anomaly {
                self.anomalies_fast_tracked += 1;
            }
            Priority::Critical
        } else {
            Priority::Normal
        };

        self.priority_queue.enqueue(filtered_reading.clone(), priority);

        // Step 3: estimate what compression would buy.
        let original_bytes = encoded_len(sensor_reading);
        let mut processed_bytes = original_bytes;

        if self.compression_enabled {
            processed_bytes = self.compressor.estimate_compressed_size(original_bytes);
            self.total_compressed_bytes_saved += (original_bytes - processed_bytes) as u64;
        }

        ProcessedReading {
            data: filtered_reading,
            priority,
            compressed: self.compression_enabled,
            filtered: is_filtered,
            original_bytes,
            processed_bytes,
            has_anomaly,
        }
    }

    fn check_critical_resources(state: &DeviceSnapshot) -> bool {
        state.cpu.utilization > CRITICAL_RESOURCE_UTILIZATION
            || state.memory.utilization > CRITICAL_RESOURCE_UTILIZATION
            || state.battery.percentage < CRITICAL_BATTERY_PCT
    }

    /// Outlier test delegated to the filter's windows.
    pub fn is_outlier(&self, sensor: SensorKind, value: f64, sigma: f64) -> bool {
        self.data_filter.is_outlier(sensor, value, sigma)
    }

    /// Share of processed readings that the filter actually changed.
    pub fn data_reduction_ratio(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.total_filtered as f64 / self.total_processed as f64
    }

    pub fn queue(&mut self) -> &mut PriorityDataQueue {
        &mut self.priority_queue
    }

    pub fn compressor(&self) -> &DataCompressor {
        &self.compressor
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_compressed_bytes_saved
    }

    pub fn stats(&self) -> EdgeStats {
        EdgeStats {
            enabled: self.enabled,
            total_processed: self.total_processed,
            total_filtered: self.total_filtered,
            data_reduction_ratio: self.data_reduction_ratio(),
            bytes_saved_by_compression: self.total_compressed_bytes_saved,
            anomalies_fast_tracked: self.anomalies_fast_tracked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::device::SensorNode;

    fn snapshot() -> DeviceSnapshot {
        let mut node = SensorNode::new(&SimConfig::default());
        node.tick(1.0);
        node.full_state()
    }

    fn reading(t: f64, anomalies: Vec<SensorKind>) -> SensorReading {
        SensorReading {
            temperature: t,
            humidity: 50.0,
            light: 100.0,
            anomalies,
        }
    }

    fn processor() -> EdgeProcessor {
        EdgeProcessor::new(&EdgeConfig::default())
    }

    #[test]
    fn normal_reading_takes_normal_lane() {
        let mut edge = processor();
        let state = snapshot();

        let out = edge.process(&reading(20.0, vec![]), &state);
        assert_eq!(out.priority, Priority::Normal);
        assert!(!out.has_anomaly);
    }

    #[test]
    fn anomalous_reading_is_fast_tracked() {
        let mut edge = processor();
        let state = snapshot();

        let out = edge.process(&reading(90.0, vec![SensorKind::Temperature]), &state);
        assert_eq!(out.priority, Priority::Critical);
        assert!(out.has_anomaly);
        assert_eq!(edge.stats().anomalies_fast_tracked, 1);
        assert!(edge.queue().has_critical());
    }

    #[test]
    fn critical_battery_forces_critical_lane() {
        let mut edge = processor();
        let mut state = snapshot();
        state.battery.percentage = 3.0;

        let out = edge.process(&reading(20.0, vec![]), &state);
        assert_eq!(out.priority, Priority::Critical);
        // Not an anomaly, so the fast-track counter stays put.
        assert_eq!(edge.stats().anomalies_fast_tracked, 0);
    }

    #[test]
    fn compression_savings_accumulate() {
        let mut edge = processor();
        let state = snapshot();

        let out = edge.process(&reading(20.0, vec![]), &state);
        assert!(out.original_bytes > 0);
        assert!(out.processed_bytes < out.original_bytes);
        assert_eq!(
            edge.bytes_saved(),
            (out.original_bytes - out.processed_bytes) as u64
        );
    }

    #[test]
    fn second_reading_gets_filtered() {
        let mut edge = processor();
        let state = snapshot();

        edge.process(&reading(20.0, vec![]), &state);
        let out = edge.process(&reading(30.0, vec![]), &state);
        assert!(out.filtered);
        assert_eq!(out.data.temperature, 25.0);
        assert_eq!(edge.stats().total_filtered, 1);
    }

    #[test]
    fn disabled_layer_passes_through() {
        let mut config = EdgeConfig::default();
        config.enabled = false;
        let mut edge = EdgeProcessor::new(&config);
        let state = snapshot();

        let out = edge.process(&reading(20.0, vec![]), &state);
        assert!(!out.filtered);
        assert!(!out.compressed);
        assert_eq!(out.original_bytes, 0);
        assert_eq!(edge.stats().total_processed, 0);
    }

    #[test]
    fn reduction_ratio_counts_changed_readings() {
        let mut edge = processor();
        let state = snapshot();

        edge.process(&reading(20.0, vec![]), &state);
        edge.process(&reading(30.0, vec![]), &state);
        edge.process(&reading(25.0, vec![]), &state);

        let stats = edge.stats();
        assert_eq!(stats.total_processed, 3);
        assert!(stats.data_reduction_ratio > 0.0);
    }
}
