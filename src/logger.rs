//! # Tick Logger
//!
//! Collects one record per logged tick and writes the run's log as a JSON
//! array or a flattened CSV (dotted keys, semicolon-joined list fields)
//! under the configured output directory.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::analysis::Alert;
use crate::analysis::fault_detector::tick_to_time;
use crate::config::{LogFormat, SimulationConfig};
use crate::device::{DeviceSnapshot, SensorReading};
use crate::twin::TwinState;

/// Device section of a tick record.
#[derive(Debug, Clone, Serialize)]
struct DeviceLogBlock {
    cpu_utilization: f64,
    memory_used_kb: f64,
    memory_total_kb: f64,
    battery_remaining_mah: f64,
    battery_percent: f64,
    sensors: Option<SensorReading>,
    network: NetworkLogBlock,
}

#[derive(Debug, Clone, Serialize)]
struct NetworkLogBlock {
    bytes_sent: u64,
    bandwidth_utilization: f64,
    packet_loss_rate: f64,
}

/// Twin section of a tick record.
#[derive(Debug, Clone, Serialize)]
struct TwinLogBlock {
    state_accuracy: f64,
    state_drift: f64,
    last_sync_tick: u64,
}

/// One logged tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    tick: u64,
    timestamp_s: u64,
    time: String,
    device: DeviceLogBlock,
    twin: TwinLogBlock,
    alerts: Vec<String>,
    sync_event: bool,
}

/// Logs simulation data tick-by-tick to a JSON or CSV file.
pub struct TickLogger {
    log_format: LogFormat,
    output_dir: PathBuf,
    filename_base: String,
    records: Vec<TickRecord>,
}

impl TickLogger {
    pub fn new(config: &SimulationConfig) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self {
            log_format: config.log_format,
            output_dir: config.log_output_dir.clone(),
            filename_base: format!("simulation_{timestamp}"),
            records: Vec::new(),
        }
    }

    /// Append one tick's record.
    pub fn log_tick(
        &mut self,
        tick: u64,
        device: &DeviceSnapshot,
        twin: &TwinState,
        alerts: &[Alert],
        sync_event: bool,
    ) {
        self.records.push(TickRecord {
            tick,
            timestamp_s: tick,
            time: tick_to_time(tick),
            device: DeviceLogBlock {
                cpu_utilization: device.cpu.utilization,
                memory_used_kb: device.memory.used_kb,
                memory_total_kb: device.memory.total_kb,
                battery_remaining_mah: device.battery.remaining_mah,
                battery_percent: device.battery.percentage,
                sensors: device.sensors.last_reading.clone(),
                network: NetworkLogBlock {
                    bytes_sent: device.network.total_bytes_sent,
                    bandwidth_utilization: device.network.bandwidth_utilization,
                    packet_loss_rate: device.network.packet_loss_rate,
                },
            },
            twin: TwinLogBlock {
                state_accuracy: 1.0 - twin.current_drift,
                state_drift: twin.current_drift,
                last_sync_tick: twin.last_sync_tick,
            },
            alerts: alerts.iter().map(|a| a.message.clone()).collect(),
            sync_event,
        });
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Path the log will be (or was) written to.
    pub fn filepath(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.filename_base, self.log_format.extension()))
    }

    /// Render the log in its configured format. Exposed separately from
    /// `save` so the output is comparable without touching the filesystem.
    pub fn render(&self) -> Result<String> {
        match self.log_format {
            LogFormat::Json => self.render_json(),
            LogFormat::Csv => self.render_csv(),
        }
    }

    fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.records).context("failed to encode tick log as JSON")
    }

    fn render_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut headers: Vec<String> = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            let value =
                serde_json::to_value(record).context("failed to encode tick record")?;
            let flat = flatten_record(&value);

            if i == 0 {
                headers = flat.keys().cloned().collect();
                writer
                    .write_record(&headers)
                    .context("failed to write CSV header")?;
            }

            let row: Vec<String> = headers
                .iter()
                .map(|h| flat.get(h).cloned().unwrap_or_default())
                .collect();
            writer.write_record(&row).context("failed to write CSV row")?;
        }

        let bytes = writer
            .into_inner()
            .context("failed to flush CSV writer")?;
        String::from_utf8(bytes).context("CSV output was not UTF-8")
    }

    /// Write the log file, creating the output directory if needed.
    pub fn save(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create log directory {}", self.output_dir.display())
        })?;

        let path = self.filepath();
        fs::write(&path, self.render()?)
            .with_context(|| format!("failed to write log file {}", path.display()))?;

        Ok(path)
    }
}

/// Flatten a record into dotted-key → display-string pairs. Lists join with
/// "; "; nulls become empty cells.
fn flatten_record(value: &serde_json::Value) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    flatten_into(value, String::new(), &mut flat);
    flat
}

fn flatten_into(value: &serde_json::Value, prefix: String, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, full_key, out);
            }
        }
        serde_json::Value::Array(items) => {
            let joined = items
                .iter()
                .map(display_scalar)
                .collect::<Vec<_>>()
                .join("; ");
            out.insert(prefix, joined);
        }
        other => {
            out.insert(prefix, display_scalar(other));
        }
    }
}

fn display_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
