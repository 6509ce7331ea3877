//! # What-If Analysis
//!
//! Compares a base scenario against a modified configuration over a fixed
//! set of metrics, reporting absolute values, relative change, and
//! human-readable insights.

use serde::Serialize;
use std::fmt;

use crate::analysis::FaultDetector;
use crate::analysis::PredictiveMaintenance;
use crate::device::SensorNode;
use crate::edge::EdgeProcessor;
use crate::sync::{SyncEngine, SyncStrategyKind};
use crate::twin::DigitalTwin;

/// The fixed comparison surface extracted from one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResults {
    pub sync_strategy: SyncStrategyKind,
    pub total_syncs: u64,
    pub total_energy_consumed_mah: f64,
    pub battery_remaining_pct: f64,
    pub estimated_battery_life_hours: f64,
    pub total_bandwidth_bytes: u64,
    pub twin_avg_accuracy_pct: f64,
    pub faults_detected: usize,
    pub critical_alerts: u64,
    pub warning_alerts: u64,
    pub avg_sync_payload_bytes: f64,
    pub data_packets_sent: u64,
    pub edge_bytes_saved: u64,
}

impl ScenarioResults {
    /// Pull the comparison metrics out of the finished components.
    pub fn extract(
        device: &SensorNode,
        twin: &DigitalTwin,
        sync_engine: &SyncEngine,
        fault_detector: &FaultDetector,
        edge: &EdgeProcessor,
        predictive: &PredictiveMaintenance,
    ) -> Self {
        let device_state = device.full_state();
        let sync_stats = sync_engine.stats();
        let battery_prediction = predictive.predict_battery_depletion();

        Self {
            sync_strategy: sync_stats.strategy,
            total_syncs: sync_stats.total_syncs,
            total_energy_consumed_mah: device_state.battery.total_consumed_mah,
            battery_remaining_pct: device_state.battery.percentage,
            estimated_battery_life_hours: battery_prediction.eta_hours,
            total_bandwidth_bytes: sync_stats.total_bytes_synced,
            twin_avg_accuracy_pct: twin.avg_accuracy() * 100.0,
            faults_detected: fault_detector.faults_detected().len(),
            critical_alerts: fault_detector.critical_count(),
            warning_alerts: fault_detector.warning_count(),
            avg_sync_payload_bytes: sync_stats.avg_payload_bytes,
            data_packets_sent: device_state.network.total_packets_sent,
            edge_bytes_saved: edge.bytes_saved(),
        }
    }
}

/// Value of one compared metric.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Text(s) => write!(f, "{s}"),
            MetricValue::Number(n) if n.is_infinite() => write!(f, "∞"),
            MetricValue::Number(n) => write!(f, "{n:.2}"),
        }
    }
}

/// One row of the comparison table.
#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    pub key: &'static str,
    pub label: &'static str,
    pub base: MetricValue,
    pub whatif: MetricValue,
    /// Relative change `(w − b)/|b| · 100`, reported as exactly 0 when the
    /// base is 0; absent only for text metrics and non-finite values.
    pub change_pct: Option<f64>,
    pub direction: &'static str,
}

/// Full comparison: per-metric rows plus derived insights.
#[derive(Debug, Clone, Serialize)]
pub struct WhatIfComparison {
    pub comparisons: Vec<MetricComparison>,
    pub insights: Vec<String>,
}

/// Compare base and what-if scenario results.
pub fn compare(base: &ScenarioResults, whatif: &ScenarioResults) -> WhatIfComparison {
    let mut comparisons = Vec::new();

    comparisons.push(text_row(
        "sync_strategy",
        "Sync Strategy",
        base.sync_strategy.to_string(),
        whatif.sync_strategy.to_string(),
    ));
    comparisons.push(numeric_row(
        "total_syncs",
        "Total Syncs Performed",
        base.total_syncs as f64,
        whatif.total_syncs as f64,
    ));
    comparisons.push(numeric_row(
        "total_energy_consumed_mah",
        "Total Energy Consumed (mAh)",
        base.total_energy_consumed_mah,
        whatif.total_energy_consumed_mah,
    ));
    comparisons.push(numeric_row(
        "battery_remaining_pct",
        "Battery Remaining (%)",
        base.battery_remaining_pct,
        whatif.battery_remaining_pct,
    ));
    comparisons.push(numeric_row(
        "estimated_battery_life_hours",
        "Estimated Battery Life (hours)",
        base.estimated_battery_life_hours,
        whatif.estimated_battery_life_hours,
    ));
    comparisons.push(numeric_row(
        "total_bandwidth_bytes",
        "Total Bandwidth Used (bytes)",
        base.total_bandwidth_bytes as f64,
        whatif.total_bandwidth_bytes as f64,
    ));
    comparisons.push(numeric_row(
        "twin_avg_accuracy_pct",
        "Twin Avg Accuracy (%)",
        base.twin_avg_accuracy_pct,
        whatif.twin_avg_accuracy_pct,
    ));
    comparisons.push(text_row(
        "faults_detected",
        "Faults Detected",
        base.faults_detected.to_string(),
        whatif.faults_detected.to_string(),
    ));
    comparisons.push(numeric_row(
        "critical_alerts",
        "Critical Alerts",
        base.critical_alerts as f64,
        whatif.critical_alerts as f64,
    ));
    comparisons.push(numeric_row(
        "warning_alerts",
        "Warning Alerts",
        base.warning_alerts as f64,
        whatif.warning_alerts as f64,
    ));
    comparisons.push(numeric_row(
        "avg_sync_payload_bytes",
        "Avg Sync Payload (bytes)",
        base.avg_sync_payload_bytes,
        whatif.avg_sync_payload_bytes,
    ));
    comparisons.push(numeric_row(
        "data_packets_sent",
        "Data Packets Sent",
        base.data_packets_sent as f64,
        whatif.data_packets_sent as f64,
    ));
    comparisons.push(numeric_row(
        "edge_bytes_saved",
        "Edge Bytes Saved",
        base.edge_bytes_saved as f64,
        whatif.edge_bytes_saved as f64,
    ));

    let insights = generate_insights(&comparisons);

    WhatIfComparison {
        comparisons,
        insights,
    }
}

fn text_row(key: &'static str, label: &'static str, base: String, whatif: String) -> MetricComparison {
    MetricComparison {
        key,
        label,
        base: MetricValue::Text(base),
        whatif: MetricValue::Text(whatif),
        change_pct: None,
        direction: "─",
    }
}

fn numeric_row(key: &'static str, label: &'static str, base: f64, whatif: f64) -> MetricComparison {
    let change_pct = if !base.is_finite() || !whatif.is_finite() {
        None
    } else if base == 0.0 {
        Some(0.0)
    } else {
        Some((whatif - base) / base.abs() * 100.0)
    };

    let direction = match change_pct {
        Some(pct) if pct > 0.0 => "↑",
        Some(pct) if pct < 0.0 => "↓",
        _ => "─",
    };

    MetricComparison {
        key,
        label,
        base: MetricValue::Number(base),
        whatif: MetricValue::Number(whatif),
        change_pct,
        direction,
    }
}

fn find_change(comparisons: &[MetricComparison], key: &str) -> Option<f64> {
    comparisons
        .iter()
        .find(|c| c.key == key)
        .and_then(|c| c.change_pct)
}

fn generate_insights(comparisons: &[MetricComparison]) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(pct) = find_change(comparisons, "total_energy_consumed_mah") {
        if pct < -10.0 {
            insights.push(format!("Energy savings of {:.1}%", pct.abs()));
        }
    }

    if let Some(pct) = find_change(comparisons, "total_bandwidth_bytes") {
        if pct < -10.0 {
            insights.push(format!("Bandwidth reduced by {:.1}%", pct.abs()));
        }
    }

    if let Some(pct) = find_change(comparisons, "twin_avg_accuracy_pct") {
        if pct < -2.0 {
            insights.push(format!(
                "Twin accuracy decreased by {:.1}% — trade-off for the savings",
                pct.abs()
            ));
        }
    }

    if let Some(pct) = find_change(comparisons, "estimated_battery_life_hours") {
        if pct > 10.0 {
            insights.push(format!("Battery life extended by {pct:.1}%"));
        }
    }

    if insights.is_empty() {
        insights.push("No significant differences detected between configurations.".to_string());
    }

    insights
}
