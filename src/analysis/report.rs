//! # End-of-Run Report
//!
//! Plain-text summary printed once at the end of a simulation. Reads only
//! the components' state/stats accessors; fancier rendering (tables,
//! banners, progress bars) belongs to outer layers.

use crate::analysis::{FaultDetector, PredictiveMaintenance, WhatIfComparison};
use crate::device::SensorNode;
use crate::edge::EdgeProcessor;
use crate::sync::SyncEngine;
use crate::twin::DigitalTwin;

fn fmt_hours(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2} h")
    } else {
        "∞".to_string()
    }
}

/// Print the full simulation summary report.
#[allow(clippy::too_many_arguments)]
pub fn print_summary(
    device: &SensorNode,
    twin: &DigitalTwin,
    sync_engine: &SyncEngine,
    fault_detector: &FaultDetector,
    edge: &EdgeProcessor,
    predictive: &PredictiveMaintenance,
    duration_hours: f64,
) {
    let state = device.full_state();
    let twin_state = twin.state();
    let sync_stats = sync_engine.stats();
    let fault_summary = fault_detector.summary();
    let edge_stats = edge.stats();
    let predictions = predictive.predictions();

    println!();
    println!("=== SIMULATION SUMMARY REPORT ===");
    println!();

    println!("-- Device Status --");
    println!(
        "Simulation Duration:   {} hours ({} ticks)",
        duration_hours,
        device.tick_count()
    );
    println!("Sync Strategy:         {}", sync_stats.strategy);
    println!("Total Sensor Readings: {}", device.total_readings());
    println!("Total Syncs Performed: {}", sync_stats.total_syncs);
    println!(
        "Device Active:         {}",
        if device.is_active() { "Yes" } else { "No (depleted)" }
    );
    println!();

    println!("-- Resource Utilization --");
    println!(
        "CPU:     avg {:>5.1}%  peak {:>5.1}%  overloads {}",
        device.cpu().avg_utilization() * 100.0,
        state.cpu.peak_utilization * 100.0,
        state.cpu.overload_events
    );
    println!(
        "RAM:     avg {:>5.1}%  peak {:.0} KB  leak {}",
        device.memory().avg_utilization() * 100.0,
        state.memory.peak_usage_kb,
        if state.memory.leaked_kb > 0.5 { "Yes" } else { "No" }
    );
    println!(
        "Battery: {:.1} / {:.0} mAh remaining ({:.1}%)",
        state.battery.remaining_mah, state.battery.capacity_mah, state.battery.percentage
    );
    println!(
        "Network: avg {:>5.1}% BW  {:.1} KB sent  loss {:.1}%",
        device.network().avg_utilization() * 100.0,
        state.network.total_bytes_sent as f64 / 1024.0,
        state.network.packet_loss_rate * 100.0
    );
    println!();

    println!("-- Energy Breakdown --");
    let breakdown = &state.battery.energy_breakdown_mah;
    let pct = &state.battery.energy_breakdown_pct;
    println!(
        "sensing {:.3} mAh ({:.1}%)  processing {:.3} mAh ({:.1}%)",
        breakdown.sensing, pct.sensing, breakdown.processing, pct.processing
    );
    println!(
        "transmission {:.3} mAh ({:.1}%)  idle {:.3} mAh ({:.1}%)",
        breakdown.transmission, pct.transmission, breakdown.idle, pct.idle
    );
    println!();

    println!("-- Digital Twin --");
    println!(
        "Avg Accuracy: {:.2}%  Current Drift: {:.2}%  Max Drift: {:.2}%",
        twin_state.avg_accuracy * 100.0,
        twin_state.current_drift * 100.0,
        twin_state.max_drift * 100.0
    );
    println!(
        "Syncs: {} (success rate {:.1}%)  Avg Payload: {:.0} bytes  Total: {} bytes",
        twin_state.total_syncs,
        twin_state.sync_success_rate * 100.0,
        sync_stats.avg_payload_bytes,
        sync_stats.total_bytes_synced
    );
    println!();

    if edge_stats.enabled {
        println!("-- Edge Processing --");
        println!(
            "Processed: {}  Filtered: {} ({:.1}%)  Anomalies fast-tracked: {}",
            edge_stats.total_processed,
            edge_stats.total_filtered,
            edge_stats.data_reduction_ratio * 100.0,
            edge_stats.anomalies_fast_tracked
        );
        println!(
            "Compression saved {} bytes",
            edge_stats.bytes_saved_by_compression
        );
        println!();
    }

    println!("-- Fault Detection --");
    println!(
        "Alerts: {} total ({} critical, {} warning)",
        fault_summary.total_alerts, fault_summary.critical_count, fault_summary.warning_count
    );
    if fault_summary.faults_detected.is_empty() {
        println!("Faults: none");
    } else {
        for fault in &fault_summary.faults_detected {
            println!("Fault: {:?} first seen at tick {}", fault.kind, fault.tick);
        }
    }
    if !fault_summary.last_alerts.is_empty() {
        println!("Recent alerts:");
        for alert in &fault_summary.last_alerts {
            println!(
                "  {} {} {:<13} {}",
                alert.time, alert.icon, alert.component, alert.message
            );
        }
    }
    println!();

    println!("-- Predictive Maintenance --");
    println!(
        "Battery depletion ETA: {} (confidence {:?}, drain {:.2} mAh/h)",
        fmt_hours(predictions.battery_depletion.eta_hours),
        predictions.battery_depletion.confidence,
        predictions.battery_depletion.rate_per_hour
    );
    println!(
        "Memory exhaustion ETA: {} (confidence {:?}, growth {:.2} KB/h)",
        fmt_hours(predictions.memory_exhaustion.eta_hours),
        predictions.memory_exhaustion.confidence,
        predictions.memory_exhaustion.rate_per_hour
    );
    match predictions.maintenance.maintenance_in_hours {
        Some(hours) => println!("Maintenance recommended in {hours:.2} hours"),
        None => println!("No maintenance window required"),
    }
    println!();
}

/// Print the what-if comparison table and its insights.
pub fn print_whatif_comparison(comparison: &WhatIfComparison) {
    println!();
    println!("=== WHAT-IF COMPARISON ===");
    for row in &comparison.comparisons {
        let change = match row.change_pct {
            Some(pct) => format!("{} {:+.1}%", row.direction, pct),
            None => row.direction.to_string(),
        };
        println!(
            "{:<32} base {:>14}  what-if {:>14}  {}",
            row.label,
            row.base.to_string(),
            row.whatif.to_string(),
            change
        );
    }
    println!();
    println!("Insights:");
    for insight in &comparison.insights {
        println!("  - {insight}");
    }
    println!();
}
