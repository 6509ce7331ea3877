//! # Battery Model
//!
//! Simulates a Li-Po battery with per-operation current draws. Remaining
//! charge floors at zero, at which point `depleted` latches and further
//! drains are no-ops. Energy consumption is broken down by operation so the
//! sum of the breakdown always equals the total consumed.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{BatteryConfig, OperationDraw};
use crate::device::Operation;

/// Window of recent drain samples used for the life estimate.
const ESTIMATE_WINDOW: usize = 60;

/// Per-operation energy consumption (mAh).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyBreakdown {
    pub sensing: f64,
    pub processing: f64,
    pub transmission: f64,
    pub idle: f64,
}

impl EnergyBreakdown {
    fn slot_mut(&mut self, op: Operation) -> &mut f64 {
        match op {
            Operation::Sensing => &mut self.sensing,
            Operation::Processing => &mut self.processing,
            Operation::Transmission => &mut self.transmission,
            Operation::Idle => &mut self.idle,
        }
    }

    pub fn total(&self) -> f64 {
        self.sensing + self.processing + self.transmission + self.idle
    }

    /// Breakdown scaled to percentages of a total.
    pub fn as_percentages(&self, total: f64) -> EnergyBreakdown {
        if total == 0.0 {
            return EnergyBreakdown::default();
        }
        EnergyBreakdown {
            sensing: self.sensing / total * 100.0,
            processing: self.processing / total * 100.0,
            transmission: self.transmission / total * 100.0,
            idle: self.idle / total * 100.0,
        }
    }
}

/// Battery state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    pub remaining_mah: f64,
    pub capacity_mah: f64,
    pub percentage: f64,
    pub total_consumed_mah: f64,
    pub depleted: bool,
    pub energy_breakdown_mah: EnergyBreakdown,
    pub energy_breakdown_pct: EnergyBreakdown,
}

/// Simulates battery drain for a constrained IoT device.
pub struct BatteryModel {
    capacity_mah: f64,
    #[allow(dead_code)]
    voltage: f64,
    draw: OperationDraw,
    /// Warning fractions, processed in descending order.
    warning_thresholds: Vec<f64>,

    remaining_mah: f64,
    total_consumed_mah: f64,
    breakdown: EnergyBreakdown,
    warnings_triggered: HashSet<OrderedFloat<f64>>,
    depleted: bool,
    drain_history: Vec<f64>,
}

impl BatteryModel {
    pub fn new(config: &BatteryConfig) -> Self {
        let mut thresholds = config.warning_thresholds.clone();
        thresholds.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            capacity_mah: config.capacity_mah,
            voltage: config.voltage,
            draw: config.current_draw_ma.clone(),
            warning_thresholds: thresholds,
            remaining_mah: config.capacity_mah,
            total_consumed_mah: 0.0,
            breakdown: EnergyBreakdown::default(),
            warnings_triggered: HashSet::new(),
            depleted: false,
            drain_history: Vec::new(),
        }
    }

    fn current_draw(&self, op: Operation) -> f64 {
        match op {
            Operation::Sensing => self.draw.sensing,
            Operation::Processing => self.draw.processing,
            Operation::Transmission => self.draw.transmission,
            Operation::Idle => self.draw.idle,
        }
    }

    /// Consume energy for one operation over `duration_s` seconds.
    /// A depleted battery absorbs nothing.
    pub fn consume(&mut self, op: Operation, duration_s: f64) {
        if self.depleted {
            return;
        }

        // mAh = mA * (seconds / 3600)
        let consumed_mah = self.current_draw(op) * (duration_s / 3600.0);

        self.remaining_mah = (self.remaining_mah - consumed_mah).max(0.0);
        self.total_consumed_mah += consumed_mah;
        *self.breakdown.slot_mut(op) += consumed_mah;

        if self.remaining_mah <= 0.0 {
            self.depleted = true;
        }
    }

    /// Advance the battery by one tick: consume each active operation for
    /// the full step, or a step of idle if none are active.
    pub fn tick(&mut self, active_operations: &[Operation], time_step_s: f64) -> f64 {
        if self.depleted {
            self.drain_history.push(self.remaining_mah);
            return self.remaining_mah;
        }

        if active_operations.is_empty() {
            self.consume(Operation::Idle, time_step_s);
        } else {
            for &op in active_operations {
                self.consume(op, time_step_s);
            }
        }

        self.drain_history.push(self.remaining_mah);
        self.remaining_mah
    }

    pub fn percentage(&self) -> f64 {
        self.remaining_mah / self.capacity_mah * 100.0
    }

    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    pub fn remaining_mah(&self) -> f64 {
        self.remaining_mah
    }

    /// Thresholds newly crossed since the last check. Each fraction fires at
    /// most once per run.
    pub fn check_warnings(&mut self) -> Vec<f64> {
        let current = self.remaining_mah / self.capacity_mah;
        let mut new_warnings = Vec::new();

        for &threshold in &self.warning_thresholds {
            if current <= threshold && self.warnings_triggered.insert(OrderedFloat(threshold)) {
                new_warnings.push(threshold);
            }
        }

        new_warnings
    }

    /// Estimate remaining life in hours from the recent drain rate.
    ///
    /// With a full estimate window the first-vs-last drop dominates, so the
    /// estimate tracks recent behavior rather than the lifetime average.
    /// With less history, fall back to the lifetime average if any energy
    /// has been consumed at all.
    pub fn estimate_remaining_hours(&self) -> f64 {
        if self.drain_history.len() < ESTIMATE_WINDOW {
            if self.total_consumed_mah > 0.0 {
                let ticks = self.drain_history.len().max(1) as f64;
                let drain_per_tick = self.total_consumed_mah / ticks;
                if drain_per_tick > 0.0 {
                    return self.remaining_mah / drain_per_tick / 3600.0;
                }
            }
            return f64::INFINITY;
        }

        let recent = &self.drain_history[self.drain_history.len() - ESTIMATE_WINDOW..];
        let drain_in_window = recent[0] - recent[recent.len() - 1];
        if drain_in_window <= 0.0 {
            return f64::INFINITY;
        }

        let drain_per_second = drain_in_window / ESTIMATE_WINDOW as f64;
        self.remaining_mah / drain_per_second / 3600.0
    }

    pub fn state(&self) -> BatteryState {
        BatteryState {
            remaining_mah: self.remaining_mah,
            capacity_mah: self.capacity_mah,
            percentage: self.percentage(),
            total_consumed_mah: self.total_consumed_mah,
            depleted: self.depleted,
            energy_breakdown_mah: self.breakdown.clone(),
            energy_breakdown_pct: self.breakdown.as_percentages(self.total_consumed_mah),
        }
    }
}
