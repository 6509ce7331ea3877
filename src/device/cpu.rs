//! # CPU Model
//!
//! Simulates processor utilization for a constrained embedded processor
//! (Cortex-M4 class). Tasks scheduled within a tick consume cycles; the
//! resulting utilization gets Gaussian jitter and is clamped to [0, 1].

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::config::{ProcessorConfig, TaskCosts};
use crate::device::Operation;

/// Jitter standard deviation applied to each tick's utilization.
const JITTER_STD_DEV: f64 = 0.02;

/// Utilization above this counts as an overload event.
const OVERLOAD_THRESHOLD: f64 = 0.95;

/// Utilization above this accrues consecutive-overload ticks.
const SUSTAINED_THRESHOLD: f64 = 0.90;

/// CPU state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuState {
    pub utilization: f64,
    pub cycles_used: u64,
    pub peak_utilization: f64,
    pub overload_events: u64,
    pub consecutive_overload_ticks: u64,
}

/// Simulates CPU utilization from a per-tick task queue.
pub struct CpuModel {
    max_cycles_per_sec: f64,
    costs: TaskCosts,

    current_utilization: f64,
    cycles_used_this_tick: u64,
    task_queue: Vec<(Operation, u64)>,
    total_cycles_used: u64,
    peak_utilization: f64,
    overload_events: u64,
    consecutive_overload_ticks: u64,
    utilization_history: Vec<f64>,
}

impl CpuModel {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            max_cycles_per_sec: config.clock_mhz * 1_000_000.0,
            costs: config.task_costs.clone(),
            current_utilization: 0.0,
            cycles_used_this_tick: 0,
            task_queue: Vec::new(),
            total_cycles_used: 0,
            peak_utilization: 0.0,
            overload_events: 0,
            consecutive_overload_ticks: 0,
            utilization_history: Vec::new(),
        }
    }

    /// Queue a task for this tick.
    pub fn schedule_task(&mut self, op: Operation) {
        let cost = self.task_cost(op);
        self.task_queue.push((op, cost));
    }

    fn task_cost(&self, op: Operation) -> u64 {
        match op {
            Operation::Sensing => self.costs.sensing_cycles,
            Operation::Processing => self.costs.processing_cycles,
            Operation::Transmission => self.costs.transmission_cycles,
            Operation::Idle => self.costs.idle_cycles,
        }
    }

    /// Drain the task queue and update utilization for this tick.
    pub fn tick(&mut self, time_step_s: f64, rng: &mut StdRng) -> f64 {
        self.cycles_used_this_tick = self.task_queue.iter().map(|(_, cost)| cost).sum();

        let available_cycles = self.max_cycles_per_sec * time_step_s;
        self.current_utilization = if available_cycles > 0.0 {
            (self.cycles_used_this_tick as f64 / available_cycles).min(1.0)
        } else {
            0.0
        };

        let jitter: f64 = JITTER_STD_DEV * rng.sample::<f64, _>(StandardNormal);
        self.current_utilization = (self.current_utilization + jitter).clamp(0.0, 1.0);

        self.total_cycles_used += self.cycles_used_this_tick;
        if self.current_utilization > self.peak_utilization {
            self.peak_utilization = self.current_utilization;
        }

        if self.current_utilization > SUSTAINED_THRESHOLD {
            self.consecutive_overload_ticks += 1;
        } else {
            self.consecutive_overload_ticks = 0;
        }

        if self.current_utilization > OVERLOAD_THRESHOLD {
            self.overload_events += 1;
        }

        self.utilization_history.push(self.current_utilization);
        self.task_queue.clear();

        self.current_utilization
    }

    pub fn utilization(&self) -> f64 {
        self.current_utilization
    }

    pub fn avg_utilization(&self) -> f64 {
        if self.utilization_history.is_empty() {
            return 0.0;
        }
        self.utilization_history.iter().sum::<f64>() / self.utilization_history.len() as f64
    }

    pub fn history_len(&self) -> usize {
        self.utilization_history.len()
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            utilization: self.current_utilization,
            cycles_used: self.cycles_used_this_tick,
            peak_utilization: self.peak_utilization,
            overload_events: self.overload_events,
            consecutive_overload_ticks: self.consecutive_overload_ticks,
        }
    }
}
