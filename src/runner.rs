//! # Simulation Runner
//!
//! The top-level orchestrator: one single-threaded cooperative loop over
//! virtual time. Each tick advances the device, feeds new readings through
//! the edge pipeline, drives the sync engine and twin, runs fault
//! detection (with alert deduplication), and periodically updates the
//! predictor. The loop ends at the configured tick count, on battery
//! depletion, or on an externally signalled stop.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::{Alert, Component, FaultDetector, PredictiveMaintenance, Severity};
use crate::config::SimConfig;
use crate::device::SensorNode;
use crate::edge::EdgeProcessor;
use crate::logger::TickLogger;
use crate::sync::{SyncEngine, SyncStrategyKind};
use crate::twin::DigitalTwin;

/// Ticks within which a repeated `(component, severity)` alert is muted.
const ALERT_DEDUP_WINDOW: u64 = 60;

/// Predictor sampling cadence, in ticks.
const PREDICTOR_UPDATE_INTERVAL: u64 = 10;

/// Outcome of one finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub ticks_run: u64,
    /// True when the loop ended before the configured duration (battery
    /// depletion or an external stop).
    pub stopped_early: bool,
    pub log_path: PathBuf,
}

/// One complete simulation: the device, its twin, and every analytical
/// component, wired in a fixed per-tick order. The simulator exclusively
/// owns each component for the lifetime of the run.
pub struct Simulation {
    config: SimConfig,
    device: SensorNode,
    twin: DigitalTwin,
    sync_engine: SyncEngine,
    edge: EdgeProcessor,
    fault_detector: FaultDetector,
    predictive: PredictiveMaintenance,
    logger: TickLogger,

    stop: Arc<AtomicBool>,
    live_alerts: bool,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self::with_strategy(config, None)
    }

    /// Build a simulation, optionally overriding the configured sync
    /// strategy (the CLI flag path).
    pub fn with_strategy(config: SimConfig, strategy: Option<SyncStrategyKind>) -> Self {
        Self {
            device: SensorNode::new(&config),
            twin: DigitalTwin::new(),
            sync_engine: SyncEngine::new(&config.sync, strategy),
            edge: EdgeProcessor::new(&config.edge),
            fault_detector: FaultDetector::new(&config.fault_detection),
            predictive: PredictiveMaintenance::new(config.device.memory.total_ram_kb),
            logger: TickLogger::new(&config.simulation),
            stop: Arc::new(AtomicBool::new(false)),
            live_alerts: true,
            config,
        }
    }

    /// Suppress the per-tick alert stream.
    pub fn quiet(mut self) -> Self {
        self.live_alerts = false;
        self
    }

    /// Flag checked once per tick; setting it ends the run cleanly.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the simulation to completion and write the tick log.
    pub fn run(&mut self) -> Result<RunOutcome> {
        let total_ticks = self.config.simulation.total_ticks();
        let time_step_s = self.config.simulation.time_step_seconds;
        let sampling_rate = self.config.simulation.sampling_rate_seconds.max(1);
        let expected_sync_interval = self.config.sync.full_state_interval_s;

        info!(
            strategy = %self.sync_engine.kind(),
            total_ticks,
            seed = self.config.simulation.random_seed,
            "starting simulation"
        );

        let mut last_alert_ticks: HashMap<(Component, Severity), u64> = HashMap::new();
        let mut ticks_run = 0;
        let mut stopped_early = false;

        for tick in 1..=total_ticks {
            ticks_run = tick;

            // 1. Advance the device.
            let device_result = self.device.tick(time_step_s);
            let device_state = &device_result.state;

            // 2. New readings go through the edge pipeline.
            if let Some(reading) = &device_result.new_reading {
                self.edge.process(reading, device_state);
            }

            // 3. Sync decision and replication.
            let battery_pct = device_state.battery.percentage / 100.0;
            let mut sync_occurred = false;

            if self
                .sync_engine
                .should_sync(tick, device_state, battery_pct)
            {
                let prepared = self.sync_engine.prepare_payload(device_state);
                let tx_result = self.device.transmit_data(prepared.size_bytes);

                if tx_result.success {
                    self.twin.receive_sync(device_state, tick);
                    self.sync_engine.record_sync(tick, prepared.size_bytes, true);
                    sync_occurred = true;
                } else {
                    self.twin.record_sync_failure(tick);
                    self.sync_engine.record_sync(tick, prepared.size_bytes, false);
                }
            } else {
                // No sync: the twin extrapolates.
                self.twin.tick(tick);
            }

            // 4. Fault detection, deduplicated per (component, severity).
            let twin_state = self.twin.state();
            let raw_alerts = self.fault_detector.check(
                tick,
                device_state,
                Some(&twin_state),
                twin_state.last_sync_tick,
                expected_sync_interval,
                device_result.is_sensing_tick,
            );

            let mut new_alerts: Vec<Alert> = Vec::new();
            for alert in raw_alerts {
                let key = (alert.component, alert.severity);
                let muted = last_alert_ticks
                    .get(&key)
                    .is_some_and(|&last| tick - last < ALERT_DEDUP_WINDOW);
                if !muted {
                    last_alert_ticks.insert(key, tick);
                    new_alerts.push(alert);
                }
            }

            if self.live_alerts {
                for alert in &new_alerts {
                    warn!(
                        tick = alert.tick,
                        time = %alert.time,
                        severity = %alert.severity,
                        component = %alert.component,
                        "{}",
                        alert.message
                    );
                }
            }

            // 5. Predictor sampling.
            if tick % PREDICTOR_UPDATE_INTERVAL == 0 {
                self.predictive.update(tick, device_state);
            }

            // 6. Tick log.
            if tick % sampling_rate == 0 {
                self.logger
                    .log_tick(tick, device_state, &twin_state, &new_alerts, sync_occurred);
            }

            // Terminal conditions: battery depletion or external stop.
            if !self.device.is_active() {
                info!(tick, "device battery depleted — simulation stopped");
                stopped_early = true;
                break;
            }
            if self.stop.load(Ordering::Relaxed) {
                info!(tick, "stop requested — simulation stopped");
                stopped_early = true;
                break;
            }
        }

        let log_path = self.logger.save()?;
        info!(ticks_run, log = %log_path.display(), "simulation complete");

        Ok(RunOutcome {
            ticks_run,
            stopped_early,
            log_path,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn device(&self) -> &SensorNode {
        &self.device
    }

    pub fn twin(&self) -> &DigitalTwin {
        &self.twin
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync_engine
    }

    pub fn edge(&self) -> &EdgeProcessor {
        &self.edge
    }

    pub fn fault_detector(&self) -> &FaultDetector {
        &self.fault_detector
    }

    pub fn predictive(&self) -> &PredictiveMaintenance {
        &self.predictive
    }

    pub fn logger(&self) -> &TickLogger {
        &self.logger
    }
}
