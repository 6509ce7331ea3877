//! # Fault Detector
//!
//! Stateful per-run rule engine over device and twin state. Threshold rules
//! mint alerts every tick they hold (duration rules keep internal
//! counters); structural faults (leak, OOM, comm timeout, sensor fault) are
//! logged once per type for the run.

use serde::Serialize;
use strum::Display;

use crate::config::FaultDetectionConfig;
use crate::device::{DeviceSnapshot, SensorKind};
use crate::twin::TwinState;

/// Alerts the summary keeps in its trailing window.
const SUMMARY_ALERT_WINDOW: usize = 10;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
    Fault,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::Warning => "🟡",
            Severity::Fault => "⚠️",
        }
    }
}

/// Component an alert points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Component {
    Cpu,
    Memory,
    Battery,
    Network,
    Communication,
    Sensor,
    Twin,
}

/// First-occurrence fault types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    MemoryOom,
    MemoryLeak,
    CommTimeout,
    SensorTemperature,
    SensorHumidity,
    SensorLight,
}

impl FaultKind {
    fn for_sensor(sensor: SensorKind) -> Self {
        match sensor {
            SensorKind::Temperature => FaultKind::SensorTemperature,
            SensorKind::Humidity => FaultKind::SensorHumidity,
            SensorKind::Light => FaultKind::SensorLight,
        }
    }
}

/// One alert minted by the rule engine. Only `severity`, `component`, and
/// `tick` are load-bearing for downstream consumers; the message is for
/// humans.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub tick: u64,
    pub time: String,
    pub severity: Severity,
    pub component: Component,
    pub message: String,
    pub icon: &'static str,
}

/// A fault type with the tick of its first observation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FaultRecord {
    #[serde(rename = "type")]
    pub kind: FaultKind,
    pub tick: u64,
}

/// Fault detection summary.
#[derive(Debug, Clone, Serialize)]
pub struct FaultSummary {
    pub total_alerts: usize,
    pub critical_count: u64,
    pub warning_count: u64,
    pub faults_detected: Vec<FaultRecord>,
    pub last_alerts: Vec<Alert>,
}

/// Detects faults, bottlenecks, and anomalies in the device state.
pub struct FaultDetector {
    config: FaultDetectionConfig,

    cpu_high_ticks: u64,
    cpu_warning_ticks: u64,
    alerts: Vec<Alert>,
    critical_count: u64,
    warning_count: u64,
    faults_detected: Vec<FaultRecord>,
}

impl FaultDetector {
    pub fn new(config: &FaultDetectionConfig) -> Self {
        Self {
            config: config.clone(),
            cpu_high_ticks: 0,
            cpu_warning_ticks: 0,
            alerts: Vec::new(),
            critical_count: 0,
            warning_count: 0,
            faults_detected: Vec::new(),
        }
    }

    /// Run every rule for this tick; returns the alerts minted.
    pub fn check(
        &mut self,
        tick: u64,
        device: &DeviceSnapshot,
        twin: Option<&TwinState>,
        last_sync_tick: u64,
        expected_sync_interval: u64,
        is_sensing_tick: bool,
    ) -> Vec<Alert> {
        let mut new_alerts = Vec::new();

        self.check_cpu(tick, device, &mut new_alerts);
        self.check_memory(tick, device, &mut new_alerts);
        self.check_battery(tick, device, &mut new_alerts);
        self.check_network(tick, device, &mut new_alerts);
        self.check_communication(
            tick,
            last_sync_tick,
            expected_sync_interval,
            &mut new_alerts,
        );
        self.check_sensors(tick, device, is_sensing_tick, &mut new_alerts);
        self.check_twin(tick, twin, &mut new_alerts);

        self.alerts.extend(new_alerts.iter().cloned());
        new_alerts
    }

    fn check_cpu(&mut self, tick: u64, device: &DeviceSnapshot, out: &mut Vec<Alert>) {
        let util = device.cpu.utilization;

        if util > self.config.cpu_critical_threshold {
            self.cpu_high_ticks += 1;
            if self.cpu_high_ticks >= self.config.cpu_critical_duration_s {
                out.push(self.create_alert(
                    tick,
                    Severity::Critical,
                    Component::Cpu,
                    format!(
                        "CPU utilization > {:.0}% for {}s",
                        self.config.cpu_critical_threshold * 100.0,
                        self.cpu_high_ticks
                    ),
                ));
            }
        } else if util > self.config.cpu_warning_threshold {
            self.cpu_warning_ticks += 1;
            if self.cpu_warning_ticks >= self.config.cpu_warning_duration_s {
                out.push(self.create_alert(
                    tick,
                    Severity::Warning,
                    Component::Cpu,
                    format!(
                        "CPU utilization > {:.0}% for {}s",
                        self.config.cpu_warning_threshold * 100.0,
                        self.cpu_warning_ticks
                    ),
                ));
            }
        } else {
            // Back inside the normal band resets both duration counters.
            self.cpu_high_ticks = 0;
            self.cpu_warning_ticks = 0;
        }
    }

    fn check_memory(&mut self, tick: u64, device: &DeviceSnapshot, out: &mut Vec<Alert>) {
        let util = device.memory.utilization;

        if util > self.config.memory_critical_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Critical,
                Component::Memory,
                format!("Memory usage at {:.1}% — near OOM", util * 100.0),
            ));
            self.record_fault(FaultKind::MemoryOom, tick);
        } else if util > self.config.memory_warning_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Warning,
                Component::Memory,
                format!("Memory usage at {:.1}%", util * 100.0),
            ));
        }

        let leaked = device.memory.leaked_kb;
        if leaked > 1.0 && !self.has_fault(FaultKind::MemoryLeak) {
            out.push(self.create_alert(
                tick,
                Severity::Fault,
                Component::Memory,
                format!("Memory leak detected: {leaked:.1} KB leaked"),
            ));
            self.record_fault(FaultKind::MemoryLeak, tick);
        }
    }

    fn check_battery(&mut self, tick: u64, device: &DeviceSnapshot, out: &mut Vec<Alert>) {
        let pct = device.battery.percentage / 100.0;

        if pct < self.config.battery_critical_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Critical,
                Component::Battery,
                format!("Battery at {:.1}% — critically low", pct * 100.0),
            ));
        } else if pct < self.config.battery_warning_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Warning,
                Component::Battery,
                format!("Battery at {:.1}%", pct * 100.0),
            ));
        }

        if device.battery.depleted {
            out.push(self.create_alert(
                tick,
                Severity::Critical,
                Component::Battery,
                "Battery depleted — device shutdown imminent".to_string(),
            ));
        }
    }

    fn check_network(&mut self, tick: u64, device: &DeviceSnapshot, out: &mut Vec<Alert>) {
        let pkt_loss = device.network.packet_loss_rate;
        if pkt_loss > self.config.packet_loss_critical_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Critical,
                Component::Network,
                format!("Packet loss rate at {:.1}%", pkt_loss * 100.0),
            ));
        }

        let bw_util = device.network.bandwidth_utilization;
        if bw_util > self.config.bandwidth_warning_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Warning,
                Component::Network,
                format!("Bandwidth utilization at {:.1}%", bw_util * 100.0),
            ));
        }
    }

    fn check_communication(
        &mut self,
        tick: u64,
        last_sync_tick: u64,
        expected_sync_interval: u64,
        out: &mut Vec<Alert>,
    ) {
        let ticks_since_sync = tick.saturating_sub(last_sync_tick);
        let timeout =
            expected_sync_interval as f64 * self.config.communication_timeout_multiplier;
        if ticks_since_sync as f64 > timeout && last_sync_tick > 0 {
            out.push(self.create_alert(
                tick,
                Severity::Fault,
                Component::Communication,
                format!(
                    "No sync for {ticks_since_sync}s (expected every {expected_sync_interval}s)"
                ),
            ));
            self.record_fault(FaultKind::CommTimeout, tick);
        }
    }

    fn check_sensors(
        &mut self,
        tick: u64,
        device: &DeviceSnapshot,
        is_sensing_tick: bool,
        out: &mut Vec<Alert>,
    ) {
        if !is_sensing_tick {
            return;
        }
        let reading = match &device.sensors.last_reading {
            Some(r) if r.has_anomalies() => r.clone(),
            _ => return,
        };

        for &sensor in &reading.anomalies {
            out.push(self.create_alert(
                tick,
                Severity::Fault,
                Component::Sensor,
                format!("Anomaly detected on {sensor} sensor"),
            ));
            self.record_fault(FaultKind::for_sensor(sensor), tick);
        }
    }

    fn check_twin(&mut self, tick: u64, twin: Option<&TwinState>, out: &mut Vec<Alert>) {
        let drift = match twin {
            Some(t) => t.current_drift,
            None => return,
        };
        if drift > self.config.state_drift_warning_threshold {
            out.push(self.create_alert(
                tick,
                Severity::Warning,
                Component::Twin,
                format!("Digital Twin state drift at {:.1}% — twin may be out of sync", drift * 100.0),
            ));
        }
    }

    fn create_alert(
        &mut self,
        tick: u64,
        severity: Severity,
        component: Component,
        message: String,
    ) -> Alert {
        match severity {
            Severity::Critical => self.critical_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Fault => {}
        }

        Alert {
            tick,
            time: tick_to_time(tick),
            severity,
            component,
            message,
            icon: severity.icon(),
        }
    }

    fn has_fault(&self, kind: FaultKind) -> bool {
        self.faults_detected.iter().any(|f| f.kind == kind)
    }

    fn record_fault(&mut self, kind: FaultKind, tick: u64) {
        if !self.has_fault(kind) {
            self.faults_detected.push(FaultRecord { kind, tick });
        }
    }

    pub fn critical_count(&self) -> u64 {
        self.critical_count
    }

    pub fn warning_count(&self) -> u64 {
        self.warning_count
    }

    pub fn faults_detected(&self) -> &[FaultRecord] {
        &self.faults_detected
    }

    pub fn summary(&self) -> FaultSummary {
        let tail_start = self.alerts.len().saturating_sub(SUMMARY_ALERT_WINDOW);
        FaultSummary {
            total_alerts: self.alerts.len(),
            critical_count: self.critical_count,
            warning_count: self.warning_count,
            faults_detected: self.faults_detected.clone(),
            last_alerts: self.alerts[tail_start..].to_vec(),
        }
    }
}

/// Tick (in seconds) formatted as HH:MM:SS.
pub(crate) fn tick_to_time(tick: u64) -> String {
    let hours = tick / 3600;
    let minutes = (tick % 3600) / 60;
    let seconds = tick % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::device::SensorNode;

    fn detector() -> FaultDetector {
        FaultDetector::new(&FaultDetectionConfig::default())
    }

    fn snapshot() -> DeviceSnapshot {
        let mut node = SensorNode::new(&SimConfig::default());
        node.tick(1.0);
        node.full_state()
    }

    #[test]
    fn quiet_state_raises_nothing() {
        let mut det = detector();
        let state = snapshot();
        let alerts = det.check(1, &state, None, 0, 10, false);
        assert!(alerts.is_empty());
    }

    #[test]
    fn cpu_critical_needs_sustained_duration() {
        let mut det = detector();
        let mut state = snapshot();
        state.cpu.utilization = 0.99;

        for tick in 1..10 {
            let alerts = det.check(tick, &state, None, 0, 10, false);
            assert!(alerts.is_empty(), "alert before duration at tick {tick}");
        }
        let alerts = det.check(10, &state, None, 0, 10, false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].component, Component::Cpu);
    }

    #[test]
    fn cpu_counter_resets_when_calm() {
        let mut det = detector();
        let mut hot = snapshot();
        hot.cpu.utilization = 0.99;
        let calm = snapshot();

        for tick in 1..=9 {
            det.check(tick, &hot, None, 0, 10, false);
        }
        det.check(10, &calm, None, 0, 10, false);

        // Counter restarted; nine more hot ticks are not enough again.
        for tick in 11..=19 {
            let alerts = det.check(tick, &hot, None, 0, 10, false);
            assert!(alerts.is_empty());
        }
    }

    #[test]
    fn cpu_warning_band_has_its_own_duration() {
        let mut det = detector();
        let mut state = snapshot();
        state.cpu.utilization = 0.85;

        for tick in 1..30 {
            assert!(det.check(tick, &state, None, 0, 10, false).is_empty());
        }
        let alerts = det.check(30, &state, None, 0, 10, false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn memory_critical_mints_alert_and_oom_fault_once() {
        let mut det = detector();
        let mut state = snapshot();
        state.memory.utilization = 0.97;

        det.check(1, &state, None, 0, 10, false);
        det.check(2, &state, None, 0, 10, false);

        let summary = det.summary();
        assert_eq!(summary.critical_count, 2);
        let oom_faults = summary
            .faults_detected
            .iter()
            .filter(|f| f.kind == FaultKind::MemoryOom)
            .count();
        assert_eq!(oom_faults, 1);
        assert_eq!(summary.faults_detected[0].tick, 1);
    }

    #[test]
    fn memory_leak_fault_fires_once() {
        let mut det = detector();
        let mut state = snapshot();
        state.memory.leaked_kb = 2.5;

        let first = det.check(1, &state, None, 0, 10, false);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].severity, Severity::Fault);

        let second = det.check(2, &state, None, 0, 10, false);
        assert!(second.is_empty());
    }

    #[test]
    fn battery_bands_are_exclusive() {
        let mut det = detector();
        let mut state = snapshot();

        state.battery.percentage = 15.0;
        let warning = det.check(1, &state, None, 0, 10, false);
        assert_eq!(warning[0].severity, Severity::Warning);

        state.battery.percentage = 5.0;
        let critical = det.check(2, &state, None, 0, 10, false);
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].severity, Severity::Critical);
    }

    #[test]
    fn depleted_battery_is_critical() {
        let mut det = detector();
        let mut state = snapshot();
        state.battery.percentage = 0.0;
        state.battery.depleted = true;

        let alerts = det.check(1, &state, None, 0, 10, false);
        // Critically-low and depleted both fire.
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
    }

    #[test]
    fn packet_loss_and_bandwidth_rules() {
        let mut det = detector();
        let mut state = snapshot();
        state.network.packet_loss_rate = 0.25;
        state.network.bandwidth_utilization = 0.9;

        let alerts = det.check(1, &state, None, 0, 10, false);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().any(|a| a.severity == Severity::Critical));
        assert!(alerts.iter().any(|a| a.severity == Severity::Warning));
    }

    #[test]
    fn comm_timeout_needs_a_prior_sync() {
        let mut det = detector();
        let state = snapshot();

        // Never synced: silence is not a timeout.
        let alerts = det.check(100, &state, None, 0, 10, false);
        assert!(alerts.is_empty());

        // Last sync at tick 10, multiplier 3 × interval 10 → timeout past 40.
        let alerts = det.check(41, &state, None, 10, 10, false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].component, Component::Communication);

        // Fault recorded once.
        det.check(42, &state, None, 10, 10, false);
        assert_eq!(det.faults_detected().len(), 1);
    }

    #[test]
    fn sensor_anomalies_only_on_sensing_ticks() {
        let mut det = detector();
        let mut state = snapshot();
        if let Some(reading) = &mut state.sensors.last_reading {
            reading.anomalies.push(SensorKind::Temperature);
        }

        assert!(det.check(1, &state, None, 0, 10, false).is_empty());

        let alerts = det.check(2, &state, None, 0, 10, true);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].component, Component::Sensor);

        // Fault list keeps one entry per sensor name.
        det.check(3, &state, None, 0, 10, true);
        assert_eq!(det.faults_detected().len(), 1);
    }

    #[test]
    fn twin_drift_warning() {
        let mut det = detector();
        let state = snapshot();
        let mut twin = crate::twin::DigitalTwin::new().state();
        twin.current_drift = 0.2;

        let alerts = det.check(1, &state, Some(&twin), 0, 10, false);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].component, Component::Twin);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn alert_time_is_formatted() {
        assert_eq!(tick_to_time(0), "00:00:00");
        assert_eq!(tick_to_time(3661), "01:01:01");
        assert_eq!(tick_to_time(86399), "23:59:59");
    }
}
