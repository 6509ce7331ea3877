//! # Predictive Maintenance
//!
//! Predicts resource exhaustion by fitting an ordinary least-squares line
//! over recent battery and memory history. Confidence comes from the fit's
//! coefficient of determination; degenerate fits fall back to conservative
//! defaults (R² = 0, ETA = ∞).

use serde::Serialize;
use std::collections::VecDeque;

use crate::device::DeviceSnapshot;

/// Samples used for each regression fit.
const PREDICTION_WINDOW: usize = 300;

/// Minimum samples before any prediction is attempted.
const MIN_SAMPLES: usize = 60;

/// Recommend maintenance at this fraction of the earliest time-to-failure.
const MAINTENANCE_LEAD_FACTOR: f64 = 0.7;

/// Prediction confidence, classified from R².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn classify(r_squared: f64, high: f64, medium: f64) -> Self {
        if r_squared > high {
            Confidence::High
        } else if r_squared > medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// One exhaustion prediction.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Virtual hours until the crossing; infinite when no trend exists.
    pub eta_hours: f64,
    pub eta_ticks: f64,
    pub confidence: Confidence,
    /// Resource movement per hour (drain for battery, growth for memory).
    pub rate_per_hour: f64,
    pub r_squared: f64,
}

impl Prediction {
    fn none() -> Self {
        Self {
            eta_hours: f64::INFINITY,
            eta_ticks: f64::INFINITY,
            confidence: Confidence::Low,
            rate_per_hour: 0.0,
            r_squared: 0.0,
        }
    }
}

/// Maintenance window recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceRecommendation {
    pub recommended: bool,
    pub maintenance_in_hours: Option<f64>,
    pub battery_eta_hours: f64,
    pub memory_eta_hours: f64,
}

/// All predictions bundled for the report.
#[derive(Debug, Clone, Serialize)]
pub struct Predictions {
    pub battery_depletion: Prediction,
    pub memory_exhaustion: Prediction,
    pub maintenance: MaintenanceRecommendation,
}

/// Predicts resource exhaustion times using trend analysis.
pub struct PredictiveMaintenance {
    total_ram_kb: f64,
    battery_history: VecDeque<(u64, f64)>,
    memory_history: VecDeque<(u64, f64)>,
}

impl PredictiveMaintenance {
    pub fn new(total_ram_kb: f64) -> Self {
        Self {
            total_ram_kb,
            battery_history: VecDeque::new(),
            memory_history: VecDeque::new(),
        }
    }

    /// Feed a device snapshot into the rolling buffers. Buffers are trimmed
    /// to twice the regression window; they never grow unbounded.
    pub fn update(&mut self, tick: u64, state: &DeviceSnapshot) {
        self.battery_history
            .push_back((tick, state.battery.remaining_mah));
        self.memory_history.push_back((tick, state.memory.used_kb));

        let max_history = PREDICTION_WINDOW * 2;
        while self.battery_history.len() > max_history {
            self.battery_history.pop_front();
        }
        while self.memory_history.len() > max_history {
            self.memory_history.pop_front();
        }
    }

    /// Predict when the battery reaches zero.
    pub fn predict_battery_depletion(&self) -> Prediction {
        let window = match Self::trailing_window(&self.battery_history) {
            Some(w) => w,
            None => return Prediction::none(),
        };

        let fit = match linear_fit(&window) {
            Some(f) => f,
            None => return Prediction::none(),
        };

        // A non-negative slope means no drain to extrapolate.
        if fit.slope >= 0.0 {
            return Prediction::none();
        }

        let crossing_tick = -fit.intercept / fit.slope;
        let last_tick = window[window.len() - 1].0 as f64;
        let eta_ticks = (crossing_tick - last_tick).max(0.0);

        Prediction {
            eta_hours: eta_ticks / 3600.0,
            eta_ticks,
            confidence: Confidence::classify(fit.r_squared, 0.95, 0.80),
            rate_per_hour: fit.slope.abs() * 3600.0,
            r_squared: fit.r_squared,
        }
    }

    /// Predict when memory usage reaches the pool size.
    pub fn predict_memory_exhaustion(&self) -> Prediction {
        let window = match Self::trailing_window(&self.memory_history) {
            Some(w) => w,
            None => return Prediction::none(),
        };

        let fit = match linear_fit(&window) {
            Some(f) => f,
            None => return Prediction::none(),
        };

        // Memory must be growing for exhaustion to exist.
        if fit.slope <= 0.0 {
            return Prediction::none();
        }

        let crossing_tick = (self.total_ram_kb - fit.intercept) / fit.slope;
        let last_tick = window[window.len() - 1].0 as f64;
        let eta_ticks = (crossing_tick - last_tick).max(0.0);

        Prediction {
            eta_hours: eta_ticks / 3600.0,
            eta_ticks,
            confidence: Confidence::classify(fit.r_squared, 0.90, 0.70),
            rate_per_hour: fit.slope * 3600.0,
            r_squared: fit.r_squared,
        }
    }

    /// Recommend maintenance at 70% of the time to the earliest predicted
    /// failure; nothing to recommend when every ETA is infinite.
    pub fn maintenance_recommendation(&self) -> MaintenanceRecommendation {
        let battery = self.predict_battery_depletion();
        let memory = self.predict_memory_exhaustion();

        let earliest = battery.eta_hours.min(memory.eta_hours);

        if !earliest.is_finite() {
            return MaintenanceRecommendation {
                recommended: false,
                maintenance_in_hours: None,
                battery_eta_hours: battery.eta_hours,
                memory_eta_hours: memory.eta_hours,
            };
        }

        MaintenanceRecommendation {
            recommended: true,
            maintenance_in_hours: Some(earliest * MAINTENANCE_LEAD_FACTOR),
            battery_eta_hours: battery.eta_hours,
            memory_eta_hours: memory.eta_hours,
        }
    }

    pub fn predictions(&self) -> Predictions {
        Predictions {
            battery_depletion: self.predict_battery_depletion(),
            memory_exhaustion: self.predict_memory_exhaustion(),
            maintenance: self.maintenance_recommendation(),
        }
    }

    fn trailing_window(history: &VecDeque<(u64, f64)>) -> Option<Vec<(u64, f64)>> {
        if history.len() < MIN_SAMPLES {
            return None;
        }
        let start = history.len().saturating_sub(PREDICTION_WINDOW);
        Some(history.iter().skip(start).copied().collect())
    }
}

struct LinearFit {
    slope: f64,
    intercept: f64,
    r_squared: f64,
}

/// Ordinary least-squares fit of `value = slope·tick + intercept`, plus the
/// coefficient of determination. Returns `None` when the fit is degenerate
/// (fewer than two points or zero tick variance). A flat value series has
/// `ss_tot == 0` and reports R² = 0.
fn linear_fit(points: &[(u64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(t, _)| *t as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, v)| *v).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &(t, v) in points {
        let dx = t as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (v - mean_y);
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for &(t, v) in points {
        let predicted = slope * t as f64 + intercept;
        ss_res += (v - predicted).powi(2);
        ss_tot += (v - mean_y).powi(2);
    }

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::device::SensorNode;

    fn snapshot_with(battery_mah: f64, memory_kb: f64) -> DeviceSnapshot {
        let mut node = SensorNode::new(&SimConfig::default());
        node.tick(1.0);
        let mut state = node.full_state();
        state.battery.remaining_mah = battery_mah;
        state.memory.used_kb = memory_kb;
        state
    }

    fn predictor() -> PredictiveMaintenance {
        PredictiveMaintenance::new(256.0)
    }

    #[test]
    fn too_few_samples_predicts_nothing() {
        let mut pred = predictor();
        for tick in 0..59 {
            pred.update(tick, &snapshot_with(1000.0 - tick as f64, 40.0));
        }

        assert!(pred.predict_battery_depletion().eta_hours.is_infinite());
        assert!(pred.predict_memory_exhaustion().eta_hours.is_infinite());
    }

    #[test]
    fn linear_drain_predicts_crossing() {
        let mut pred = predictor();
        // 1 mAh per tick from 1000: crosses zero at tick 1000.
        for tick in 0..100u64 {
            pred.update(tick, &snapshot_with(1000.0 - tick as f64, 40.0));
        }

        let prediction = pred.predict_battery_depletion();
        assert!((prediction.eta_ticks - 901.0).abs() < 1.0);
        assert_eq!(prediction.confidence, Confidence::High);
        assert!((prediction.r_squared - 1.0).abs() < 1e-9);
        // 1 mAh/tick = 3600 mAh/hour.
        assert!((prediction.rate_per_hour - 3600.0).abs() < 1e-6);
    }

    #[test]
    fn charging_battery_has_no_depletion() {
        let mut pred = predictor();
        for tick in 0..100u64 {
            pred.update(tick, &snapshot_with(500.0 + tick as f64, 40.0));
        }
        assert!(pred.predict_battery_depletion().eta_hours.is_infinite());
    }

    #[test]
    fn leaking_memory_predicts_exhaustion() {
        let mut pred = predictor();
        // 0.1 KB per tick from 40 toward 256: crosses at tick 2160.
        for tick in 0..100u64 {
            pred.update(tick, &snapshot_with(1000.0, 40.0 + 0.1 * tick as f64));
        }

        let prediction = pred.predict_memory_exhaustion();
        assert!(prediction.eta_hours.is_finite());
        assert!((prediction.eta_ticks - 2061.0).abs() < 2.0);
        assert_eq!(prediction.confidence, Confidence::High);
        // 0.1 KB/tick = 360 KB/hour.
        assert!((prediction.rate_per_hour - 360.0).abs() < 1e-6);
    }

    #[test]
    fn flat_memory_has_no_exhaustion() {
        let mut pred = predictor();
        for tick in 0..100u64 {
            pred.update(tick, &snapshot_with(1000.0, 40.0));
        }
        let prediction = pred.predict_memory_exhaustion();
        assert!(prediction.eta_hours.is_infinite());
        assert_eq!(prediction.confidence, Confidence::Low);
    }

    #[test]
    fn noisy_fit_lowers_confidence() {
        let mut pred = predictor();
        // Alternating sawtooth drain: trend down but poorly fit by a line.
        for tick in 0..100u64 {
            let wobble = if tick % 2 == 0 { 80.0 } else { -80.0 };
            pred.update(tick, &snapshot_with(1000.0 - tick as f64 + wobble, 40.0));
        }

        let prediction = pred.predict_battery_depletion();
        assert!(prediction.r_squared < 0.80);
        assert_eq!(prediction.confidence, Confidence::Low);
    }

    #[test]
    fn buffers_are_trimmed() {
        let mut pred = predictor();
        for tick in 0..2000u64 {
            pred.update(tick, &snapshot_with(1000.0, 40.0));
        }
        assert_eq!(pred.battery_history.len(), 600);
        assert_eq!(pred.memory_history.len(), 600);
    }

    #[test]
    fn maintenance_recommends_before_earliest_failure() {
        let mut pred = predictor();
        for tick in 0..100u64 {
            pred.update(
                tick,
                &snapshot_with(1000.0 - tick as f64, 40.0 + 0.1 * tick as f64),
            );
        }

        let rec = pred.maintenance_recommendation();
        assert!(rec.recommended);
        let battery_eta = pred.predict_battery_depletion().eta_hours;
        let expected = battery_eta.min(pred.predict_memory_exhaustion().eta_hours) * 0.7;
        assert!((rec.maintenance_in_hours.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn no_recommendation_without_finite_eta() {
        let mut pred = predictor();
        for tick in 0..100u64 {
            pred.update(tick, &snapshot_with(1000.0, 40.0));
        }

        let rec = pred.maintenance_recommendation();
        assert!(!rec.recommended);
        assert!(rec.maintenance_in_hours.is_none());
    }

    #[test]
    fn degenerate_same_tick_fit_is_rejected() {
        let points = vec![(5u64, 1.0), (5u64, 2.0), (5u64, 3.0)];
        assert!(linear_fit(&points).is_none());
    }

    #[test]
    fn flat_series_reports_zero_r_squared() {
        let points: Vec<(u64, f64)> = (0..10).map(|t| (t, 7.0)).collect();
        let fit = linear_fit(&points).unwrap();
        assert_eq!(fit.r_squared, 0.0);
        assert_eq!(fit.slope, 0.0);
    }
}
