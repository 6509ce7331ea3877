//! # Sensor Data Generator
//!
//! Produces per-tick synthetic readings for the three sensor channels.
//! Temperature follows a daily sinusoidal cycle plus Gaussian noise,
//! humidity is noise around a base value clamped to [0, 100], and light
//! follows a day/night sinusoid phased so the minimum falls at midnight
//! and the peak at noon. Temperature and humidity can spike into anomalies;
//! the light channel never flags one.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;
use strum::Display;

use crate::config::{LightSensorConfig, SensorChannelConfig, SensorsConfig};
use crate::device::round_to;

/// How many anomalies the rolling log retains.
const ANOMALY_LOG_CAPACITY: usize = 10;

/// Sensor channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Light,
}

/// One tick's worth of sensor values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    /// Channels whose value came from the anomaly spike branch.
    pub anomalies: Vec<SensorKind>,
}

impl SensorReading {
    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

/// Entry in the rolling anomaly log.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRecord {
    pub tick: u64,
    pub sensor: SensorKind,
    pub value: f64,
}

struct ChannelSample {
    value: f64,
    is_anomaly: bool,
}

/// Generates simulated sensor readings with noise and anomaly injection.
pub struct SensorDataGenerator {
    temperature: SensorChannelConfig,
    humidity: SensorChannelConfig,
    light: LightSensorConfig,
    total_anomalies: u64,
    anomaly_log: VecDeque<AnomalyRecord>,
}

impl SensorDataGenerator {
    pub fn new(config: &SensorsConfig) -> Self {
        Self {
            temperature: config.temperature.clone(),
            humidity: config.humidity.clone(),
            light: config.light.clone(),
            total_anomalies: 0,
            anomaly_log: VecDeque::with_capacity(ANOMALY_LOG_CAPACITY),
        }
    }

    /// Generate the reading for the current tick. Draw order is fixed
    /// (temperature, humidity, light) so identical seeds replay identically.
    pub fn generate_reading(
        &mut self,
        tick: u64,
        time_step_s: f64,
        rng: &mut StdRng,
    ) -> SensorReading {
        let temp = self.generate_temperature(tick, rng);
        let humidity = self.generate_humidity(rng);
        let light = self.generate_light(tick, time_step_s, rng);

        let mut reading = SensorReading {
            temperature: round_to(temp.value, 2),
            humidity: round_to(humidity.value, 2),
            light: round_to(light, 1),
            anomalies: Vec::new(),
        };

        if temp.is_anomaly {
            reading.anomalies.push(SensorKind::Temperature);
            self.record_anomaly(tick, SensorKind::Temperature, temp.value);
        }
        if humidity.is_anomaly {
            reading.anomalies.push(SensorKind::Humidity);
            self.record_anomaly(tick, SensorKind::Humidity, humidity.value);
        }

        reading
    }

    fn generate_temperature(&self, tick: u64, rng: &mut StdRng) -> ChannelSample {
        let cfg = &self.temperature;
        let noise: f64 = cfg.noise_std_dev * rng.sample::<f64, _>(StandardNormal);

        // Daily warming/cooling cycle on top of the base value.
        let time_hours = tick as f64 / 3600.0;
        let drift = 2.0 * (2.0 * PI * time_hours / 24.0).sin();

        if rng.gen::<f64>() < cfg.anomaly_probability {
            let spike = Self::draw_spike(&cfg.anomaly_spike_range, rng);
            return ChannelSample {
                value: cfg.base_value + drift + spike,
                is_anomaly: true,
            };
        }

        ChannelSample {
            value: cfg.base_value + drift + noise,
            is_anomaly: false,
        }
    }

    fn generate_humidity(&self, rng: &mut StdRng) -> ChannelSample {
        let cfg = &self.humidity;
        let noise: f64 = cfg.noise_std_dev * rng.sample::<f64, _>(StandardNormal);

        if rng.gen::<f64>() < cfg.anomaly_probability {
            let spike = Self::draw_spike(&cfg.anomaly_spike_range, rng);
            return ChannelSample {
                value: (cfg.base_value + spike).clamp(0.0, 100.0),
                is_anomaly: true,
            };
        }

        ChannelSample {
            value: (cfg.base_value + noise).clamp(0.0, 100.0),
            is_anomaly: false,
        }
    }

    fn generate_light(&self, tick: u64, time_step_s: f64, rng: &mut StdRng) -> f64 {
        let cfg = &self.light;
        let time_hours = tick as f64 * time_step_s / 3600.0;

        // Sinusoid phased -π/2: minimum at midnight, peak at noon.
        let phase = (time_hours % cfg.cycle_period_hours) / cfg.cycle_period_hours * 2.0 * PI;
        let sine = (phase - PI / 2.0).sin();
        let normalized = (sine + 1.0) / 2.0;
        let base_light = cfg.night_value + (cfg.day_value - cfg.night_value) * normalized;

        let noise: f64 = cfg.noise_std_dev * rng.sample::<f64, _>(StandardNormal);
        (base_light + noise).max(0.0)
    }

    /// Uniform magnitude from the spike range, with a fair sign flip.
    fn draw_spike(range: &[f64; 2], rng: &mut StdRng) -> f64 {
        let magnitude = rng.gen_range(range[0]..range[1]);
        if rng.gen_bool(0.5) {
            magnitude
        } else {
            -magnitude
        }
    }

    fn record_anomaly(&mut self, tick: u64, sensor: SensorKind, value: f64) {
        self.total_anomalies += 1;
        if self.anomaly_log.len() == ANOMALY_LOG_CAPACITY {
            self.anomaly_log.pop_front();
        }
        self.anomaly_log.push_back(AnomalyRecord { tick, sensor, value });
    }

    pub fn total_anomalies(&self) -> u64 {
        self.total_anomalies
    }

    /// The last few anomalies, oldest first.
    pub fn recent_anomalies(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.anomaly_log.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn generator() -> SensorDataGenerator {
        SensorDataGenerator::new(&SensorsConfig::default())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn reading_values_are_plausible() {
        let mut gen = generator();
        let mut rng = rng();

        let reading = gen.generate_reading(1, 1.0, &mut rng);

        assert!(reading.temperature > 0.0 && reading.temperature < 50.0);
        assert!((0.0..=100.0).contains(&reading.humidity));
        assert!(reading.light >= 0.0);
    }

    #[test]
    fn humidity_stays_clamped() {
        let mut cfg = SensorsConfig::default();
        cfg.humidity.base_value = 99.0;
        cfg.humidity.noise_std_dev = 10.0;
        let mut gen = SensorDataGenerator::new(&cfg);
        let mut rng = rng();

        for tick in 1..500 {
            let reading = gen.generate_reading(tick, 1.0, &mut rng);
            assert!((0.0..=100.0).contains(&reading.humidity));
        }
    }

    #[test]
    fn light_is_dark_at_midnight_and_bright_at_noon() {
        let mut cfg = SensorsConfig::default();
        cfg.light.noise_std_dev = 0.0;
        let mut gen = SensorDataGenerator::new(&cfg);
        let mut rng = rng();

        let midnight = gen.generate_reading(0, 1.0, &mut rng);
        let noon = gen.generate_reading(12 * 3600, 1.0, &mut rng);

        assert!(midnight.light < 10.0, "midnight light = {}", midnight.light);
        assert!(noon.light > 700.0, "noon light = {}", noon.light);
    }

    #[test]
    fn anomalies_are_injected_when_forced() {
        let mut cfg = SensorsConfig::default();
        cfg.temperature.anomaly_probability = 1.0;
        cfg.humidity.anomaly_probability = 1.0;
        let mut gen = SensorDataGenerator::new(&cfg);
        let mut rng = rng();

        let reading = gen.generate_reading(1, 1.0, &mut rng);
        assert!(reading.anomalies.contains(&SensorKind::Temperature));
        assert!(reading.anomalies.contains(&SensorKind::Humidity));
        assert_eq!(gen.total_anomalies(), 2);
    }

    #[test]
    fn light_never_flags_anomalies() {
        let mut cfg = SensorsConfig::default();
        cfg.temperature.anomaly_probability = 1.0;
        cfg.humidity.anomaly_probability = 1.0;
        let mut gen = SensorDataGenerator::new(&cfg);
        let mut rng = rng();

        for tick in 1..100 {
            let reading = gen.generate_reading(tick, 1.0, &mut rng);
            assert!(!reading.anomalies.contains(&SensorKind::Light));
        }
    }

    #[test]
    fn anomaly_log_is_bounded() {
        let mut cfg = SensorsConfig::default();
        cfg.temperature.anomaly_probability = 1.0;
        cfg.humidity.anomaly_probability = 1.0;
        let mut gen = SensorDataGenerator::new(&cfg);
        let mut rng = rng();

        for tick in 1..=50 {
            gen.generate_reading(tick, 1.0, &mut rng);
        }

        assert_eq!(gen.recent_anomalies().count(), 10);
        assert_eq!(gen.total_anomalies(), 100);
        // Oldest entries were evicted.
        let first = gen.recent_anomalies().next().unwrap();
        assert!(first.tick > 40);
    }

    #[test]
    fn same_seed_replays_identically() {
        let mut gen_a = generator();
        let mut gen_b = generator();
        let mut rng_a = rng();
        let mut rng_b = rng();

        for tick in 1..200 {
            let a = gen_a.generate_reading(tick, 1.0, &mut rng_a);
            let b = gen_b.generate_reading(tick, 1.0, &mut rng_b);
            assert_eq!(a, b);
        }
    }
}
