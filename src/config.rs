use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::sync::SyncStrategyKind;

/// Default config file consulted when no `--config` path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Configuration-phase failures. These are the only errors that abort a
/// run; once the simulation starts, anomalies are accounted in counters
/// rather than raised.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to parse configuration")]
    Parse(#[source] Box<figment::Error>),

    #[error("configuration validation failed")]
    Validation(#[from] validator::ValidationErrors),
}

/// Tick log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Csv,
}

impl LogFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Csv => "csv",
        }
    }
}

/// Top-level simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimConfig {
    #[validate(nested)]
    pub simulation: SimulationConfig,

    #[validate(nested)]
    pub device: DeviceConfig,

    #[validate(nested)]
    pub sensors: SensorsConfig,

    #[validate(nested)]
    pub sync: SyncConfig,

    #[validate(nested)]
    pub fault_detection: FaultDetectionConfig,

    #[validate(nested)]
    pub edge: EdgeConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            device: DeviceConfig::default(),
            sensors: SensorsConfig::default(),
            sync: SyncConfig::default(),
            fault_detection: FaultDetectionConfig::default(),
            edge: EdgeConfig::default(),
        }
    }
}

/// Simulation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulationConfig {
    #[validate(range(min = 0.001, max = 8760.0))]
    pub duration_hours: f64,

    #[validate(range(min = 0.001, max = 3600.0))]
    pub time_step_seconds: f64,

    #[validate(range(min = 1))]
    pub sampling_rate_seconds: u64,

    pub random_seed: u64,

    pub log_format: LogFormat,

    pub log_output_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_hours: 6.0,
            time_step_seconds: 1.0,
            sampling_rate_seconds: 5,
            random_seed: 42,
            log_format: LogFormat::Json,
            log_output_dir: PathBuf::from("logs"),
        }
    }
}

impl SimulationConfig {
    /// Total tick count for the configured duration.
    pub fn total_ticks(&self) -> u64 {
        (self.duration_hours * 3600.0 / self.time_step_seconds) as u64
    }
}

/// Device hardware configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    #[validate(nested)]
    pub processor: ProcessorConfig,

    #[validate(nested)]
    pub memory: MemoryConfig,

    #[validate(nested)]
    pub battery: BatteryConfig,

    #[validate(nested)]
    pub network: NetworkConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            processor: ProcessorConfig::default(),
            memory: MemoryConfig::default(),
            battery: BatteryConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

/// Processor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessorConfig {
    /// Clock speed (MHz) - Cortex-M4 class
    #[validate(range(min = 1.0, max = 10000.0))]
    pub clock_mhz: f64,

    #[validate(nested)]
    pub task_costs: TaskCosts,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            clock_mhz: 80.0,
            task_costs: TaskCosts::default(),
        }
    }
}

/// Cycle cost per operation type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskCosts {
    pub sensing_cycles: u64,
    pub processing_cycles: u64,
    pub transmission_cycles: u64,
    pub idle_cycles: u64,
}

impl Default for TaskCosts {
    fn default() -> Self {
        Self {
            sensing_cycles: 8_000_000,       // ADC reads + driver overhead
            processing_cycles: 12_000_000,   // filtering + packing
            transmission_cycles: 6_000_000,  // radio framing
            idle_cycles: 0,
        }
    }
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MemoryConfig {
    #[validate(range(min = 1.0))]
    pub total_ram_kb: f64,

    #[validate(range(min = 0.0))]
    pub base_usage_kb: f64,

    #[validate(range(min = 0.0))]
    pub per_reading_buffer_kb: f64,

    #[validate(range(min = 1))]
    pub max_buffer_readings: u32,

    pub leak_enabled: bool,

    #[validate(range(min = 0.0))]
    pub leak_rate_kb_per_minute: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            total_ram_kb: 256.0,            // Cortex-M4 class SRAM
            base_usage_kb: 40.0,            // firmware + stacks
            per_reading_buffer_kb: 2.0,
            max_buffer_readings: 50,
            leak_enabled: true,
            leak_rate_kb_per_minute: 0.5,
        }
    }
}

/// Battery configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_battery_config"))]
pub struct BatteryConfig {
    #[validate(range(min = 0.1))]
    pub capacity_mah: f64,

    #[validate(range(min = 0.1, max = 48.0))]
    pub voltage: f64,

    #[validate(nested)]
    pub current_draw_ma: OperationDraw,

    /// Fractions of capacity at which a warning fires, once each per run.
    pub warning_thresholds: Vec<f64>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_mah: 1000.0,           // single-cell Li-Po
            voltage: 3.7,
            current_draw_ma: OperationDraw::default(),
            warning_thresholds: vec![0.5, 0.2, 0.1, 0.05],
        }
    }
}

/// Current draw (mA) per operation type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OperationDraw {
    #[validate(range(min = 0.0))]
    pub sensing: f64,

    #[validate(range(min = 0.0))]
    pub processing: f64,

    #[validate(range(min = 0.0))]
    pub transmission: f64,

    #[validate(range(min = 0.0))]
    pub idle: f64,
}

impl Default for OperationDraw {
    fn default() -> Self {
        Self {
            sensing: 80.0,
            processing: 120.0,
            transmission: 250.0,    // radio TX dominates
            idle: 10.0,
        }
    }
}

fn validate_battery_config(config: &BatteryConfig) -> std::result::Result<(), validator::ValidationError> {
    for &t in &config.warning_thresholds {
        if !(0.0..1.0).contains(&t) {
            return Err(validator::ValidationError::new(
                "warning_thresholds must be fractions in [0, 1)",
            ));
        }
    }
    Ok(())
}

/// Network (radio link) configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NetworkConfig {
    #[serde(rename = "type")]
    pub net_type: String,

    #[validate(range(min = 0.1))]
    pub max_bandwidth_kbps: f64,

    #[validate(range(min = 1))]
    pub max_payload_bytes: usize,

    #[validate(range(min = 0.0, max = 1.0))]
    pub base_packet_loss_rate: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub congested_packet_loss_rate: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub congestion_threshold: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            net_type: "lora".to_string(),
            max_bandwidth_kbps: 50.0,
            max_payload_bytes: 2048,
            base_packet_loss_rate: 0.02,
            congested_packet_loss_rate: 0.15,
            congestion_threshold: 0.80,
        }
    }
}

/// Sensor channel configurations
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorsConfig {
    #[validate(nested)]
    pub temperature: SensorChannelConfig,

    #[validate(nested)]
    pub humidity: SensorChannelConfig,

    #[validate(nested)]
    pub light: LightSensorConfig,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            temperature: SensorChannelConfig {
                base_value: 22.0,
                noise_std_dev: 0.5,
                anomaly_probability: 0.005,
                anomaly_spike_range: [5.0, 15.0],
            },
            humidity: SensorChannelConfig {
                base_value: 55.0,
                noise_std_dev: 2.0,
                anomaly_probability: 0.005,
                anomaly_spike_range: [20.0, 40.0],
            },
            light: LightSensorConfig::default(),
        }
    }
}

/// One noisy sensor channel with anomaly injection
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorChannelConfig {
    pub base_value: f64,

    #[validate(range(min = 0.0))]
    pub noise_std_dev: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub anomaly_probability: f64,

    /// Magnitude range for anomaly spikes; sign is drawn separately.
    pub anomaly_spike_range: [f64; 2],
}

/// Day/night cycling light sensor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LightSensorConfig {
    pub day_value: f64,
    pub night_value: f64,

    #[validate(range(min = 0.1))]
    pub cycle_period_hours: f64,

    #[validate(range(min = 0.0))]
    pub noise_std_dev: f64,
}

impl Default for LightSensorConfig {
    fn default() -> Self {
        Self {
            day_value: 800.0,       // lux, overcast daylight
            night_value: 5.0,
            cycle_period_hours: 24.0,
            noise_std_dev: 20.0,
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    pub default_strategy: SyncStrategyKind,

    #[validate(range(min = 1))]
    pub full_state_interval_s: u64,

    #[validate(range(min = 0.0))]
    pub delta_threshold: f64,

    #[validate(range(min = 0.0))]
    pub event_change_threshold: f64,

    #[validate(nested)]
    pub adaptive: AdaptiveSyncConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_strategy: SyncStrategyKind::Adaptive,
            full_state_interval_s: 10,
            delta_threshold: 0.02,
            event_change_threshold: 0.05,
            adaptive: AdaptiveSyncConfig::default(),
        }
    }
}

/// Battery-aware interval bands for the adaptive strategy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdaptiveSyncConfig {
    #[validate(range(min = 1))]
    pub high_battery_interval_s: u64,

    #[validate(range(min = 1))]
    pub medium_battery_interval_s: u64,

    #[validate(range(min = 1))]
    pub low_battery_interval_s: u64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub high_battery_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub low_battery_threshold: f64,
}

impl Default for AdaptiveSyncConfig {
    fn default() -> Self {
        Self {
            high_battery_interval_s: 5,
            medium_battery_interval_s: 15,
            low_battery_interval_s: 60,
            high_battery_threshold: 0.50,
            low_battery_threshold: 0.15,
        }
    }
}

/// Fault detection thresholds and durations
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FaultDetectionConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub cpu_critical_threshold: f64,

    #[validate(range(min = 1))]
    pub cpu_critical_duration_s: u64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub cpu_warning_threshold: f64,

    #[validate(range(min = 1))]
    pub cpu_warning_duration_s: u64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub memory_critical_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub memory_warning_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub battery_critical_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub battery_warning_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub bandwidth_warning_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub packet_loss_critical_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub state_drift_warning_threshold: f64,

    #[validate(range(min = 2))]
    pub memory_leak_detection_window_s: u64,

    #[validate(range(min = 1.0))]
    pub communication_timeout_multiplier: f64,

    #[validate(range(min = 0.0))]
    pub sensor_anomaly_sigma: f64,
}

impl Default for FaultDetectionConfig {
    fn default() -> Self {
        Self {
            cpu_critical_threshold: 0.95,
            cpu_critical_duration_s: 10,
            cpu_warning_threshold: 0.80,
            cpu_warning_duration_s: 30,
            memory_critical_threshold: 0.95,
            memory_warning_threshold: 0.80,
            battery_critical_threshold: 0.10,
            battery_warning_threshold: 0.20,
            bandwidth_warning_threshold: 0.75,
            packet_loss_critical_threshold: 0.10,
            state_drift_warning_threshold: 0.15,
            memory_leak_detection_window_s: 300,
            communication_timeout_multiplier: 3.0,
            sensor_anomaly_sigma: 3.0,
        }
    }
}

/// Edge processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EdgeConfig {
    pub enabled: bool,

    pub compression_enabled: bool,

    #[validate(range(min = 0.0, max = 1.0))]
    pub compression_ratio: f64,

    #[validate(range(min = 1))]
    pub filter_window_size: usize,

    pub anomaly_immediate_sync: bool,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compression_enabled: true,
            compression_ratio: 0.6,
            filter_window_size: 5,
            anomaly_immediate_sync: true,
        }
    }
}

impl SimConfig {
    /// Load configuration, layered in this order (later overrides earlier):
    /// 1. Crate defaults
    /// 2. A TOML file (`--config PATH`, or `config/default.toml` if present)
    /// 3. Environment variables with the `TWIN__` prefix
    ///    (`TWIN__SIMULATION__RANDOM_SEED` → `simulation.random_seed`)
    ///
    /// An explicitly-passed path that does not exist is an error; the
    /// default path is optional. Unknown keys in the file are ignored.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SimConfig::default()));

        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::MissingFile(p.to_path_buf()));
                }
                figment = figment.merge(Toml::file(p));
            }
            None => {
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_PATH));
            }
        }

        figment = figment.merge(Env::prefixed("TWIN__").split("__"));

        let config: SimConfig = figment
            .extract()
            .map_err(|e| ConfigError::Parse(Box::new(e)))?;

        config.validate()?;

        Ok(config)
    }
}
