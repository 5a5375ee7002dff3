//! Configuration for the sand table host
//!
//! Settings are grouped in sections and stored as TOML or JSON, chosen by
//! file extension:
//! - Connection settings (port, baud rate, response timeout)
//! - Transport timing and queue capacities
//! - Machine geometry (reach and step scales)
//! - Worker defaults

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use sandtable_communication::{SerialParams, TransportConfig, DEFAULT_BAUD_RATE};
use sandtable_core::{MachineGeometry, ANGLE_STEPS_PER_RAD, RADIUS_LIMIT_MM, RADIUS_STEPS_PER_MM};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port name; empty means it must be given on the command line
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Wait for each response in milliseconds
    pub read_timeout_ms: u64,
    /// Pause after opening the port in milliseconds
    pub settle_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            settle_ms: 100,
        }
    }
}

/// Transport timing and capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Sleep between loop iterations in milliseconds
    pub poll_interval_ms: u64,
    /// Wait before resending a rejected position in milliseconds
    pub backoff_ms: u64,
    /// Capacity of the motion lane
    pub motion_queue_capacity: usize,
    /// Capacity of the command lane
    pub command_queue_capacity: usize,
    /// How long a producer waits on a full lane in milliseconds
    pub enqueue_timeout_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            backoff_ms: 500,
            motion_queue_capacity: 25,
            command_queue_capacity: 25,
            enqueue_timeout_ms: 5000,
        }
    }
}

/// Machine geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Maximum reach in mm
    pub radius_limit_mm: f64,
    /// Radial steps per mm
    pub radius_steps_per_mm: f64,
    /// Angular steps per radian
    pub angle_steps_per_rad: f64,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            radius_limit_mm: RADIUS_LIMIT_MM,
            radius_steps_per_mm: RADIUS_STEPS_PER_MM,
            angle_steps_per_rad: ANGLE_STEPS_PER_RAD,
        }
    }
}

/// Worker defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Sleep while no planner is queued, in milliseconds
    pub idle_poll_ms: u64,
    /// Accuracy used when a drawing request gives none, in mm²
    pub default_accuracy: f64,
    /// Step commands per spiral revolution
    pub spiral_samples_per_revolution: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_poll_ms: 500,
            default_accuracy: 1.0,
            spiral_samples_per_revolution: 2,
        }
    }
}

/// Complete host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Transport settings
    pub transport: TransportSettings,
    /// Machine geometry
    pub machine: MachineSettings,
    /// Worker defaults
    pub worker: WorkerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform config location, `<config dir>/sandtable/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("sandtable").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory on this platform".into())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the config at the platform location, or defaults if there is none
    pub fn load_or_default() -> SettingsResult<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| SettingsError::SaveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let connection = &self.connection;
        if connection.baud_rate == 0 {
            return Err(ConfigError::out_of_range("connection.baud_rate", 0));
        }
        if connection.read_timeout_ms == 0 {
            return Err(ConfigError::out_of_range("connection.read_timeout_ms", 0));
        }

        let transport = &self.transport;
        for (key, value) in [
            ("transport.poll_interval_ms", transport.poll_interval_ms),
            ("transport.backoff_ms", transport.backoff_ms),
            ("transport.enqueue_timeout_ms", transport.enqueue_timeout_ms),
            ("transport.motion_queue_capacity", transport.motion_queue_capacity as u64),
            ("transport.command_queue_capacity", transport.command_queue_capacity as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::out_of_range(key, value));
            }
        }

        let machine = &self.machine;
        for (key, value) in [
            ("machine.radius_limit_mm", machine.radius_limit_mm),
            ("machine.radius_steps_per_mm", machine.radius_steps_per_mm),
            ("machine.angle_steps_per_rad", machine.angle_steps_per_rad),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::out_of_range(key, value));
            }
        }

        let worker = &self.worker;
        if worker.idle_poll_ms == 0 {
            return Err(ConfigError::out_of_range("worker.idle_poll_ms", 0));
        }
        if !(worker.default_accuracy.is_finite() && worker.default_accuracy > 0.0) {
            return Err(ConfigError::out_of_range(
                "worker.default_accuracy",
                worker.default_accuracy,
            ));
        }
        if worker.spiral_samples_per_revolution == 0 {
            return Err(ConfigError::out_of_range(
                "worker.spiral_samples_per_revolution",
                0,
            ));
        }

        Ok(())
    }

    /// Serial parameters; `port` overrides the configured port
    pub fn serial_params(&self, port: Option<&str>) -> SerialParams {
        let port = port.unwrap_or(&self.connection.port);
        SerialParams::new(port).with_baud_rate(self.connection.baud_rate)
    }

    /// Transport timing and capacities
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            poll_interval: Duration::from_millis(self.transport.poll_interval_ms),
            backoff: Duration::from_millis(self.transport.backoff_ms),
            read_timeout: Duration::from_millis(self.connection.read_timeout_ms),
            settle_delay: Duration::from_millis(self.connection.settle_ms),
            motion_queue_capacity: self.transport.motion_queue_capacity,
            command_queue_capacity: self.transport.command_queue_capacity,
            enqueue_timeout: Duration::from_millis(self.transport.enqueue_timeout_ms),
        }
    }

    /// Machine scale factors
    pub fn geometry(&self) -> MachineGeometry {
        MachineGeometry {
            radius_limit_mm: self.machine.radius_limit_mm,
            radius_steps_per_mm: self.machine.radius_steps_per_mm,
            angle_steps_per_rad: self.machine.angle_steps_per_rad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.baud_rate, 115_200);
        assert_eq!(config.geometry(), MachineGeometry::default());
        assert_eq!(config.transport_config(), TransportConfig::default());
    }

    #[test]
    fn test_validation_names_the_key() {
        let mut config = Config::new();
        config.transport.backoff_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::out_of_range("transport.backoff_ms", 0))
        );

        let mut config = Config::new();
        config.machine.radius_steps_per_mm = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValueOutOfRange { key, .. }) if key == "machine.radius_steps_per_mm"
        ));

        let mut config = Config::new();
        config.worker.default_accuracy = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serial_params_override() {
        let mut config = Config::new();
        config.connection.port = "/dev/ttyACM0".to_string();
        assert_eq!(config.serial_params(None).port, "/dev/ttyACM0");
        assert_eq!(config.serial_params(Some("COM9")).port, "COM9");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[connection]\nport = \"COM9\"\n").unwrap();
        assert_eq!(config.connection.port, "COM9");
        assert_eq!(config.connection.baud_rate, 115_200);
        assert_eq!(config.transport, TransportSettings::default());
    }

    #[test]
    fn test_default_path() {
        if let Ok(path) = Config::default_path() {
            assert!(path.ends_with("sandtable/config.toml"));
        }
    }
}
