//! Sand Table Settings Crate
//!
//! Loads, validates and saves the host configuration.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, MachineSettings, TransportSettings, WorkerSettings};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
