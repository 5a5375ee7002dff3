//! # Sand Table
//!
//! Host software for a polar sand table. Drawings are planned into polar
//! step commands and streamed to the table's controller over a serial link.
//!
//! ## Architecture
//!
//! 1. **sandtable-core** - Data model, machine geometry, errors, queues
//! 2. **sandtable-planner** - Adaptive subdivision, waypoint and spiral planners, SVG import
//! 3. **sandtable-communication** - Wire protocol and the reliable two-lane transport
//! 4. **sandtable-settings** - Configuration files
//! 5. **sandtable** - Worker orchestration, front-end requests, CLI

pub mod commands;
pub mod worker;

pub use commands::{Button, PlannerRequest};
pub use worker::{Worker, WorkerConfig};

pub use sandtable_communication::{
    list_ports, SerialLink, SerialParams, SerialPortInfo, Transport, TransportConfig,
};
pub use sandtable_core::{
    ConnectionError, Error, MachineGeometry, PlannerError, ProtocolError, Result, StepCommand,
    Waypoint,
};
pub use sandtable_planner::{Planner, SpiralPlanner, SvgImporter, WaypointOptions, WaypointPlanner};
pub use sandtable_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
