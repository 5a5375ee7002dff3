//! # Sand Table Core
//!
//! Core types, machine geometry, errors and synchronisation primitives
//! shared by the planner, the serial transport and the worker.

pub mod data;
pub mod error;
pub mod sync;
pub mod types;
pub mod units;

pub use data::{PolarSample, StepCommand, Waypoint};

pub use error::{ConnectionError, Error, PlannerError, ProtocolError, Result};

pub use sync::{BoundedQueue, CancellationToken};

pub use types::{thread_safe_deque, thread_safe_none, ThreadSafeDeque, ThreadSafeOption};

pub use units::{MachineGeometry, ANGLE_STEPS_PER_RAD, RADIUS_LIMIT_MM, RADIUS_STEPS_PER_MM};
