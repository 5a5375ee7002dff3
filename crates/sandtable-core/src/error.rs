//! Error handling for the sand table host
//!
//! Provides error types for all layers of the system:
//! - Planner errors (trajectory construction preconditions)
//! - Protocol errors (malformed packets and out-of-range payloads)
//! - Connection errors (serial link and transport lifecycle)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Planner error type
///
/// Raised synchronously when a trajectory planner is constructed with
/// parameters the machine cannot follow. A planner that fails here never
/// reaches the worker queue.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// A waypoint lies on or beyond the table's maximum reach
    #[error("Radius {radius_mm:.2}mm at point {index} exceeds the table limit of {limit_mm}mm")]
    RadiusLimit {
        /// Index of the offending waypoint.
        index: usize,
        /// Radius of the offending waypoint in millimeters.
        radius_mm: f64,
        /// Maximum reach of the table in millimeters.
        limit_mm: f64,
    },

    /// Accuracy target is not a positive real number
    #[error("Accuracy must be a positive finite number, got {value}")]
    InvalidAccuracy {
        /// The rejected accuracy value.
        value: f64,
    },

    /// Not enough waypoints to describe a trajectory
    #[error("At least one waypoint is required")]
    NoWaypoints,

    /// Spiral parameters are out of range
    #[error("Invalid spiral: {reason}")]
    InvalidSpiral {
        /// The reason the spiral was rejected.
        reason: String,
    },

    /// Pass count must be at least one
    #[error("Pass count must be at least 1, got {passes}")]
    InvalidPasses {
        /// The rejected pass count.
        passes: u32,
    },

    /// Visualisation sampling request is out of range
    #[error("Invalid sampling request: {reason}")]
    InvalidSampling {
        /// The reason the request was rejected.
        reason: String,
    },

    /// Waypoint source could not be decoded
    #[error("Import failed: {reason}")]
    Import {
        /// The reason the import failed.
        reason: String,
    },
}

/// Protocol error type
///
/// Represents malformed commands caught before they are framed, and frames
/// from the controller that cannot be interpreted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Position command did not carry exactly two values
    #[error("Position requires exactly 2 values, got {count}")]
    InvalidPositionArity {
        /// Number of values supplied.
        count: usize,
    },

    /// Position value does not fit a signed 32-bit integer
    #[error("Position value {value} does not fit in an i32")]
    PositionOutOfRange {
        /// The rejected value.
        value: i64,
    },

    /// Speed does not fit an unsigned 16-bit integer
    #[error("Speed {value} steps/s is outside 0..=65535")]
    SpeedOutOfRange {
        /// The rejected speed.
        value: i64,
    },

    /// Unknown message type byte
    #[error("Unknown message type 0x{code:02x}")]
    UnknownMessageType {
        /// The unrecognised type byte.
        code: u8,
    },

    /// Frame is shorter than its type requires
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame {
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// Frame does not start with the sync header
    #[error("Frame does not start with the sync header")]
    MissingHeader,
}

/// Connection error type
///
/// Represents faults on the serial link and in the transport lifecycle.
/// These are fatal to the affected operation; the core never retries them.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// The link failed while the transport loop was running
    #[error("Serial link lost: {reason}")]
    LinkLost {
        /// The reason the link was lost.
        reason: String,
    },

    /// A bounded queue stayed full for the whole wait
    #[error("{queue} queue stayed full for {timeout_ms}ms")]
    EnqueueTimeout {
        /// Which queue was full.
        queue: String,
        /// The wait in milliseconds.
        timeout_ms: u64,
    },

    /// Transport loop was already started
    #[error("Transport loop already running")]
    AlreadyRunning,

    /// Transport loop is not running
    #[error("Transport loop not running")]
    NotRunning,

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },
}

/// Main error type for the sand table host
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Planner error
    #[error(transparent)]
    Planner(#[from] PlannerError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a queue wait timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError::EnqueueTimeout { .. })
        )
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a planner precondition violation
    pub fn is_planner_error(&self) -> bool {
        matches!(self, Error::Planner(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::RadiusLimit {
            index: 3,
            radius_mm: 251.0,
            limit_mm: 250.0,
        };
        assert_eq!(
            err.to_string(),
            "Radius 251.00mm at point 3 exceeds the table limit of 250mm"
        );

        let err = ProtocolError::SpeedOutOfRange { value: 70000 };
        assert_eq!(err.to_string(), "Speed 70000 steps/s is outside 0..=65535");

        let err = ConnectionError::EnqueueTimeout {
            queue: "motion".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "motion queue stayed full for 250ms");
    }

    #[test]
    fn test_error_classification() {
        let err: Error = ConnectionError::EnqueueTimeout {
            queue: "motion".to_string(),
            timeout_ms: 10,
        }
        .into();
        assert!(err.is_timeout());
        assert!(err.is_connection_error());

        let err: Error = PlannerError::NoWaypoints.into();
        assert!(err.is_planner_error());
        assert!(!err.is_timeout());

        let err: Error = ProtocolError::InvalidPositionArity { count: 3 }.into();
        assert!(err.is_protocol_error());
    }
}
