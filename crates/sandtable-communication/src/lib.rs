//! # Sand Table Communication
//!
//! Framed serial protocol and the reliable two-lane transport that carries
//! step commands and control frames to the table's controller.

pub mod protocol;
pub mod serial;
pub mod transport;

pub use protocol::{read_response, MessageType, Packet, Response, HEADER};
pub use serial::{list_ports, RealSerialPort, SerialLink, SerialParams, SerialPortInfo, DEFAULT_BAUD_RATE};
pub use transport::{MotionState, Transport, TransportConfig};
