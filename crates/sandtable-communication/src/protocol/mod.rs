//! Sand table wire protocol
//!
//! Every frame in either direction is `HEADER || TYPE || PAYLOAD`, with all
//! integers big-endian:
//!
//! | Type | Direction | Payload |
//! |---|---|---|
//! | position | host → table | `i32` radius steps, `i32` angular delta steps |
//! | speed | host → table | `u16` steps per second |
//! | start, stop, clear, home, get-buffer-size | host → table | none |
//! | confirm, fail, buffer-full | table → host | none |
//! | buffer-size reply | table → host | `u8` buffered positions |

pub mod packet;
pub mod response;

pub use packet::Packet;
pub use response::{read_response, Response};

use sandtable_core::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sync sequence opening every frame (`"ab"`)
pub const HEADER: [u8; 2] = [0x61, 0x62];

/// Frame type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Move to a position
    Position = 0x63,
    /// Change the motor speed
    Speed = 0x64,
    /// Start executing buffered positions
    Start = 0x65,
    /// Stop after the current move
    Stop = 0x66,
    /// Drop buffered positions
    Clear = 0x67,
    /// Run the homing routine
    Home = 0x68,
    /// Frame accepted
    Confirm = 0x69,
    /// Frame rejected
    Fail = 0x70,
    /// Ask how many positions are buffered
    GetBufferSize = 0x71,
    /// Answer to [`MessageType::GetBufferSize`]
    BufferSizeReply = 0x72,
    /// Position rejected because the table's buffer is full
    BufferFull = 0x73,
}

impl MessageType {
    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        match self {
            MessageType::Position => 8,
            MessageType::Speed => 2,
            MessageType::BufferSizeReply => 1,
            _ => 0,
        }
    }

    /// Type byte on the wire
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0x63 => MessageType::Position,
            0x64 => MessageType::Speed,
            0x65 => MessageType::Start,
            0x66 => MessageType::Stop,
            0x67 => MessageType::Clear,
            0x68 => MessageType::Home,
            0x69 => MessageType::Confirm,
            0x70 => MessageType::Fail,
            0x71 => MessageType::GetBufferSize,
            0x72 => MessageType::BufferSizeReply,
            0x73 => MessageType::BufferFull,
            _ => return Err(ProtocolError::UnknownMessageType { code }),
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Position => "position",
            MessageType::Speed => "speed",
            MessageType::Start => "start",
            MessageType::Stop => "stop",
            MessageType::Clear => "clear",
            MessageType::Home => "home",
            MessageType::Confirm => "confirm",
            MessageType::Fail => "fail",
            MessageType::GetBufferSize => "get-buffer-size",
            MessageType::BufferSizeReply => "buffer-size",
            MessageType::BufferFull => "buffer-full",
        };
        f.write_str(name)
    }
}
