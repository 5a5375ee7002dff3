//! Host-to-table frames

use super::{MessageType, HEADER};
use sandtable_core::{ProtocolError, StepCommand};
use std::fmt;

/// One framed message, ready to be written to the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: MessageType,
    payload: Vec<u8>,
}

impl Packet {
    fn bare(kind: MessageType) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    /// Position frame for a step command
    pub fn position(command: StepCommand) -> Self {
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&command.r_steps.to_be_bytes());
        payload.extend_from_slice(&command.phi_delta_steps.to_be_bytes());
        Self {
            kind: MessageType::Position,
            payload,
        }
    }

    /// Position frame from loosely typed values.
    ///
    /// Exactly two values are required and both must fit an `i32`.
    pub fn position_from_values(values: &[i64]) -> Result<Self, ProtocolError> {
        let [r, dphi] = values else {
            return Err(ProtocolError::InvalidPositionArity {
                count: values.len(),
            });
        };
        let to_i32 = |value: i64| {
            i32::try_from(value).map_err(|_| ProtocolError::PositionOutOfRange { value })
        };
        Ok(Self::position(StepCommand::new(to_i32(*r)?, to_i32(*dphi)?)))
    }

    /// Speed frame, rejecting values outside `u16`
    pub fn speed(steps_per_second: i64) -> Result<Self, ProtocolError> {
        let speed = u16::try_from(steps_per_second).map_err(|_| ProtocolError::SpeedOutOfRange {
            value: steps_per_second,
        })?;
        Ok(Self {
            kind: MessageType::Speed,
            payload: speed.to_be_bytes().to_vec(),
        })
    }

    /// Start executing buffered positions
    pub fn start() -> Self {
        Self::bare(MessageType::Start)
    }

    /// Stop after the current move
    pub fn stop() -> Self {
        Self::bare(MessageType::Stop)
    }

    /// Drop buffered positions
    pub fn clear() -> Self {
        Self::bare(MessageType::Clear)
    }

    /// Run the homing routine
    pub fn home() -> Self {
        Self::bare(MessageType::Home)
    }

    /// Ask for the number of buffered positions
    pub fn get_buffer_size() -> Self {
        Self::bare(MessageType::GetBufferSize)
    }

    /// Frame type
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// Payload bytes, without header and type
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Complete frame as written to the wire
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER.len() + 1 + self.payload.len());
        frame.extend_from_slice(&HEADER);
        frame.push(self.kind.code());
        frame.extend_from_slice(&self.payload);
        frame
    }

    /// Parse a complete frame. Trailing bytes are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER.len() || frame[..HEADER.len()] != HEADER {
            return Err(ProtocolError::MissingHeader);
        }
        let Some(&code) = frame.get(HEADER.len()) else {
            return Err(ProtocolError::TruncatedFrame {
                expected: HEADER.len() + 1,
                actual: frame.len(),
            });
        };
        let kind = MessageType::try_from(code)?;
        let start = HEADER.len() + 1;
        let expected = start + kind.payload_len();
        if frame.len() < expected {
            return Err(ProtocolError::TruncatedFrame {
                expected,
                actual: frame.len(),
            });
        }
        Ok(Self {
            kind,
            payload: frame[start..expected].to_vec(),
        })
    }

    /// Step command carried by a position frame
    pub fn step_command(&self) -> Option<StepCommand> {
        if self.kind != MessageType::Position {
            return None;
        }
        let r = i32::from_be_bytes(self.payload.get(0..4)?.try_into().ok()?);
        let dphi = i32::from_be_bytes(self.payload.get(4..8)?.try_into().ok()?);
        Some(StepCommand::new(r, dphi))
    }

    /// Speed carried by a speed frame
    pub fn speed_value(&self) -> Option<u16> {
        if self.kind != MessageType::Speed {
            return None;
        }
        Some(u16::from_be_bytes(self.payload.get(0..2)?.try_into().ok()?))
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.step_command(), self.speed_value()) {
            (Some(command), _) => write!(f, "{} {}", self.kind, command),
            (_, Some(speed)) => write!(f, "{} {}", self.kind, speed),
            _ => write!(f, "{}", self.kind),
        }
    }
}
