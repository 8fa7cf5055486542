//! Core types for the CANopen dumper
//!
//! This module defines the raw frame representation shared by every frame
//! source, the error type of the library and the decoded events that the
//! dumper hands to the formatter.

use crate::messages::{Emergency, HeartbeatState, NmtCommand};
use crate::options::Category;
use crate::sdo::SdoEvent;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Result type for dumper operations
pub type Result<T> = std::result::Result<T, DumpError>;

/// Maximum payload length of a classic CAN frame
pub const CAN_MAX_DLC: usize = 8;

/// Extended frame format flag in the SocketCAN id word
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Remote transmission request flag in the SocketCAN id word
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;
/// Error frame flag in the SocketCAN id word
pub const CAN_ERR_FLAG: u32 = 0x2000_0000;

const CAN_SFF_MASK: u32 = 0x0000_07FF;
const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// Size of a SocketCAN `struct can_frame` on the wire
pub const CAN_FRAME_WIRE_SIZE: usize = 16;

/// Raw classic CAN frame as received from the bus or a trace file
///
/// The payload is always stored zero padded to eight bytes so that field
/// accessors never have to bounds check against the data length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    /// Arbitration id without flag bits (11-bit or 29-bit)
    pub can_id: u32,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
    /// True if this is a remote frame
    pub is_remote_frame: bool,
    /// True if this is an error frame
    pub is_error_frame: bool,
    dlc: u8,
    data: [u8; CAN_MAX_DLC],
}

impl CanFrame {
    /// Create a standard data frame; data beyond eight bytes is dropped
    pub fn new(can_id: u32, data: &[u8]) -> Self {
        let len = data.len().min(CAN_MAX_DLC);
        let mut payload = [0u8; CAN_MAX_DLC];
        payload[..len].copy_from_slice(&data[..len]);

        Self {
            can_id: can_id & CAN_SFF_MASK,
            is_extended: false,
            is_remote_frame: false,
            is_error_frame: false,
            dlc: len as u8,
            data: payload,
        }
    }

    /// Create a remote frame requesting `dlc` bytes
    pub fn remote(can_id: u32, dlc: u8) -> Self {
        Self {
            is_remote_frame: true,
            dlc: dlc.min(CAN_MAX_DLC as u8),
            ..Self::new(can_id, &[])
        }
    }

    /// Build a frame from a SocketCAN id word (id plus EFF/RTR/ERR flags)
    pub fn from_id_word(id_word: u32, dlc: u8, data: &[u8]) -> Self {
        let is_extended = id_word & CAN_EFF_FLAG != 0;
        let mask = if is_extended { CAN_EFF_MASK } else { CAN_SFF_MASK };

        let mut frame = Self::new(0, data);
        frame.can_id = id_word & mask;
        frame.is_extended = is_extended;
        frame.is_remote_frame = id_word & CAN_RTR_FLAG != 0;
        frame.is_error_frame = id_word & CAN_ERR_FLAG != 0;
        frame.dlc = dlc.min(CAN_MAX_DLC as u8);
        frame
    }

    /// SocketCAN id word of this frame, flags included
    pub fn id_word(&self) -> u32 {
        let mut word = self.can_id;
        if self.is_extended {
            word |= CAN_EFF_FLAG;
        }
        if self.is_remote_frame {
            word |= CAN_RTR_FLAG;
        }
        if self.is_error_frame {
            word |= CAN_ERR_FLAG;
        }
        word
    }

    /// Decode a frame from the fixed-width `struct can_frame` layout
    ///
    /// Layout: id word (u32), dlc (u8), three padding bytes, eight data bytes.
    pub fn from_wire(raw: &[u8; CAN_FRAME_WIRE_SIZE]) -> Self {
        let id_word = LittleEndian::read_u32(&raw[0..4]);
        let dlc = raw[4].min(CAN_MAX_DLC as u8);
        Self::from_id_word(id_word, dlc, &raw[8..8 + dlc as usize])
    }

    /// Encode the frame into the fixed-width `struct can_frame` layout
    pub fn to_wire(&self) -> [u8; CAN_FRAME_WIRE_SIZE] {
        let mut raw = [0u8; CAN_FRAME_WIRE_SIZE];
        LittleEndian::write_u32(&mut raw[0..4], self.id_word());
        raw[4] = self.dlc;
        raw[8..].copy_from_slice(&self.data);
        raw
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.dlc as usize
    }

    /// Data bytes covered by the DLC
    pub fn data(&self) -> &[u8] {
        &self.data[..self.dlc()]
    }

    /// Full zero-padded payload, regardless of the DLC
    pub fn payload(&self) -> &[u8; CAN_MAX_DLC] {
        &self.data
    }
}

/// A raw frame paired with its capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedFrame {
    /// Microseconds since the Unix epoch
    pub timestamp_us: u64,
    pub frame: CanFrame,
}

impl TimestampedFrame {
    pub fn new(timestamp_us: u64, frame: CanFrame) -> Self {
        Self {
            timestamp_us,
            frame,
        }
    }

    /// Stamp a frame with the current wall-clock time
    pub fn now(frame: CanFrame) -> Self {
        let micros = chrono::Utc::now().timestamp_micros();
        Self::new(u64::try_from(micros).unwrap_or_default(), frame)
    }
}

/// Errors that can occur while dumping
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Could not open frame source {address}: {cause}")]
    SourceOpen {
        address: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("Unsupported frame source: {0}")]
    UnsupportedSource(String),

    #[error("Unclassifiable CAN ID 0x{0:X}")]
    Unclassifiable(u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Transmit or receive PDO channel, as seen from the producing node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdoDirection {
    Transmit,
    Receive,
}

impl PdoDirection {
    pub fn prefix(&self) -> char {
        match self {
            PdoDirection::Transmit => 'T',
            PdoDirection::Receive => 'R',
        }
    }
}

/// One decoded CANopen message - the output of the dumper for a frame
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// Network management command; `node_id` 0 addresses all nodes
    Nmt { node_id: u8, command: NmtCommand },

    Sync,

    /// Time stamp object; the payload is not interpreted
    Timestamp,

    /// Emergency message, `None` for a zero-length frame
    Emcy {
        node_id: u8,
        emergency: Option<Emergency>,
    },

    /// Process data, shown as raw bytes
    Pdo {
        direction: PdoDirection,
        /// PDO number 1..=4
        number: u8,
        node_id: u8,
        data: Vec<u8>,
    },

    Sdo { node_id: u8, event: SdoEvent },

    Heartbeat { node_id: u8, state: HeartbeatState },
}

impl DecodedEvent {
    /// Filter category this event belongs to
    pub fn category(&self) -> Category {
        match self {
            DecodedEvent::Nmt { .. } => Category::Nmt,
            DecodedEvent::Sync => Category::Sync,
            DecodedEvent::Timestamp => Category::Timestamp,
            DecodedEvent::Emcy { .. } => Category::Emcy,
            DecodedEvent::Pdo { number, .. } => Category::pdo(*number),
            DecodedEvent::Sdo { .. } => Category::Sdo,
            DecodedEvent::Heartbeat { .. } => Category::Heartbeat,
        }
    }
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedEvent::Nmt { node_id: 0, command } => write!(f, "NMT ALL {}", command),
            DecodedEvent::Nmt { node_id, command } => write!(f, "NMT {} {}", node_id, command),
            DecodedEvent::Sync => write!(f, "SYNC"),
            DecodedEvent::Timestamp => write!(f, "TIMESTAMP TODO"),
            DecodedEvent::Emcy {
                node_id,
                emergency: None,
            } => write!(f, "EMCY {} EMPTY", node_id),
            DecodedEvent::Emcy {
                node_id,
                emergency: Some(emergency),
            } => write!(f, "EMCY {} {}", node_id, emergency),
            DecodedEvent::Pdo {
                direction,
                number,
                node_id,
                data,
            } => write!(
                f,
                "{}PDO{} {} length={},data={}",
                direction.prefix(),
                number,
                node_id,
                data.len(),
                crate::format::render_hex(data)
            ),
            DecodedEvent::Sdo { node_id, event } => {
                write!(f, "{}SDO {} {}", event.direction().prefix(), node_id, event)
            }
            DecodedEvent::Heartbeat { node_id, state } => {
                write!(f, "HEARTBEAT {} {}", node_id, state)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let frame = CanFrame::new(0x581, &[0x43, 0x00, 0x10, 0x00, 0x02]);
        let raw = frame.to_wire();

        assert_eq!(&raw[0..4], &[0x81, 0x05, 0x00, 0x00]);
        assert_eq!(raw[4], 5);
        assert_eq!(&raw[5..8], &[0, 0, 0]);
        assert_eq!(&raw[8..13], &[0x43, 0x00, 0x10, 0x00, 0x02]);
        assert_eq!(CanFrame::from_wire(&raw), frame);
    }

    #[test]
    fn test_id_word_flags() {
        let frame = CanFrame::from_id_word(CAN_RTR_FLAG | 0x701, 1, &[]);
        assert!(frame.is_remote_frame);
        assert!(!frame.is_extended);
        assert_eq!(frame.can_id, 0x701);
        assert_eq!(frame.dlc(), 1);
        assert_eq!(frame.id_word(), CAN_RTR_FLAG | 0x701);

        let extended = CanFrame::from_id_word(CAN_EFF_FLAG | 0x18FF_0001, 0, &[]);
        assert!(extended.is_extended);
        assert_eq!(extended.can_id, 0x18FF_0001);
    }

    #[test]
    fn test_dlc_is_clamped() {
        let mut raw = CanFrame::new(0x181, &[1, 2, 3]).to_wire();
        raw[4] = 15;
        let frame = CanFrame::from_wire(&raw);
        assert_eq!(frame.dlc(), CAN_MAX_DLC);
        assert_eq!(frame.data(), &[1, 2, 3, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_pdo_display() {
        let event = DecodedEvent::Pdo {
            direction: PdoDirection::Receive,
            number: 2,
            node_id: 5,
            data: vec![0xde, 0xad],
        };
        assert_eq!(event.to_string(), "RPDO2 5 length=2,data=dead");
        assert_eq!(event.category(), Category::Pdo2);
    }
}
