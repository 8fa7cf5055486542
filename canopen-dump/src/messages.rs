//! Message decoders for NMT, EMCY, PDO and heartbeat frames
//!
//! SYNC and TIME STAMP carry nothing the dumper interprets, so they are
//! turned into events directly by the dumper. SDO has its own module.

use crate::descriptions::ErrorDescriptions;
use crate::types::{CanFrame, DecodedEvent, PdoDirection};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// NMT command specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmtCommand {
    Start,
    Stop,
    EnterPreoperational,
    ResetNode,
    ResetCommunication,
    Unknown(u8),
}

impl From<u8> for NmtCommand {
    fn from(cs: u8) -> Self {
        match cs {
            0x01 => NmtCommand::Start,
            0x02 => NmtCommand::Stop,
            0x80 => NmtCommand::EnterPreoperational,
            0x81 => NmtCommand::ResetNode,
            0x82 => NmtCommand::ResetCommunication,
            other => NmtCommand::Unknown(other),
        }
    }
}

impl fmt::Display for NmtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NmtCommand::Start => "start",
            NmtCommand::Stop => "stop",
            NmtCommand::EnterPreoperational => "enter-preoperational",
            NmtCommand::ResetNode => "reset-node",
            NmtCommand::ResetCommunication => "reset-communication",
            NmtCommand::Unknown(_) => "unknown",
        };
        f.write_str(text)
    }
}

/// Decoded content of a non-empty emergency frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emergency {
    pub code: u16,
    pub register: u8,
    /// Manufacturer-specific field, bytes 3..8
    pub manufacturer_error: u64,
    pub dlc: usize,
    pub text: String,
}

impl fmt::Display for Emergency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code={:#x},register={:#x},manufacturer-error={:#x},dlc={},text=\"{}\"",
            self.code, self.register, self.manufacturer_error, self.dlc, self.text
        )
    }
}

/// Node state reported by a heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Bootup,
    /// Legacy node guarding value 1
    Poll,
    Stopped,
    Operational,
    PreOperational,
    Unknown(u8),
}

impl fmt::Display for HeartbeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeartbeatState::Bootup => f.write_str("bootup"),
            HeartbeatState::Poll => f.write_str("poll"),
            HeartbeatState::Stopped => f.write_str("state=stopped"),
            HeartbeatState::Operational => f.write_str("state=operational"),
            HeartbeatState::PreOperational => f.write_str("state=pre-operational"),
            HeartbeatState::Unknown(_) => f.write_str("state=UNKNOWN"),
        }
    }
}

/// Decoders for the simple CANopen services
pub struct MessageDecoder;

impl MessageDecoder {
    /// NMT frame: byte 0 command specifier, byte 1 target node (0 = all)
    pub fn decode_nmt(frame: &CanFrame) -> DecodedEvent {
        let payload = frame.payload();
        DecodedEvent::Nmt {
            node_id: payload[1],
            command: NmtCommand::from(payload[0]),
        }
    }

    /// Emergency frame
    ///
    /// `device_type` is the node's stored object 0x1000 value; only its low
    /// 16 bits (the device profile) are used for the text lookup.
    pub fn decode_emcy(
        node_id: u8,
        frame: &CanFrame,
        device_type: u32,
        descriptions: &dyn ErrorDescriptions,
    ) -> DecodedEvent {
        if frame.dlc() == 0 {
            return DecodedEvent::Emcy {
                node_id,
                emergency: None,
            };
        }

        let payload = frame.payload();
        let code = LittleEndian::read_u16(&payload[0..2]);
        let register = payload[2];
        let manufacturer_error = LittleEndian::read_uint(&payload[3..8], 5);
        let text = descriptions.describe(code, (device_type & 0xFFFF) as u16);

        DecodedEvent::Emcy {
            node_id,
            emergency: Some(Emergency {
                code,
                register,
                manufacturer_error,
                dlc: frame.dlc(),
                text,
            }),
        }
    }

    /// Process data is passed through uninterpreted
    pub fn decode_pdo(
        direction: PdoDirection,
        number: u8,
        node_id: u8,
        frame: &CanFrame,
    ) -> DecodedEvent {
        DecodedEvent::Pdo {
            direction,
            number,
            node_id,
            data: frame.data().to_vec(),
        }
    }

    /// Heartbeat: bit 7 of byte 0 is the guarding toggle bit
    ///
    /// Bootup is the literal byte 0x00; a toggled zero state or an empty
    /// frame is not a bootup.
    pub fn decode_heartbeat(node_id: u8, frame: &CanFrame) -> DecodedEvent {
        let byte = frame.payload()[0];
        if frame.dlc() >= 1 && byte == 0x00 {
            return DecodedEvent::Heartbeat {
                node_id,
                state: HeartbeatState::Bootup,
            };
        }

        let state = match byte & 0x7F {
            0x01 => HeartbeatState::Poll,
            0x04 => HeartbeatState::Stopped,
            0x05 => HeartbeatState::Operational,
            0x7F => HeartbeatState::PreOperational,
            other => HeartbeatState::Unknown(other),
        };

        DecodedEvent::Heartbeat { node_id, state }
    }
}
