//! SDO transfer decoding
//!
//! Requests (RSDO, client to server) and responses (TSDO, server to client)
//! share one state record per node. A segmented transfer is opened by an
//! initiate frame, collects the data of every segment frame and is closed by
//! the last segment or by an abort from either side.
//!
//! Command byte layout:
//! - bits 7..5: command specifier
//! - initiate frames: bits 3..2 unused byte count `n`, bit 1 expedited,
//!   bit 0 size indicated; index in bytes 1..3, subindex in byte 3, data or
//!   size from byte 4
//! - segment frames: bit 0 last segment, data from byte 1

use crate::descriptions::abort_reason;
use crate::dictionary::{sdo_mux, DataType, ObjectDictionary};
use crate::format::{quote, render_hex};
use crate::node_state::NodeState;
use crate::types::{CanFrame, CAN_MAX_DLC};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Offset of expedited data and of the announced size in initiate frames
pub const SDO_EXPEDITED_DATA_IDX: usize = 4;
/// Offset of the data in segment frames
pub const SDO_SEGMENT_IDX: usize = 1;

/// Object dictionary entry holding the device type
const DEVICE_TYPE_INDEX: u16 = 0x1000;
const DEVICE_TYPE_SUBINDEX: u8 = 0;

/// Decode up to eight little-endian bytes into an integer
pub fn decode_int(bytes: &[u8]) -> u64 {
    match bytes.len() {
        0 => 0,
        len => LittleEndian::read_uint(bytes, len.min(8)),
    }
}

/// Which side of the SDO channel sent a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdoDirection {
    /// Client to server, COB-ID 0x600 + node
    Request,
    /// Server to client, COB-ID 0x580 + node
    Response,
}

impl SdoDirection {
    pub fn prefix(&self) -> char {
        match self {
            SdoDirection::Request => 'R',
            SdoDirection::Response => 'T',
        }
    }
}

/// Client command specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    DownloadSegment,
    InitiateDownload,
    InitiateUpload,
    UploadSegment,
    Abort,
    Unknown(u8),
}

impl From<u8> for ClientCommand {
    fn from(command_byte: u8) -> Self {
        match command_byte >> 5 {
            0 => ClientCommand::DownloadSegment,
            1 => ClientCommand::InitiateDownload,
            2 => ClientCommand::InitiateUpload,
            3 => ClientCommand::UploadSegment,
            4 => ClientCommand::Abort,
            other => ClientCommand::Unknown(other),
        }
    }
}

/// Server command specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    UploadSegment,
    DownloadSegment,
    InitiateUpload,
    InitiateDownload,
    Abort,
    Unknown(u8),
}

impl From<u8> for ServerCommand {
    fn from(command_byte: u8) -> Self {
        match command_byte >> 5 {
            0 => ServerCommand::UploadSegment,
            1 => ServerCommand::DownloadSegment,
            2 => ServerCommand::InitiateUpload,
            3 => ServerCommand::InitiateDownload,
            4 => ServerCommand::Abort,
            other => ServerCommand::Unknown(other),
        }
    }
}

/// Rendered SDO payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdoValue {
    /// Shown as a hex dump
    Hex(Vec<u8>),
    /// VISIBLE_STRING data, shown quoted
    Text(Vec<u8>),
}

impl SdoValue {
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            SdoValue::Hex(bytes) | SdoValue::Text(bytes) => bytes,
        }
    }
}

impl fmt::Display for SdoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdoValue::Hex(bytes) => f.write_str(&render_hex(bytes)),
            SdoValue::Text(bytes) => f.write_str(&quote(bytes)),
        }
    }
}

/// How an initiate frame announces its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiateTransfer {
    /// All data is in the initiate frame
    Expedited(SdoValue),
    /// Data follows in segments; the total size is known if announced
    Segmented { size: Option<u32> },
}

/// Data carried by one segment frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub end: bool,
    pub data: SdoValue,
    /// Complete value of the transfer, set on the last segment
    pub final_data: Option<SdoValue>,
}

/// One decoded SDO frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdoEvent {
    InitiateDownload {
        index: u16,
        subindex: u8,
        transfer: InitiateTransfer,
    },
    DownloadSegment(Segment),
    InitiateUploadRequest {
        index: u16,
        subindex: u8,
    },
    UploadSegmentRequest,
    InitiateUpload {
        index: u16,
        subindex: u8,
        transfer: InitiateTransfer,
    },
    UploadSegment(Segment),
    InitiateDownloadResponse,
    DownloadSegmentResponse {
        end: bool,
    },
    Abort {
        direction: SdoDirection,
        index: u16,
        subindex: u8,
        code: u32,
        reason: &'static str,
    },
    UnknownCommand {
        direction: SdoDirection,
        specifier: u8,
    },
}

impl SdoEvent {
    pub fn direction(&self) -> SdoDirection {
        match self {
            SdoEvent::InitiateDownload { .. }
            | SdoEvent::DownloadSegment(_)
            | SdoEvent::InitiateUploadRequest { .. }
            | SdoEvent::UploadSegmentRequest => SdoDirection::Request,
            SdoEvent::InitiateUpload { .. }
            | SdoEvent::UploadSegment(_)
            | SdoEvent::InitiateDownloadResponse
            | SdoEvent::DownloadSegmentResponse { .. } => SdoDirection::Response,
            SdoEvent::Abort { direction, .. } | SdoEvent::UnknownCommand { direction, .. } => {
                *direction
            }
        }
    }
}

fn fmt_initiate(
    f: &mut fmt::Formatter<'_>,
    operation: &str,
    index: u16,
    subindex: u8,
    transfer: &InitiateTransfer,
) -> fmt::Result {
    let kind = match transfer {
        InitiateTransfer::Expedited(_) => "expedited",
        InitiateTransfer::Segmented { .. } => "segment",
    };
    write!(f, "init-{}-{} index={:x},subindex={}", operation, kind, index, subindex)?;

    match transfer {
        InitiateTransfer::Expedited(value) => write!(f, ",size={},data={}", value.len(), value),
        InitiateTransfer::Segmented { size: Some(size) } => write!(f, ",size={}", size),
        InitiateTransfer::Segmented { size: None } => Ok(()),
    }
}

fn fmt_segment(f: &mut fmt::Formatter<'_>, operation: &str, segment: &Segment) -> fmt::Result {
    write!(
        f,
        "{}-segment{} size={},data={}",
        operation,
        if segment.end { "-end" } else { "" },
        segment.data.len(),
        segment.data
    )?;

    if let Some(final_data) = &segment.final_data {
        write!(f, ",final-size={},final-data={}", final_data.len(), final_data)?;
    }
    Ok(())
}

impl fmt::Display for SdoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdoEvent::InitiateDownload {
                index,
                subindex,
                transfer,
            } => fmt_initiate(f, "download", *index, *subindex, transfer),
            SdoEvent::DownloadSegment(segment) => fmt_segment(f, "download", segment),
            SdoEvent::InitiateUploadRequest { index, subindex } => {
                write!(f, "init-upload-segment index={:x},subindex={}", index, subindex)
            }
            SdoEvent::UploadSegmentRequest => f.write_str("upload-segment"),
            SdoEvent::InitiateUpload {
                index,
                subindex,
                transfer,
            } => fmt_initiate(f, "upload", *index, *subindex, transfer),
            SdoEvent::UploadSegment(segment) => fmt_segment(f, "upload", segment),
            SdoEvent::InitiateDownloadResponse => f.write_str("init-download-segment"),
            SdoEvent::DownloadSegmentResponse { end } => {
                write!(f, "download-segment{}", if *end { "-end" } else { "" })
            }
            SdoEvent::Abort {
                index,
                subindex,
                reason,
                ..
            } => write!(f, "abort index={:x},subindex={},reason=\"{}\"", index, subindex, reason),
            SdoEvent::UnknownCommand { .. } => f.write_str("unknown-command-specifier"),
        }
    }
}

/// Fields of an initiate frame
struct InitiateHeader {
    index: u16,
    subindex: u8,
    expedited: bool,
    size_indicated: bool,
    /// Number of bytes in the expedited data area that carry no data
    unused: usize,
}

impl InitiateHeader {
    fn parse(frame: &CanFrame) -> Self {
        let payload = frame.payload();
        let command = payload[0];

        Self {
            index: LittleEndian::read_u16(&payload[1..3]),
            subindex: payload[3],
            expedited: command & 0x02 != 0,
            size_indicated: command & 0x01 != 0,
            unused: usize::from((command >> 2) & 0x03),
        }
    }

    fn expedited_size(&self, frame: &CanFrame) -> usize {
        let max_size = frame.dlc().saturating_sub(SDO_EXPEDITED_DATA_IDX);
        if self.size_indicated {
            (4 - self.unused).min(max_size)
        } else {
            max_size
        }
    }

    /// Total size announced by a segmented initiate frame
    fn announced_size(&self, frame: &CanFrame) -> Option<u32> {
        if self.size_indicated && frame.dlc() == CAN_MAX_DLC {
            Some(LittleEndian::read_u32(&frame.payload()[SDO_EXPEDITED_DATA_IDX..]))
        } else {
            None
        }
    }
}

/// Decoder for SDO frames in both directions
pub struct SdoDecoder;

impl SdoDecoder {
    /// Decode a client request (RSDO)
    ///
    /// `state` is `None` only for node ids without a state record; decoding
    /// still succeeds, without reassembly.
    pub fn decode_request(
        state: Option<&mut NodeState>,
        dictionary: &dyn ObjectDictionary,
        frame: &CanFrame,
    ) -> SdoEvent {
        match ClientCommand::from(frame.payload()[0]) {
            ClientCommand::InitiateDownload => {
                let (index, subindex, transfer) = Self::initiate(state, frame);
                SdoEvent::InitiateDownload {
                    index,
                    subindex,
                    transfer,
                }
            }
            ClientCommand::DownloadSegment => {
                SdoEvent::DownloadSegment(Self::segment(state, dictionary, frame))
            }
            ClientCommand::InitiateUpload => {
                let header = InitiateHeader::parse(frame);
                SdoEvent::InitiateUploadRequest {
                    index: header.index,
                    subindex: header.subindex,
                }
            }
            ClientCommand::UploadSegment => SdoEvent::UploadSegmentRequest,
            ClientCommand::Abort => Self::abort(SdoDirection::Request, state, frame),
            ClientCommand::Unknown(specifier) => SdoEvent::UnknownCommand {
                direction: SdoDirection::Request,
                specifier,
            },
        }
    }

    /// Decode a server response (TSDO)
    pub fn decode_response(
        state: Option<&mut NodeState>,
        dictionary: &dyn ObjectDictionary,
        frame: &CanFrame,
    ) -> SdoEvent {
        match ServerCommand::from(frame.payload()[0]) {
            ServerCommand::InitiateUpload => {
                let (index, subindex, transfer) = Self::initiate(state, frame);
                SdoEvent::InitiateUpload {
                    index,
                    subindex,
                    transfer,
                }
            }
            ServerCommand::UploadSegment => {
                SdoEvent::UploadSegment(Self::segment(state, dictionary, frame))
            }
            ServerCommand::InitiateDownload => SdoEvent::InitiateDownloadResponse,
            ServerCommand::DownloadSegment => SdoEvent::DownloadSegmentResponse {
                end: frame.payload()[0] & 0x01 != 0,
            },
            ServerCommand::Abort => Self::abort(SdoDirection::Response, state, frame),
            ServerCommand::Unknown(specifier) => SdoEvent::UnknownCommand {
                direction: SdoDirection::Response,
                specifier,
            },
        }
    }

    /// Initiate download request or initiate upload response
    fn initiate(state: Option<&mut NodeState>, frame: &CanFrame) -> (u16, u8, InitiateTransfer) {
        let header = InitiateHeader::parse(frame);

        if header.expedited {
            let size = header.expedited_size(frame);
            let data = &frame.payload()[SDO_EXPEDITED_DATA_IDX..SDO_EXPEDITED_DATA_IDX + size];

            if header.index == DEVICE_TYPE_INDEX && header.subindex == DEVICE_TYPE_SUBINDEX {
                if let Some(state) = state {
                    state.device_type = decode_int(&data[..size.min(4)]) as u32;
                    log::debug!("Device type learned: {:#x}", state.device_type);
                }
            }

            let transfer = InitiateTransfer::Expedited(SdoValue::Hex(data.to_vec()));
            return (header.index, header.subindex, transfer);
        }

        let size = header.announced_size(frame);
        if let Some(state) = state {
            state.open_transfer(
                sdo_mux(header.index, header.subindex),
                size.map(|s| s as usize),
            );
        }

        (header.index, header.subindex, InitiateTransfer::Segmented { size })
    }

    /// Download segment request or upload segment response
    fn segment(
        state: Option<&mut NodeState>,
        dictionary: &dyn ObjectDictionary,
        frame: &CanFrame,
    ) -> Segment {
        let end = frame.payload()[0] & 0x01 != 0;
        let data = frame.data().get(SDO_SEGMENT_IDX..).unwrap_or_default();

        match state {
            Some(state) if state.is_transfer_open() => {
                state.sdo_data.extend_from_slice(data);

                let value = Self::render(state, dictionary, data);
                let final_data = end.then(|| Self::render(state, dictionary, &state.sdo_data));

                if end {
                    state.close_transfer();
                }

                Segment {
                    end,
                    data: value,
                    final_data,
                }
            }
            _ => {
                log::warn!("SDO segment without an open transfer, shown on its own");
                Segment {
                    end,
                    data: SdoValue::Hex(data.to_vec()),
                    final_data: end.then(|| SdoValue::Hex(data.to_vec())),
                }
            }
        }
    }

    fn abort(direction: SdoDirection, state: Option<&mut NodeState>, frame: &CanFrame) -> SdoEvent {
        let header = InitiateHeader::parse(frame);
        let code = LittleEndian::read_u32(&frame.payload()[SDO_EXPEDITED_DATA_IDX..]);

        if let Some(state) = state {
            state.close_transfer();
        }

        SdoEvent::Abort {
            direction,
            index: header.index,
            subindex: header.subindex,
            code,
            reason: abort_reason(code),
        }
    }

    /// Render bytes according to the type of the node's active multiplexer
    fn render(state: &NodeState, dictionary: &dyn ObjectDictionary, data: &[u8]) -> SdoValue {
        match dictionary.type_of(state.current_mux) {
            DataType::VisibleString => SdoValue::Text(data.to_vec()),
            DataType::Other => SdoValue::Hex(data.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::StandardDictionary;

    fn request(state: &mut NodeState, data: &[u8]) -> SdoEvent {
        SdoDecoder::decode_request(Some(state), &StandardDictionary::new(), &CanFrame::new(0x605, data))
    }

    fn response(state: &mut NodeState, data: &[u8]) -> SdoEvent {
        SdoDecoder::decode_response(Some(state), &StandardDictionary::new(), &CanFrame::new(0x585, data))
    }

    #[test]
    fn test_decode_int() {
        assert_eq!(decode_int(&[]), 0);
        assert_eq!(decode_int(&[0x92, 0x01]), 0x192);
        assert_eq!(decode_int(&[0x02, 0x00, 0x00, 0x00]), 2);
    }

    #[test]
    fn test_command_specifiers() {
        assert_eq!(ClientCommand::from(0x23), ClientCommand::InitiateDownload);
        assert_eq!(ClientCommand::from(0x40), ClientCommand::InitiateUpload);
        assert_eq!(ClientCommand::from(0x60), ClientCommand::UploadSegment);
        assert_eq!(ClientCommand::from(0x80), ClientCommand::Abort);
        assert_eq!(ClientCommand::from(0xA0), ClientCommand::Unknown(5));
        assert_eq!(ServerCommand::from(0x43), ServerCommand::InitiateUpload);
        assert_eq!(ServerCommand::from(0x60), ServerCommand::InitiateDownload);
        assert_eq!(ServerCommand::from(0x20), ServerCommand::DownloadSegment);
        assert_eq!(ServerCommand::from(0xE0), ServerCommand::Unknown(7));
    }

    #[test]
    fn test_expedited_download() {
        let mut state = NodeState::default();
        // 2 data bytes indicated: n = 2
        let event = request(&mut state, &[0x2B, 0x17, 0x10, 0x00, 0xE8, 0x03, 0x00, 0x00]);

        assert_eq!(event.to_string(), "init-download-expedited index=1017,subindex=0,size=2,data=e803");
        assert!(!state.is_transfer_open());
    }

    #[test]
    fn test_expedited_size_without_indication() {
        let mut state = NodeState::default();
        let event = request(&mut state, &[0x22, 0x00, 0x20, 0x01, 0xAA, 0xBB, 0xCC]);
        assert_eq!(event.to_string(), "init-download-expedited index=2000,subindex=1,size=3,data=aabbcc");
    }

    #[test]
    fn test_expedited_size_clipped_to_dlc() {
        let mut state = NodeState::default();
        // Claims 4 bytes but the frame only carries 2
        let event = request(&mut state, &[0x23, 0x00, 0x20, 0x01, 0xAA, 0xBB]);
        assert_eq!(event.to_string(), "init-download-expedited index=2000,subindex=1,size=2,data=aabb");
    }

    #[test]
    fn test_short_initiate_frame() {
        let mut state = NodeState::default();
        let event = request(&mut state, &[0x22, 0x00]);
        assert_eq!(event.to_string(), "init-download-expedited index=0,subindex=0,size=0,data=");
    }

    #[test]
    fn test_device_type_from_expedited_upload() {
        let mut state = NodeState::default();
        let event = response(&mut state, &[0x43, 0x00, 0x10, 0x00, 0x92, 0x01, 0x02, 0x00]);

        assert_eq!(state.device_type, 0x0002_0192);
        assert_eq!(event.to_string(), "init-upload-expedited index=1000,subindex=0,size=4,data=92010200");
    }

    #[test]
    fn test_short_device_type_payload() {
        let mut state = NodeState {
            device_type: 0xFFFF_FFFF,
            ..NodeState::default()
        };
        // Two bytes indicated: n = 2
        response(&mut state, &[0x4B, 0x00, 0x10, 0x00, 0x91, 0x01, 0xEE, 0xEE]);
        assert_eq!(state.device_type, 0x191);
    }

    #[test]
    fn test_segmented_upload_of_visible_string() {
        let mut state = NodeState::default();

        let event = response(&mut state, &[0x41, 0x08, 0x10, 0x00, 0x0A, 0x00, 0x00, 0x00]);
        assert_eq!(event.to_string(), "init-upload-segment index=1008,subindex=0,size=10");
        assert_eq!(state.current_mux, sdo_mux(0x1008, 0));

        let event = response(&mut state, &[0x00, b'C', b'A', b'N', b'o', b'p', b'e', b'n']);
        assert_eq!(event.to_string(), "upload-segment size=7,data=\"CANopen\"");

        let event = response(&mut state, &[0x1B, b' ', b'I', b'O']);
        assert_eq!(
            event.to_string(),
            "upload-segment-end size=3,data=\" IO\",final-size=10,final-data=\"CANopen IO\""
        );
        assert!(!state.is_transfer_open());
    }

    #[test]
    fn test_segmented_initiate_without_size() {
        let mut state = NodeState::default();
        state.sdo_data.extend_from_slice(&[1, 2, 3]);

        let event = request(&mut state, &[0x20, 0x00, 0x20, 0x00]);
        assert_eq!(event.to_string(), "init-download-segment index=2000,subindex=0");
        assert!(state.is_transfer_open());
        assert!(state.sdo_data.is_empty());
    }

    #[test]
    fn test_segment_without_open_transfer() {
        let mut state = NodeState::default();
        state.sdo_data.extend_from_slice(&[9, 9]);

        let event = request(&mut state, &[0x05, 0x01, 0x02]);
        assert_eq!(
            event.to_string(),
            "download-segment-end size=2,data=0102,final-size=2,final-data=0102"
        );
        assert_eq!(state.sdo_data, vec![9, 9]);
        assert!(!state.is_transfer_open());
    }

    #[test]
    fn test_segment_without_state() {
        let dictionary = StandardDictionary::new();
        let frame = CanFrame::new(0x585, &[0x00, 0xAB]);
        let event = SdoDecoder::decode_response(None, &dictionary, &frame);
        assert_eq!(event.to_string(), "upload-segment size=1,data=ab");
    }

    #[test]
    fn test_abort_closes_transfer() {
        let mut state = NodeState::default();
        request(&mut state, &[0x21, 0x00, 0x20, 0x00, 0x20, 0x00, 0x00, 0x00]);
        assert!(state.is_transfer_open());

        let event = response(&mut state, &[0x80, 0x00, 0x20, 0x00, 0x00, 0x00, 0x02, 0x06]);
        assert_eq!(event.direction(), SdoDirection::Response);
        assert_eq!(
            event.to_string(),
            "abort index=2000,subindex=0,reason=\"Object does not exist in the object dictionary\""
        );
        assert!(!state.is_transfer_open());
    }

    #[test]
    fn test_client_abort_closes_transfer() {
        let mut state = NodeState::default();
        response(&mut state, &[0x41, 0x08, 0x10, 0x00, 0x0A, 0x00, 0x00, 0x00]);
        assert!(state.is_transfer_open());

        let event = request(&mut state, &[0x80, 0x08, 0x10, 0x00, 0x00, 0x00, 0x04, 0x05]);
        assert_eq!(event.direction(), SdoDirection::Request);
        assert_eq!(
            event.to_string(),
            "abort index=1008,subindex=0,reason=\"SDO protocol timed out\""
        );
        assert!(!state.is_transfer_open());
    }

    #[test]
    fn test_dataless_frames() {
        let mut state = NodeState::default();
        assert_eq!(
            request(&mut state, &[0x40, 0x08, 0x10, 0x00]).to_string(),
            "init-upload-segment index=1008,subindex=0"
        );
        assert_eq!(request(&mut state, &[0x60]).to_string(), "upload-segment");
        assert_eq!(response(&mut state, &[0x60, 0x00, 0x20]).to_string(), "init-download-segment");
        assert_eq!(response(&mut state, &[0x21]).to_string(), "download-segment-end");
        assert_eq!(response(&mut state, &[0x30]).to_string(), "download-segment");
        assert_eq!(state, NodeState::default());
    }

    #[test]
    fn test_unknown_specifier_keeps_state() {
        let mut state = NodeState::default();
        request(&mut state, &[0x21, 0x00, 0x20, 0x00, 0x20, 0x00, 0x00, 0x00]);
        let before = state.clone();

        let event = request(&mut state, &[0xC0, 0x00, 0x20, 0x00]);
        assert_eq!(event.direction(), SdoDirection::Request);
        assert_eq!(event.to_string(), "unknown-command-specifier");
        assert_eq!(state, before);
    }
}
