//! Live capture from a SocketCAN interface

use super::FrameSource;
use crate::types::{CanFrame, DumpError, Result, TimestampedFrame};
use socketcan::{CanSocket, EmbeddedFrame, Frame, Socket};

/// Frames read from a raw CAN socket bound to one interface
pub struct CanSource {
    socket: CanSocket,
}

impl Iterator for CanSource {
    type Item = Result<TimestampedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.socket.read_frame() {
            Ok(frame) => {
                let dlc = EmbeddedFrame::dlc(&frame) as u8;
                let frame = CanFrame::from_id_word(frame.id_word(), dlc, frame.data());
                Some(Ok(TimestampedFrame::now(frame)))
            }
            Err(e) => Some(Err(DumpError::IoError(e))),
        }
    }
}

impl FrameSource for CanSource {
    /// Bind to the named interface, e.g. `can0`
    fn open(address: &str) -> Result<Self> {
        log::info!("Opening CAN interface {}", address);

        let socket = CanSocket::open(address).map_err(|cause| DumpError::SourceOpen {
            address: address.to_string(),
            cause,
        })?;

        Ok(Self { socket })
    }
}
