//! TCP frame stream
//!
//! The peer sends bare SocketCAN `struct can_frame` records back to back.
//! Frames carry no timestamp on the wire, so they are stamped on receipt.

use super::FrameSource;
use crate::types::{CanFrame, DumpError, Result, TimestampedFrame, CAN_FRAME_WIRE_SIZE};
use std::io::{self, BufReader, Read};
use std::net::TcpStream;

/// Frames received from a TCP peer
pub struct TcpSource<R: Read = TcpStream> {
    reader: BufReader<R>,
    finished: bool,
}

impl<R: Read> TcpSource<R> {
    /// Read frames from an already connected stream
    pub fn from_stream(stream: R) -> Self {
        Self {
            reader: BufReader::new(stream),
            finished: false,
        }
    }
}

impl<R: Read> Iterator for TcpSource<R> {
    type Item = Result<TimestampedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut raw = [0u8; CAN_FRAME_WIRE_SIZE];
        match self.reader.read_exact(&mut raw) {
            Ok(()) => Some(Ok(TimestampedFrame::now(CanFrame::from_wire(&raw)))),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!("TCP peer closed the connection");
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(DumpError::IoError(e)))
            }
        }
    }
}

impl FrameSource for TcpSource<TcpStream> {
    /// Connect to `host:port`
    fn open(address: &str) -> Result<Self> {
        log::info!("Connecting to {}", address);

        let stream = TcpStream::connect(address).map_err(|cause| DumpError::SourceOpen {
            address: address.to_string(),
            cause,
        })?;

        Ok(Self::from_stream(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_frames_from_stream() {
        let mut bytes = CanFrame::new(0x080, &[]).to_wire().to_vec();
        bytes.extend_from_slice(&CanFrame::new(0x181, &[1, 2]).to_wire());
        // Trailing partial frame is dropped
        bytes.extend_from_slice(&[0xAA; 5]);

        let frames: Vec<_> = TcpSource::from_stream(Cursor::new(bytes))
            .map(|r| r.unwrap().frame)
            .collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].can_id, 0x080);
        assert_eq!(frames[1].data(), &[1, 2]);
    }

    #[test]
    fn test_connect_and_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(&CanFrame::new(0x705, &[0x05]).to_wire()).unwrap();
        });

        let source = TcpSource::<TcpStream>::open(&address).unwrap();
        let records: Vec<_> = source.map(|r| r.unwrap()).collect();
        server.join().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].frame.can_id, 0x705);
        assert!(records[0].timestamp_us > 0);
    }
}
