//! Frame sources (trace file replay, TCP stream, SocketCAN)
//!
//! Each source is an iterator over timestamped frames. End of input ends the
//! iterator; a failing read yields one `Err` item.

use crate::types::{Result, TimestampedFrame};

pub mod tcp;
pub mod trace;
#[cfg(feature = "socketcan")]
pub mod can;

// Re-export source types
pub use tcp::TcpSource;
pub use trace::{TraceReader, TraceWriter, TRACE_RECORD_SIZE};
#[cfg(feature = "socketcan")]
pub use can::CanSource;

/// Common trait for all frame sources
///
/// `open` takes the source address: a file path, a `host:port` endpoint or a
/// CAN interface name, depending on the source.
pub trait FrameSource: Iterator<Item = Result<TimestampedFrame>> + Sized {
    fn open(address: &str) -> Result<Self>;
}
