//! CANopen Dump Library
//!
//! A passive decoder for CANopen bus traffic. Frames are read from a live
//! SocketCAN interface, a TCP stream or a recorded trace file and printed as
//! one human-readable line per message.
//!
//! # Architecture
//!
//! - Frame sources yield timestamped raw frames ([`sources`])
//! - The classifier maps a CAN id to a CANopen object and node ([`classify`])
//! - The [`Dumper`] decodes each frame, keeping per-node state for SDO
//!   reassembly and device type lookups
//! - The formatter renders one line per shown event ([`format`])
//!
//! The library never transmits on the bus.
//!
//! # Example Usage
//!
//! ```no_run
//! use canopen_dump::{DumpOptions, Dumper, TraceReader};
//! use std::path::Path;
//!
//! let trace = TraceReader::open_path(Path::new("capture.trace")).unwrap();
//! let mut dumper = Dumper::new(DumpOptions::SDO | DumpOptions::EMCY);
//! let stats = dumper.dump(trace, std::io::stdout().lock()).unwrap();
//! println!("{} frames", stats.frames);
//! ```

// Public modules
pub mod classify;
pub mod descriptions;
pub mod dictionary;
pub mod dumper;
pub mod format;
pub mod messages;
pub mod node_state;
pub mod options;
pub mod sdo;
pub mod sources;
pub mod types;

// Re-export main types for convenience
pub use descriptions::{ErrorDescriptions, StandardDescriptions};
pub use dictionary::{DataType, ObjectDictionary, StandardDictionary};
pub use dumper::{DumpStats, Dumper};
pub use options::{Category, DumpOptions, SourceKind};
pub use sources::{FrameSource, TcpSource, TraceReader, TraceWriter, TRACE_RECORD_SIZE};
pub use types::{CanFrame, DecodedEvent, DumpError, Result, TimestampedFrame};

#[cfg(feature = "socketcan")]
pub use sources::CanSource;

use std::fs::File;
use std::io::{BufReader, Write};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dump the source at `address` to stdout
///
/// `address` is an interface name, a `host:port` endpoint or a trace file
/// path, as selected by the source bits of `options`. Returns 0 once the
/// source reaches end of input and 1 when it cannot be opened or stdout
/// fails.
pub fn run(address: &str, options: DumpOptions) -> i32 {
    let stdout = std::io::stdout();
    match dump_to(address, options, stdout.lock()) {
        Ok(_) => 0,
        Err(e) => {
            log::error!("{}", e);
            1
        }
    }
}

/// Open the source selected by `options` and dump it into `out`
pub fn dump_to<W: Write>(address: &str, options: DumpOptions, out: W) -> Result<DumpStats> {
    match options.source_kind() {
        SourceKind::File => dump_source::<TraceReader<BufReader<File>>, W>(address, options, out),
        SourceKind::Tcp => dump_source::<TcpSource, W>(address, options, out),
        SourceKind::Can => dump_can(address, options, out),
    }
}

fn dump_source<S: FrameSource, W: Write>(
    address: &str,
    options: DumpOptions,
    out: W,
) -> Result<DumpStats> {
    let source = S::open(address)?;
    Dumper::new(options).dump(source, out)
}

#[cfg(feature = "socketcan")]
fn dump_can<W: Write>(address: &str, options: DumpOptions, out: W) -> Result<DumpStats> {
    dump_source::<CanSource, W>(address, options, out)
}

#[cfg(not(feature = "socketcan"))]
fn dump_can<W: Write>(address: &str, _options: DumpOptions, _out: W) -> Result<DumpStats> {
    Err(DumpError::UnsupportedSource(format!(
        "{} (built without SocketCAN support)",
        address
    )))
}
