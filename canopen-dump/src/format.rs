//! Output formatting
//!
//! One line per decoded message:
//! `[<seconds>.<microseconds> ]<message>[ [RTR]]`

use crate::types::{DecodedEvent, TimestampedFrame};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Render bytes as contiguous lowercase hex, e.g. `0a1b2c`
pub fn render_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        // Writing into a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Render bytes as a double-quoted string; invalid UTF-8 is replaced
pub fn quote(data: &[u8]) -> String {
    format!("\"{}\"", String::from_utf8_lossy(data))
}

/// Writes decoded events as text lines to an output stream
pub struct LineWriter<W: Write> {
    out: W,
    print_timestamps: bool,
}

impl<W: Write> LineWriter<W> {
    pub fn new(out: W, print_timestamps: bool) -> Self {
        Self {
            out,
            print_timestamps,
        }
    }

    /// Write one event decoded from `frame`
    pub fn write_event(&mut self, frame: &TimestampedFrame, event: &DecodedEvent) -> io::Result<()> {
        if self.print_timestamps {
            write!(
                self.out,
                "{}.{:06} ",
                frame.timestamp_us / 1_000_000,
                frame.timestamp_us % 1_000_000
            )?;
        }

        write!(self.out, "{}", event)?;

        if frame.frame.is_remote_frame {
            write!(self.out, " [RTR]")?;
        }

        writeln!(self.out)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
