//! Trace file replay
//!
//! A trace file is a plain sequence of fixed-size records, no header:
//!
//! | Offset | Size | Content                                    |
//! |--------|------|--------------------------------------------|
//! | 0      | 8    | timestamp, microseconds, little endian     |
//! | 8      | 16   | SocketCAN `struct can_frame`               |
//!
//! A truncated record at the end of the file is treated as end of input.

use super::FrameSource;
use crate::types::{CanFrame, DumpError, Result, TimestampedFrame, CAN_FRAME_WIRE_SIZE};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Size of one trace record in bytes
pub const TRACE_RECORD_SIZE: usize = 8 + CAN_FRAME_WIRE_SIZE;

/// Reads timestamped frames from a trace stream
pub struct TraceReader<R: Read> {
    reader: R,
    records: u64,
    finished: bool,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file for replay
    pub fn open_path(path: &Path) -> Result<Self> {
        log::info!("Replaying trace file: {:?}", path);

        let file = File::open(path).map_err(|cause| DumpError::SourceOpen {
            address: path.display().to_string(),
            cause,
        })?;

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            records: 0,
            finished: false,
        }
    }

    /// Number of complete records read so far
    pub fn records(&self) -> u64 {
        self.records
    }

    fn read_record(&mut self) -> io::Result<TimestampedFrame> {
        let timestamp_us = self.reader.read_u64::<LittleEndian>()?;
        let mut raw = [0u8; CAN_FRAME_WIRE_SIZE];
        self.reader.read_exact(&mut raw)?;
        Ok(TimestampedFrame::new(timestamp_us, CanFrame::from_wire(&raw)))
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<TimestampedFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_record() {
            Ok(record) => {
                self.records += 1;
                Some(Ok(record))
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!("Trace ended after {} records", self.records);
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

impl FrameSource for TraceReader<BufReader<File>> {
    fn open(address: &str) -> Result<Self> {
        Self::open_path(Path::new(address))
    }
}

/// Writes timestamped frames in the trace record layout
pub struct TraceWriter<W: Write> {
    writer: W,
}

impl TraceWriter<BufWriter<File>> {
    /// Create (or truncate) a trace file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|cause| DumpError::SourceOpen {
            address: path.display().to_string(),
            cause,
        })?;

        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write(&mut self, record: &TimestampedFrame) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(record.timestamp_us)?;
        self.writer.write_all(&record.frame.to_wire())?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
