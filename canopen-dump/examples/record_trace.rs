//! Write a short demo trace and dump it with statistics
//!
//! Usage:
//!   record_trace <output.trace>
//!
//! The trace holds a boot sequence of one drive (node 5): bootup heartbeat,
//! NMT start, a device type upload, a segmented device name upload and an
//! emergency. Replay it later with `canopen-dump-cli --file <output.trace>`.

use canopen_dump::{CanFrame, DumpOptions, Dumper, TimestampedFrame, TraceReader, TraceWriter};
use std::env;
use std::path::PathBuf;

fn demo_frames() -> Vec<CanFrame> {
    vec![
        CanFrame::new(0x705, &[0x00]),
        CanFrame::new(0x000, &[0x01, 0x05]),
        CanFrame::new(0x605, &[0x40, 0x00, 0x10, 0x00, 0, 0, 0, 0]),
        CanFrame::new(0x585, &[0x43, 0x00, 0x10, 0x00, 0x92, 0x01, 0x02, 0x00]),
        CanFrame::new(0x605, &[0x40, 0x08, 0x10, 0x00, 0, 0, 0, 0]),
        CanFrame::new(0x585, &[0x41, 0x08, 0x10, 0x00, 0x09, 0, 0, 0]),
        CanFrame::new(0x605, &[0x60, 0, 0, 0, 0, 0, 0, 0]),
        CanFrame::new(0x585, &[0x00, b'S', b'e', b'r', b'v', b'o', b' ', b'X']),
        CanFrame::new(0x605, &[0x70, 0, 0, 0, 0, 0, 0, 0]),
        CanFrame::new(0x585, &[0x1B, b'2', b'0']),
        CanFrame::new(0x705, &[0x05]),
        CanFrame::new(0x085, &[0x10, 0x43, 0x08, 0, 0, 0, 0, 0]),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <output.trace>", args[0]);
        std::process::exit(1);
    }
    let path = PathBuf::from(&args[1]);

    // Frames 10 ms apart
    let mut writer = TraceWriter::create(&path)?;
    let start_us = 1_700_000_000_000_000u64;
    for (i, frame) in demo_frames().into_iter().enumerate() {
        writer.write(&TimestampedFrame::new(start_us + i as u64 * 10_000, frame))?;
    }
    writer.finish()?;
    println!("Wrote {:?}\n", path);

    let mut dumper = Dumper::new(DumpOptions::PRINT_TIMESTAMPS);
    let stats = dumper.dump(TraceReader::open_path(&path)?, std::io::stdout().lock())?;

    println!("\n=== DUMP SUMMARY ===");
    println!("Frames read: {}", stats.frames);
    println!("Lines printed: {}", stats.printed);
    println!("Unclassified frames: {}", stats.unclassified);
    if let Some(node) = dumper.node(5) {
        println!("Node 5 device type: {:#010x}", node.device_type);
    }

    Ok(())
}
