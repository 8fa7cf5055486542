//! CANopen Dump CLI Application
//!
//! Command-line front end for the canopen-dump library: parses flags, merges
//! an optional TOML config file and prints decoded bus traffic to stdout.
//! Logs go to stderr.

use anyhow::Result;
use canopen_dump::{Category, DumpOptions, SourceKind};
use clap::Parser;
use std::path::PathBuf;

mod config;

/// CANopen Dump - Print decoded CANopen traffic
#[derive(Parser, Debug)]
#[command(name = "canopen-dump")]
#[command(
    about = "Decode CANopen traffic from a CAN interface, a TCP stream or a trace file",
    long_about = None
)]
#[command(version)]
struct Args {
    /// CAN interface name, host:port endpoint or trace file path
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Prefix each line with the capture timestamp
    #[arg(short, long)]
    timestamp: bool,

    /// Read can_frame records from a TCP endpoint
    #[arg(long, conflicts_with = "file")]
    tcp: bool,

    /// Replay a recorded trace file
    #[arg(short, long)]
    file: bool,

    /// Show NMT commands
    #[arg(long)]
    nmt: bool,

    /// Show SYNC messages
    #[arg(long)]
    sync: bool,

    /// Show TIME STAMP messages
    #[arg(long)]
    time: bool,

    /// Show emergency messages
    #[arg(long)]
    emcy: bool,

    /// Show PDO number N (1-4, can be repeated)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=4))]
    pdo: Vec<u8>,

    /// Show SDO transfers
    #[arg(long)]
    sdo: bool,

    /// Show heartbeat messages
    #[arg(long)]
    heartbeat: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Option bits selected on the command line
    fn options(&self) -> DumpOptions {
        let categories = [
            (self.nmt, Category::Nmt),
            (self.sync, Category::Sync),
            (self.time, Category::Timestamp),
            (self.emcy, Category::Emcy),
            (self.sdo, Category::Sdo),
            (self.heartbeat, Category::Heartbeat),
        ];

        let mut options = categories
            .iter()
            .filter(|(enabled, _)| *enabled)
            .fold(DumpOptions::empty(), |acc, (_, category)| acc | category.flag());

        for n in &self.pdo {
            options |= DumpOptions::pdo(*n);
        }
        if self.timestamp {
            options |= DumpOptions::PRINT_TIMESTAMPS;
        }
        if self.file {
            options = options.with_source(SourceKind::File);
        } else if self.tcp {
            options = options.with_source(SourceKind::Tcp);
        }
        options
    }

    fn names_source(&self) -> bool {
        self.file || self.tcp
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CANopen Dump CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using dump library v{}", canopen_dump::VERSION);

    let options = merged_options(&args)?;
    log::debug!("Options: {:?}", options);

    let status = canopen_dump::run(&args.source, options);
    std::process::exit(status);
}

/// Combine command line flags with the config file, if any
fn merged_options(args: &Args) -> Result<DumpOptions> {
    let cli = args.options();

    let Some(config_path) = &args.config else {
        return Ok(cli);
    };

    log::info!("Loading configuration from: {:?}", config_path);
    let file = config::load_config(config_path)?.options();

    let mut options = cli | (file - (DumpOptions::TCP | DumpOptions::FILE));
    if !args.names_source() {
        options = options.with_source(file.source_kind());
    }
    Ok(options)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_to_options() {
        let args = Args::parse_from([
            "canopen-dump", "-t", "--sdo", "--pdo", "2", "--pdo", "4", "can0",
        ]);
        let options = args.options();

        assert!(options.print_timestamps());
        assert_eq!(options.source_kind(), SourceKind::Can);
        assert!(options.contains(DumpOptions::SDO | DumpOptions::PDO2 | DumpOptions::PDO4));
        assert!(!options.contains(DumpOptions::PDO1));
    }

    #[test]
    fn test_source_flags() {
        let args = Args::parse_from(["canopen-dump", "--file", "capture.trace"]);
        assert_eq!(args.options().source_kind(), SourceKind::File);

        let args = Args::parse_from(["canopen-dump", "--tcp", "localhost:9000"]);
        assert_eq!(args.options().source_kind(), SourceKind::Tcp);
        assert_eq!(args.source, "localhost:9000");
    }

    #[test]
    fn test_pdo_number_out_of_range() {
        assert!(Args::try_parse_from(["canopen-dump", "--pdo", "5", "can0"]).is_err());
    }

    #[test]
    fn test_merge_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.toml");
        std::fs::write(&path, "source = \"file\"\nfilter = [\"emcy\"]\n").unwrap();

        let args = Args::parse_from([
            "canopen-dump",
            "--sdo",
            "--config",
            path.to_str().unwrap(),
            "capture.trace",
        ]);
        let options = merged_options(&args).unwrap();

        assert_eq!(options.source_kind(), SourceKind::File);
        assert!(options.contains(DumpOptions::SDO | DumpOptions::EMCY));
        assert!(!options.contains(DumpOptions::NMT));
    }
}
