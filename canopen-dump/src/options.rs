//! Dump options
//!
//! The options are a single bitmask: one bit per message category, one bit
//! for timestamp printing and two bits selecting the frame source. Category
//! filtering is opt-out: a mask without any category bit shows everything.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DumpOptions: u32 {
        const NMT = 1 << 0;
        const SYNC = 1 << 1;
        const TIMESTAMP = 1 << 2;
        const EMCY = 1 << 3;
        const PDO1 = 1 << 4;
        const PDO2 = 1 << 5;
        const PDO3 = 1 << 6;
        const PDO4 = 1 << 7;
        const SDO = 1 << 8;
        const HEARTBEAT = 1 << 9;

        const FILTER_MASK = Self::NMT.bits()
            | Self::SYNC.bits()
            | Self::TIMESTAMP.bits()
            | Self::EMCY.bits()
            | Self::PDO1.bits()
            | Self::PDO2.bits()
            | Self::PDO3.bits()
            | Self::PDO4.bits()
            | Self::SDO.bits()
            | Self::HEARTBEAT.bits();

        /// Prefix every line with the capture time
        const PRINT_TIMESTAMPS = 1 << 16;
        /// Read frames from a TCP stream instead of a CAN interface
        const TCP = 1 << 17;
        /// Replay a trace file
        const FILE = 1 << 18;
    }
}

const PDO_FILTER_SHIFT: u32 = 4;

impl DumpOptions {
    /// Filter bit for PDO number `n` (1..=4); other numbers map to no bit
    pub fn pdo(n: u8) -> Self {
        match n {
            1..=4 => Self::from_bits_truncate(1 << (PDO_FILTER_SHIFT + u32::from(n) - 1)),
            _ => Self::empty(),
        }
    }

    /// Apply the opt-out default: no category bit means every category
    pub fn resolve(self) -> Self {
        if self.intersects(Self::FILTER_MASK) {
            self
        } else {
            self | Self::FILTER_MASK
        }
    }

    /// Check whether a category passes the filter (after `resolve`)
    pub fn shows(&self, category: Category) -> bool {
        self.contains(category.flag())
    }

    pub fn print_timestamps(&self) -> bool {
        self.contains(Self::PRINT_TIMESTAMPS)
    }

    /// Frame source selected by the options; file replay wins over TCP
    pub fn source_kind(&self) -> SourceKind {
        if self.contains(Self::FILE) {
            SourceKind::File
        } else if self.contains(Self::TCP) {
            SourceKind::Tcp
        } else {
            SourceKind::Can
        }
    }

    /// Replace the source bits with the given kind
    pub fn with_source(self, kind: SourceKind) -> Self {
        let cleared = self - (Self::TCP | Self::FILE);
        match kind {
            SourceKind::Can => cleared,
            SourceKind::Tcp => cleared | Self::TCP,
            SourceKind::File => cleared | Self::FILE,
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Live SocketCAN interface, e.g. `can0`
    Can,
    /// TCP endpoint streaming raw `can_frame` records, e.g. `localhost:5555`
    Tcp,
    /// Recorded trace file
    File,
}

/// Message category used for output filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nmt,
    Sync,
    Timestamp,
    Emcy,
    Pdo1,
    Pdo2,
    Pdo3,
    Pdo4,
    Sdo,
    Heartbeat,
}

impl Category {
    /// Category of PDO number `n`; numbers outside 1..=4 are clamped
    pub fn pdo(n: u8) -> Self {
        match n {
            0 | 1 => Category::Pdo1,
            2 => Category::Pdo2,
            3 => Category::Pdo3,
            _ => Category::Pdo4,
        }
    }

    pub fn flag(&self) -> DumpOptions {
        match self {
            Category::Nmt => DumpOptions::NMT,
            Category::Sync => DumpOptions::SYNC,
            Category::Timestamp => DumpOptions::TIMESTAMP,
            Category::Emcy => DumpOptions::EMCY,
            Category::Pdo1 => DumpOptions::PDO1,
            Category::Pdo2 => DumpOptions::PDO2,
            Category::Pdo3 => DumpOptions::PDO3,
            Category::Pdo4 => DumpOptions::PDO4,
            Category::Sdo => DumpOptions::SDO,
            Category::Heartbeat => DumpOptions::HEARTBEAT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_enables_everything() {
        let options = DumpOptions::PRINT_TIMESTAMPS.resolve();
        assert!(options.contains(DumpOptions::FILTER_MASK));
        assert!(options.print_timestamps());
        assert_eq!(DumpOptions::empty().resolve(), DumpOptions::FILTER_MASK);
    }

    #[test]
    fn test_explicit_filter_is_kept() {
        let options = (DumpOptions::SDO | DumpOptions::pdo(3)).resolve();
        assert!(options.shows(Category::Sdo));
        assert!(options.shows(Category::Pdo3));
        assert!(!options.shows(Category::Pdo1));
        assert!(!options.shows(Category::Nmt));
    }

    #[test]
    fn test_pdo_bits() {
        assert_eq!(DumpOptions::pdo(1), DumpOptions::PDO1);
        assert_eq!(DumpOptions::pdo(4), DumpOptions::PDO4);
        assert_eq!(DumpOptions::pdo(5), DumpOptions::empty());
        assert_eq!(Category::pdo(2).flag(), DumpOptions::PDO2);
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(DumpOptions::empty().source_kind(), SourceKind::Can);
        assert_eq!(DumpOptions::TCP.source_kind(), SourceKind::Tcp);
        assert_eq!((DumpOptions::TCP | DumpOptions::FILE).source_kind(), SourceKind::File);

        let options = DumpOptions::TCP.with_source(SourceKind::File);
        assert_eq!(options, DumpOptions::FILE);
    }

    #[test]
    fn test_category_names() {
        use serde::de::value::{Error, StrDeserializer};

        let category = Category::deserialize(StrDeserializer::<Error>::new("pdo2")).unwrap();
        assert_eq!(category, Category::Pdo2);

        let category = Category::deserialize(StrDeserializer::<Error>::new("heartbeat")).unwrap();
        assert_eq!(category.flag(), DumpOptions::HEARTBEAT);
    }
}
