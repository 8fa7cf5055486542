//! Object dictionary type lookup
//!
//! The dumper only needs to know whether an SDO multiplexer carries a
//! VISIBLE_STRING, so the dictionary is reduced to that single question.

use std::collections::HashMap;

/// Combine an object dictionary index and subindex into one multiplexer key
pub fn sdo_mux(index: u16, subindex: u8) -> u32 {
    (u32::from(index) << 8) | u32::from(subindex)
}

/// Data type class of an object dictionary entry, as far as rendering goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    VisibleString,
    Other,
}

/// Type lookup consulted when rendering SDO payloads
pub trait ObjectDictionary {
    fn type_of(&self, mux: u32) -> DataType;
}

/// CiA 301 communication profile entries holding visible strings
const STANDARD_STRINGS: &[(u16, u8)] = &[
    (0x1008, 0), // manufacturer device name
    (0x1009, 0), // manufacturer hardware version
    (0x100A, 0), // manufacturer software version
];

/// Standard dictionary with optional device-specific entries on top
#[derive(Debug, Clone, Default)]
pub struct StandardDictionary {
    entries: HashMap<u32, DataType>,
}

impl StandardDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: declare the type of a device-specific entry
    pub fn with_entry(mut self, index: u16, subindex: u8, data_type: DataType) -> Self {
        self.entries.insert(sdo_mux(index, subindex), data_type);
        self
    }
}

impl ObjectDictionary for StandardDictionary {
    fn type_of(&self, mux: u32) -> DataType {
        if let Some(data_type) = self.entries.get(&mux) {
            return *data_type;
        }

        let is_standard_string = STANDARD_STRINGS
            .iter()
            .any(|&(index, subindex)| sdo_mux(index, subindex) == mux);

        if is_standard_string {
            DataType::VisibleString
        } else {
            DataType::Other
        }
    }
}
