//! Configuration file loading
//!
//! Example `canopen-dump.toml`:
//!
//! ```toml
//! timestamps = true
//! source = "file"
//! filter = ["sdo", "emcy", "pdo1"]
//! ```

use anyhow::{Context, Result};
use canopen_dump::{Category, DumpOptions, SourceKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Dump settings read from a TOML file; command line flags add to these
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DumpFileConfig {
    /// Prefix every line with the capture time
    #[serde(default)]
    pub timestamps: bool,
    /// Source kind; the command line wins when it names one
    pub source: Option<SourceKind>,
    /// Categories to show; empty shows everything
    #[serde(default)]
    pub filter: Vec<Category>,
}

impl DumpFileConfig {
    /// Option bits described by this file
    pub fn options(&self) -> DumpOptions {
        let mut options = self
            .filter
            .iter()
            .fold(DumpOptions::empty(), |acc, category| acc | category.flag());

        if self.timestamps {
            options |= DumpOptions::PRINT_TIMESTAMPS;
        }
        if let Some(kind) = self.source {
            options = options.with_source(kind);
        }
        options
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<DumpFileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: DumpFileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
