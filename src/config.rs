//! Engine configuration module.
//!
//! Handles loading, validating, and merging `pixelscrub.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Keys
//!
//! ```toml
//! # Every key is optional; the values shown are the defaults
//!
//! [spillover]
//! memory_threshold = 1073741824   # Largest redacted output kept in memory (bytes)
//! # multi_file_threshold = 4294967296  # Above this, one temp file per frame
//! # temp_dir = "/var/tmp"         # Where spill files go (system temp dir if unset)
//!
//! [redaction]
//! burn_in_overlays = false
//! use_pixel_padding_value = true
//! use_explicit_value = false
//! explicit_value = 0
//!
//! [resample]
//! fallback_filter = "catmull-rom" # nearest | triangle | catmull-rom | lanczos3
//!
//! [processing]
//! # max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! A misspelled key fails the load instead of being silently ignored.

use crate::imaging::FallbackFilter;
use crate::redact::{RedactionFlags, SpillPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "pixelscrub.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot serialize defaults: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `pixelscrub.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Where redacted frames are stored.
    pub spillover: SpillPolicy,
    /// Default flags for redaction runs.
    pub redaction: RedactionFlags,
    pub resample: ResampleConfig,
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Reject thresholds and worker counts the engine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let spill = &self.spillover;
        if spill.memory_threshold == 0 {
            return Err(ConfigError::Validation(
                "spillover.memory_threshold must be greater than zero".into(),
            ));
        }
        if let Some(multi) = spill.multi_file_threshold
            && multi < spill.memory_threshold
        {
            return Err(ConfigError::Validation(
                "spillover.multi_file_threshold must not be below memory_threshold".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleConfig {
    /// Kernel for inputs the weighted-area filter cannot handle.
    pub fallback_filter: FallbackFilter,
}

/// Batch parallelism.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound on studies processed at once; all cores when unset.
    pub max_processes: Option<usize>,
}

/// Worker count for the batch pool: the configured bound, never more than
/// the available cores.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Layered loading
// =============================================================================

/// Stock defaults as a TOML table, the bottom layer of every load.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EngineConfig::default())?)
}

/// Lay `overlay` over `base`. Tables merge key by key at every depth; any
/// other overlay value replaces the base value outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                let merged = match table.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            toml::Value::Table(table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value; `Ok(None)` when it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Apply the optional user layer, then deserialize and validate the result.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(user) => merge_toml(base, user),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `pixelscrub.toml` from `dir` on top of stock defaults.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE))
}

/// Load an explicitly named config file on top of stock defaults.
pub fn load_config_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(path)?)
}

/// The documented default `pixelscrub.toml` printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# pixelscrub.toml
#
# Every key is optional and the values below are the defaults. Delete what
# you do not change. Misspelled keys are an error.

## Spillover: where redacted frames are kept
[spillover]
# Total redacted output, in bytes, held in memory. Larger outputs go to
# temp files.
memory_threshold = 1073741824

# Above this total, multi-frame output is written one temp file per frame
# instead of one contiguous file. Must not be below memory_threshold.
# multi_file_threshold = 4294967296

# Directory for temp files. Defaults to the system temp directory.
# temp_dir = "/var/tmp"

## Redaction defaults
[redaction]
# Paint overlay bitmaps into the pixels and drop them from the metadata.
burn_in_overlays = false

# Fill regions with the pixel padding value when the image declares one.
use_pixel_padding_value = true

# Fill regions with explicit_value instead, ignoring padding and polarity.
use_explicit_value = false
explicit_value = 0

## Resampling
[resample]
# Kernel used when the weighted-area filter cannot handle the input.
# One of: nearest, triangle, catmull-rom, lanczos3
fallback_filter = "catmull-rom"

## Processing
[processing]
# Maximum parallel workers. Omit for auto (number of CPU cores).
# max_processes = 4
"##
}
