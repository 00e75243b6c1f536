//! Tool configuration module.
//!
//! Handles loading, validating, and merging `simple-resize.toml`. Stock
//! defaults are the base layer; a user file only needs the keys it wants to
//! override.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [tools]
//! magick = "magick"          # ImageMagick 7 entry point
//! exiftool = "exiftool"      # Used for RAW previews and RAW metadata
//!
//! [paths]
//! upload_dir = "uploads"     # Inputs must live under this directory
//! output_dir = "output"      # Outputs and scratch files go here
//!
//! [limits]
//! max_dimension = 100000     # Largest accepted width/height in pixels
//! max_percentage = 1000      # Largest accepted percentage resize
//!
//! [defaults]
//! quality = 100              # Used when a request gives no quality
//!
//! [classifier]
//! sample_pixels = 1000       # Pixels inspected by the photo heuristic
//! distinct_colors = 100      # More distinct colors than this => photo
//!
//! [raw]
//! reference_camera = [6000, 4000]   # Last-resort RAW dimensions
//! use_reference_fallback = true
//!
//! [cleanup]
//! max_age_hours = 48         # Files older than this are swept
//!
//! [processing]
//! max_processes = 4          # Max parallel batch workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in a directory.
pub const CONFIG_FILENAME: &str = "simple-resize.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `simple-resize.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// External program names or paths.
    pub tools: ToolsConfig,
    /// Working directories.
    pub paths: PathsConfig,
    /// Upper bounds for numeric request parameters.
    pub limits: LimitsConfig,
    /// Request defaults.
    pub defaults: DefaultsConfig,
    /// Photo-vs-graphic heuristic.
    pub classifier: ClassifierConfig,
    /// RAW dimension fallbacks.
    pub raw: RawConfig,
    /// Stale file sweeping.
    pub cleanup: CleanupConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ResizeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tools.magick.trim().is_empty() || self.tools.exiftool.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tools.magick and tools.exiftool must not be empty".into(),
            ));
        }
        if self.limits.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "limits.max_dimension must be non-zero".into(),
            ));
        }
        if self.limits.max_percentage == 0 {
            return Err(ConfigError::Validation(
                "limits.max_percentage must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.defaults.quality) {
            return Err(ConfigError::Validation(
                "defaults.quality must be 1-100".into(),
            ));
        }
        if self.classifier.sample_pixels == 0 {
            return Err(ConfigError::Validation(
                "classifier.sample_pixels must be non-zero".into(),
            ));
        }
        if self.raw.reference_camera[0] == 0 || self.raw.reference_camera[1] == 0 {
            return Err(ConfigError::Validation(
                "raw.reference_camera values must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub magick: String,
    pub exiftool: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            magick: "magick".to_string(),
            exiftool: "exiftool".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Bounds that keep pathological requests away from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_dimension: u32,
    pub max_percentage: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_dimension: 100_000,
            max_percentage: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub quality: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { quality: 100 }
    }
}

/// Parameters of the distinct-color photo heuristic.
///
/// Both values are tuned by eye, not measured: they separate flat graphics
/// and icons from continuous-tone photos well enough to rank formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Number of leading pixels (row-major) inspected.
    pub sample_pixels: usize,
    /// An image is photographic when its sample has more distinct colors than this.
    pub distinct_colors: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_pixels: 1000,
            distinct_colors: 100,
        }
    }
}

/// RAW dimension fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// Sensor resolution `[width, height]` assumed when metadata is unreadable.
    /// Its width also scales the thumbnail aspect ratio.
    pub reference_camera: [u32; 2],
    /// When false, a RAW file with unreadable metadata is an error instead.
    pub use_reference_fallback: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            reference_camera: [6000, 4000],
            use_reference_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    pub max_age_hours: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { max_age_hours: 48 }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ResizeConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ResizeConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ResizeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `simple-resize.toml` from the given directory, falling back to defaults.
pub fn load_config(dir: &Path) -> Result<ResizeConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILENAME))
}

/// Load an explicit config file path, falling back to defaults if it is absent.
pub fn load_config_file(path: &Path) -> Result<ResizeConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-resize configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# External tools
# ---------------------------------------------------------------------------
[tools]
# ImageMagick 7 entry point (resize, convert, identify, -list format).
magick = "magick"
# ExifTool, used to pull embedded previews and metadata out of RAW files.
exiftool = "exiftool"

# ---------------------------------------------------------------------------
# Working directories
# ---------------------------------------------------------------------------
[paths]
# Source images must resolve inside this directory.
upload_dir = "uploads"
# Outputs (and RAW preview scratch files) must resolve inside this directory.
output_dir = "output"

# ---------------------------------------------------------------------------
# Request limits
# ---------------------------------------------------------------------------
[limits]
# Largest accepted width or height, in pixels.
max_dimension = 100000
# Largest accepted percentage resize.
max_percentage = 1000

# ---------------------------------------------------------------------------
# Request defaults
# ---------------------------------------------------------------------------
[defaults]
# Output quality (1-100) when a request does not give one.
quality = 100

# ---------------------------------------------------------------------------
# Photo / graphic heuristic
# ---------------------------------------------------------------------------
[classifier]
# Number of leading pixels sampled from true-color images.
sample_pixels = 1000
# A sample with more distinct colors than this counts as a photo.
distinct_colors = 100

# ---------------------------------------------------------------------------
# RAW files
# ---------------------------------------------------------------------------
[raw]
# Sensor resolution assumed when a RAW file's metadata cannot be read.
reference_camera = [6000, 4000]
# Set to false to report an error instead of assuming the reference size.
use_reference_fallback = true

# ---------------------------------------------------------------------------
# Cleanup
# ---------------------------------------------------------------------------
[cleanup]
# Files older than this many hours are removed by `simple-resize cleanup`.
max_age_hours = 48

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel batch workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
