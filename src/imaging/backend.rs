//! Conversion backend trait and shared types.
//!
//! The [`ConversionBackend`] trait is the only place the crate touches
//! external programs. It covers the five interactions the engine needs:
//! capability listing, identify, metadata tag reads, binary tag extraction,
//! and running a synthesized [`CommandStep`].
//!
//! The production implementation is
//! [`MagickBackend`](super::magick_backend::MagickBackend), which shells out
//! to ImageMagick and ExifTool. Tests use the recording `MockBackend` below.

use super::plan::CommandStep;
use std::path::Path;
use thiserror::Error;

/// A spawned tool could not run or reported failure.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{tool} is not installed or not on PATH")]
    ToolMissing { tool: String },
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
}

/// Native pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for external conversion backends.
///
/// Every method is a blocking call; the caller's thread waits for the
/// subprocess to exit.
pub trait ConversionBackend: Sync {
    /// Raw capability listing (`magick -list format`).
    fn list_formats(&self) -> Result<String, BackendError>;

    /// Raw metadata probe output (`magick identify <path>`).
    fn identify(&self, path: &Path) -> Result<String, BackendError>;

    /// Text values of metadata tags, one per line, absent tags omitted.
    fn read_tags(&self, path: &Path, tags: &[&str]) -> Result<String, BackendError>;

    /// Binary value of a tag (an embedded preview or thumbnail).
    ///
    /// `Ok(None)` means the tag is absent, which is not a failure.
    fn extract_tag(&self, path: &Path, tag: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Whether a tag is present, without extracting its payload.
    fn has_tag(&self, path: &Path, tag: &str) -> Result<bool, BackendError> {
        Ok(!self.read_tags(path, &[tag])?.trim().is_empty())
    }

    /// Run one step of a conversion plan, returning its stdout.
    fn run_step(&self, step: &CommandStep) -> Result<Vec<u8>, BackendError>;
}
