//! Input dispatch: standard raster images vs. camera RAW files.
//!
//! The decision is made once, from the extension, when a path enters the
//! engine. Everything downstream (classification, dimension lookup, plan
//! shape) then matches on [`ImageSource`] instead of re-checking extensions.

use super::backend::ConversionBackend;
use super::classify::{ImageClassification, classify_standard};
use super::dimensions::{
    DimensionError, ResolvedDimensions, probe_dimensions, resolve_raw_dimensions,
};
use super::params::ConversionRequest;
use super::plan::{ConversionPlan, PlanContext, PlanError, synthesize_plan};
use crate::config::{ClassifierConfig, RawConfig};
use std::path::{Path, PathBuf};

/// Camera RAW extensions, uppercase. Matched case-insensitively.
pub const RAW_EXTENSIONS: &[&str] = &[
    "ARW", "CR2", "CR3", "NEF", "NRW", "ORF", "RAF", "RW2", "PEF", "DNG", "IIQ", "KDC", "3FR",
    "MEF", "MRW", "SRF", "SR2", "SRW", "X3F", "ERF",
];

pub fn is_raw_extension(extension: &str) -> bool {
    RAW_EXTENSIONS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(extension))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Anything the `image` crate and `magick` can read directly.
    Standard(PathBuf),
    /// Sensor data; only its embedded previews are convertible.
    Raw { path: PathBuf, extension: String },
}

impl ImageSource {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if is_raw_extension(ext) => Self::Raw {
                path: path.to_path_buf(),
                extension: ext.to_ascii_uppercase(),
            },
            _ => Self::Standard(path.to_path_buf()),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Standard(path) | Self::Raw { path, .. } => path,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw { .. })
    }

    /// Never fails; undecodable files get the conservative default.
    pub fn classify(&self, config: &ClassifierConfig) -> ImageClassification {
        match self {
            Self::Standard(path) => classify_standard(path, config),
            Self::Raw { extension, .. } => ImageClassification::raw(extension),
        }
    }

    pub fn resolve_dimensions(
        &self,
        backend: &impl ConversionBackend,
        raw: &RawConfig,
    ) -> Result<ResolvedDimensions, DimensionError> {
        match self {
            Self::Standard(path) => probe_dimensions(backend, path),
            Self::Raw { path, .. } => resolve_raw_dimensions(backend, path, raw),
        }
    }

    pub fn build_plan(
        &self,
        backend: &impl ConversionBackend,
        destination: &Path,
        request: &ConversionRequest,
        ctx: PlanContext<'_>,
    ) -> Result<ConversionPlan, PlanError> {
        synthesize_plan(backend, self, destination, request, ctx)
    }
}
