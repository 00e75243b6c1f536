//! Parameter types for conversion requests.
//!
//! These structs describe *what* the caller asked for, not *how* the backend
//! will do it. [`plan`](super::plan) turns a validated [`ConversionRequest`]
//! into concrete command arguments.
//!
//! ## Types
//!
//! - [`Quality`]: Output quality (1–100). Out-of-range values are rejected.
//! - [`SharpenTier`]: Named unsharp-mask presets (low/standard/high/heavy).
//! - [`Enhancements`]: Optional auto-gamma, auto-level and sharpening.
//! - [`ResizeSpec`]: Either a target box (`WxH`) or a percentage.
//! - [`ConversionRequest`]: Everything needed to synthesize one conversion.

use crate::config::LimitsConfig;
use std::path::PathBuf;
use thiserror::Error;

/// A request parameter or path that must not reach the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{axis} must be between 1 and {max} pixels, got {value}")]
    Dimension {
        axis: &'static str,
        value: u64,
        max: u32,
    },
    #[error("percentage must be greater than 0 and at most {max}, got {value}")]
    Percentage { value: u64, max: u32 },
    #[error("quality must be between 1 and 100, got {0}")]
    Quality(u64),
    #[error("output format {0} is not supported by the installed backend")]
    UnsupportedFormat(String),
    #[error("path {} escapes the working directory {}", path.display(), root.display())]
    PathEscapesRoot { path: PathBuf, root: PathBuf },
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if (1..=100).contains(&value) {
            Ok(Self(value as u32))
        } else {
            Err(ValidationError::Quality(value))
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Unsharp-mask strength presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharpenTier {
    Low,
    #[default]
    Standard,
    High,
    Heavy,
}

/// Unsharp-mask parameters, rendered as ImageMagick's `RxS+A+T` geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub radius: f32,
    pub sigma: f32,
    pub amount: f32,
    pub threshold: f32,
}

impl UnsharpMask {
    pub fn to_geometry(self) -> String {
        format!(
            "{}x{}+{}+{}",
            self.radius, self.sigma, self.amount, self.threshold
        )
    }
}

impl SharpenTier {
    /// Parse a tier name. Unknown names fall back to [`SharpenTier::Standard`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" | "light" => Self::Low,
            "standard" | "normal" | "medium" => Self::Standard,
            "high" | "strong" => Self::High,
            "heavy" => Self::Heavy,
            other => {
                tracing::debug!(tier = other, "unknown sharpen tier, using standard");
                Self::Standard
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Standard => "standard",
            Self::High => "high",
            Self::Heavy => "heavy",
        }
    }

    pub fn mask(self) -> UnsharpMask {
        let (radius, sigma, amount, threshold) = match self {
            Self::Low => (0.0, 0.5, 0.5, 0.05),
            Self::Standard => (0.0, 1.0, 1.0, 0.05),
            Self::High => (0.0, 1.5, 1.5, 0.02),
            Self::Heavy => (0.0, 2.0, 2.0, 0.0),
        };
        UnsharpMask {
            radius,
            sigma,
            amount,
            threshold,
        }
    }
}

/// Optional tone and detail adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Enhancements {
    pub auto_gamma: bool,
    pub auto_level: bool,
    pub sharpen: Option<SharpenTier>,
}

/// How the output should be sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeSpec {
    /// Fit (or, without aspect lock, stretch) into a `width x height` box.
    Box { width: u32, height: u32 },
    /// Scale both axes by a percentage.
    Percentage(u32),
}

impl ResizeSpec {
    /// Build a resize spec from loose request fields, validating against `limits`.
    ///
    /// A complete width/height pair wins over a percentage. A lone width or
    /// height is ignored. Returns `Ok(None)` when no resize was requested.
    pub fn from_fields(
        width: Option<u64>,
        height: Option<u64>,
        percentage: Option<u64>,
        limits: &LimitsConfig,
    ) -> Result<Option<Self>, ValidationError> {
        if let (Some(w), Some(h)) = (width, height) {
            let width = check_dimension("width", w, limits)?;
            let height = check_dimension("height", h, limits)?;
            return Ok(Some(Self::Box { width, height }));
        }
        match percentage {
            Some(p) => Ok(Some(Self::Percentage(check_percentage(p, limits)?))),
            None => Ok(None),
        }
    }

    /// Re-check an already constructed spec (e.g. one built by hand).
    pub fn validate(self, limits: &LimitsConfig) -> Result<Self, ValidationError> {
        match self {
            Self::Box { width, height } => {
                check_dimension("width", width.into(), limits)?;
                check_dimension("height", height.into(), limits)?;
            }
            Self::Percentage(p) => {
                check_percentage(p.into(), limits)?;
            }
        }
        Ok(self)
    }
}

fn check_dimension(
    axis: &'static str,
    value: u64,
    limits: &LimitsConfig,
) -> Result<u32, ValidationError> {
    if value == 0 || value > u64::from(limits.max_dimension) {
        return Err(ValidationError::Dimension {
            axis,
            value,
            max: limits.max_dimension,
        });
    }
    Ok(value as u32)
}

fn check_percentage(value: u64, limits: &LimitsConfig) -> Result<u32, ValidationError> {
    if value == 0 || value > u64::from(limits.max_percentage) {
        return Err(ValidationError::Percentage {
            value,
            max: limits.max_percentage,
        });
    }
    Ok(value as u32)
}

/// Full specification of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversionRequest {
    pub resize: Option<ResizeSpec>,
    pub quality: Quality,
    /// Preserve the width:height ratio when resizing into a box.
    pub keep_aspect: bool,
    /// With `keep_aspect`, only ever shrink.
    pub no_enlarge: bool,
    pub enhancements: Enhancements,
    /// Target format code (e.g. `WEBP`); `None` keeps the destination's extension.
    pub format: Option<String>,
}
