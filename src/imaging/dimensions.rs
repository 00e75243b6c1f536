//! Native pixel dimensions of an input.
//!
//! Standard images are measured by `magick identify`. RAW files go through
//! a chain of increasingly rough estimates:
//!
//! | Tier | Source | Reliability |
//! |---|---|---|
//! | 1 | `ExifImageWidth` / `ExifImageHeight` tags | measured |
//! | 2 | embedded thumbnail aspect × reference width | aspect only |
//! | 3 | configured reference camera | guess |
//!
//! Each tier is logged separately and the result carries its
//! [`DimensionSource`], so callers can tell a measurement from a guess.

use super::backend::{BackendError, ConversionBackend, Dimensions};
use crate::config::RawConfig;
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Metadata tags holding the full sensor output size.
const RAW_SIZE_TAGS: [&str; 2] = ["ExifImageWidth", "ExifImageHeight"];

/// Embedded thumbnail used as an aspect-ratio proxy.
const RAW_THUMBNAIL_TAG: &str = "ThumbnailImage";

#[derive(Error, Debug)]
pub enum DimensionError {
    #[error("could not read dimensions: {0}")]
    Tool(#[from] BackendError),
    #[error("no WIDTHxHEIGHT in identify output: {0:?}")]
    Parse(String),
    #[error("every dimension source failed for {}", .0.display())]
    Exhausted(PathBuf),
}

/// Where a [`Dimensions`] value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionSource {
    Probe,
    MetadataTags,
    ThumbnailRatio,
    ReferenceCamera,
}

impl DimensionSource {
    /// True when the value was read from the file rather than estimated.
    pub fn is_measured(self) -> bool {
        matches!(self, Self::Probe | Self::MetadataTags)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Probe => "measured",
            Self::MetadataTags => "from RAW metadata",
            Self::ThumbnailRatio => "estimated from thumbnail aspect ratio",
            Self::ReferenceCamera => "assumed reference camera size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDimensions {
    #[serde(flatten)]
    pub dimensions: Dimensions,
    pub source: DimensionSource,
}

/// Find the first `WIDTHxHEIGHT` token in `magick identify` output.
///
/// ```text
/// photo.jpg JPEG 4000x3000 4000x3000+0+0 8-bit sRGB 2.1MB 0.000u 0:00.000
/// ```
pub fn parse_identify_output(output: &str) -> Option<Dimensions> {
    output.split_whitespace().find_map(parse_geometry)
}

fn parse_geometry(token: &str) -> Option<Dimensions> {
    let (w, h) = token.split_once('x')?;
    let width: u32 = w.parse().ok()?;
    let height: u32 = h.parse().ok()?;
    (width > 0 && height > 0).then_some(Dimensions { width, height })
}

/// Measure a standard image with the backend's identify probe.
pub fn probe_dimensions(
    backend: &impl ConversionBackend,
    path: &Path,
) -> Result<ResolvedDimensions, DimensionError> {
    let output = backend.identify(path)?;
    let dimensions =
        parse_identify_output(&output).ok_or_else(|| DimensionError::Parse(output.clone()))?;
    Ok(ResolvedDimensions {
        dimensions,
        source: DimensionSource::Probe,
    })
}

/// Resolve RAW dimensions through the metadata, thumbnail and reference tiers.
pub fn resolve_raw_dimensions(
    backend: &impl ConversionBackend,
    path: &Path,
    raw: &RawConfig,
) -> Result<ResolvedDimensions, DimensionError> {
    match backend.read_tags(path, &RAW_SIZE_TAGS) {
        Ok(text) => {
            if let Some(dimensions) = parse_tag_dimensions(&text) {
                tracing::info!(
                    path = %path.display(),
                    width = dimensions.width,
                    height = dimensions.height,
                    "RAW dimensions from metadata tags"
                );
                return Ok(ResolvedDimensions {
                    dimensions,
                    source: DimensionSource::MetadataTags,
                });
            }
            tracing::info!(path = %path.display(), "RAW size tags absent, trying thumbnail");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "RAW metadata read failed");
        }
    }

    let [reference_width, reference_height] = raw.reference_camera;

    match backend.extract_tag(path, RAW_THUMBNAIL_TAG) {
        Ok(Some(bytes)) => match thumbnail_dimensions(&bytes) {
            Some(thumb) => {
                let height = (f64::from(reference_width) * f64::from(thumb.height)
                    / f64::from(thumb.width))
                .round()
                .max(1.0) as u32;
                let dimensions = Dimensions {
                    width: reference_width,
                    height,
                };
                tracing::warn!(
                    path = %path.display(),
                    thumb_width = thumb.width,
                    thumb_height = thumb.height,
                    width = dimensions.width,
                    height = dimensions.height,
                    "RAW dimensions estimated from thumbnail aspect ratio"
                );
                return Ok(ResolvedDimensions {
                    dimensions,
                    source: DimensionSource::ThumbnailRatio,
                });
            }
            None => tracing::warn!(path = %path.display(), "RAW thumbnail is not decodable"),
        },
        Ok(None) => tracing::info!(path = %path.display(), "RAW file has no thumbnail"),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "RAW thumbnail extraction failed")
        }
    }

    if !raw.use_reference_fallback {
        return Err(DimensionError::Exhausted(path.to_path_buf()));
    }

    tracing::warn!(
        path = %path.display(),
        width = reference_width,
        height = reference_height,
        "RAW dimensions unknown, assuming reference camera size"
    );
    Ok(ResolvedDimensions {
        dimensions: Dimensions {
            width: reference_width,
            height: reference_height,
        },
        source: DimensionSource::ReferenceCamera,
    })
}

/// Parse `-s3` tag output: width on the first line, height on the second.
fn parse_tag_dimensions(text: &str) -> Option<Dimensions> {
    let mut values = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let width: u32 = values.next()?.parse().ok()?;
    let height: u32 = values.next()?.parse().ok()?;
    (width > 0 && height > 0).then_some(Dimensions { width, height })
}

/// Header-only read of an in-memory image.
fn thumbnail_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    (width > 0 && height > 0).then_some(Dimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use image::{ImageFormat, RgbImage};

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn parses_identify_line() {
        let output = "photo.jpg JPEG 4000x3000 4000x3000+0+0 8-bit sRGB 2.1MB 0.000u 0:00.000";
        assert_eq!(
            parse_identify_output(output),
            Some(Dimensions {
                width: 4000,
                height: 3000
            })
        );
    }

    #[test]
    fn ignores_filename_lookalikes_and_page_geometry() {
        let output = "800x600.png PNG 64x32 64x32+0+0 8-bit sRGB";
        assert_eq!(
            parse_identify_output(output),
            Some(Dimensions {
                width: 64,
                height: 32
            })
        );
    }

    #[test]
    fn first_frame_wins_for_animations() {
        let output = "a.gif[0] GIF 10x20 10x20+0+0 8-bit sRGB\na.gif[1] GIF 5x5 10x20+2+2 8-bit sRGB";
        assert_eq!(
            parse_identify_output(output),
            Some(Dimensions {
                width: 10,
                height: 20
            })
        );
    }

    #[test]
    fn rejects_output_without_geometry() {
        assert_eq!(parse_identify_output("identify: no images"), None);
        assert_eq!(parse_identify_output("a.png PNG 0x0 8-bit"), None);
    }

    #[test]
    fn probe_reports_parse_error() {
        let backend = MockBackend::new().with_identify("nothing useful here");
        assert!(matches!(
            probe_dimensions(&backend, Path::new("/a.png")),
            Err(DimensionError::Parse(_))
        ));
    }

    #[test]
    fn probe_reports_tool_failure() {
        let backend = MockBackend::new();
        assert!(matches!(
            probe_dimensions(&backend, Path::new("/a.png")),
            Err(DimensionError::Tool(BackendError::ToolFailed { .. }))
        ));
    }

    #[test]
    fn probe_success_is_measured() {
        let backend = MockBackend::new().with_identify("a.png PNG 640x480 640x480+0+0");
        let resolved = probe_dimensions(&backend, Path::new("/a.png")).unwrap();
        assert_eq!(resolved.source, DimensionSource::Probe);
        assert!(resolved.source.is_measured());
        assert_eq!(resolved.dimensions.width, 640);
    }

    #[test]
    fn raw_tier_one_metadata_tags() {
        let backend = MockBackend::new()
            .with_tag("ExifImageWidth", "6048")
            .with_tag("ExifImageHeight", "4024");
        let resolved =
            resolve_raw_dimensions(&backend, Path::new("/a.arw"), &RawConfig::default()).unwrap();
        assert_eq!(resolved.source, DimensionSource::MetadataTags);
        assert_eq!(
            resolved.dimensions,
            Dimensions {
                width: 6048,
                height: 4024
            }
        );
    }

    #[test]
    fn raw_tier_two_thumbnail_ratio() {
        // 160x90 thumbnail → 16:9 applied to the 6000px reference width
        let backend = MockBackend::new()
            .with_tag("ExifImageWidth", "6000")
            .with_binary_tag(RAW_THUMBNAIL_TAG, jpeg_bytes(160, 90));
        let resolved =
            resolve_raw_dimensions(&backend, Path::new("/a.arw"), &RawConfig::default()).unwrap();
        assert_eq!(resolved.source, DimensionSource::ThumbnailRatio);
        assert!(!resolved.source.is_measured());
        assert_eq!(
            resolved.dimensions,
            Dimensions {
                width: 6000,
                height: 3375
            }
        );
    }

    #[test]
    fn raw_tier_three_reference_camera() {
        let backend = MockBackend::new().with_binary_tag(RAW_THUMBNAIL_TAG, b"junk".to_vec());
        let resolved =
            resolve_raw_dimensions(&backend, Path::new("/a.arw"), &RawConfig::default()).unwrap();
        assert_eq!(resolved.source, DimensionSource::ReferenceCamera);
        assert_eq!(
            resolved.dimensions,
            Dimensions {
                width: 6000,
                height: 4000
            }
        );
    }

    #[test]
    fn raw_exhausted_without_reference_fallback() {
        let backend = MockBackend::new();
        let raw = RawConfig {
            use_reference_fallback: false,
            ..RawConfig::default()
        };
        assert!(matches!(
            resolve_raw_dimensions(&backend, Path::new("/a.arw"), &raw),
            Err(DimensionError::Exhausted(_))
        ));
    }

    #[test]
    fn tag_parsing_requires_both_values() {
        assert_eq!(parse_tag_dimensions("6000\n"), None);
        assert_eq!(parse_tag_dimensions("6000\nabc\n"), None);
        assert_eq!(
            parse_tag_dimensions(" 6000 \n\n 4000\n"),
            Some(Dimensions {
                width: 6000,
                height: 4000
            })
        );
    }
}
