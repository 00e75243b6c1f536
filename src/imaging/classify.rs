//! Photo/graphic and transparency classification.
//!
//! Standard images are decoded with the `image` crate. RAW files never reach
//! this module's decoder: [`ImageSource`](super::source::ImageSource) routes
//! them to [`ImageClassification::raw`] instead.
//!
//! The photo test is a cheap heuristic, not an analysis: count the distinct
//! colors among the first few hundred pixels. Flat graphics, screenshots and
//! icons reuse a handful of colors; continuous-tone photos almost never do.
//! Both constants live in [`ClassifierConfig`].

use crate::config::ClassifierConfig;
use image::{ColorType, GenericImageView, ImageFormat, ImageReader};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// What kind of image a file holds, as far as format choice is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageClassification {
    pub has_transparency: bool,
    pub is_photo: bool,
    /// Uppercase format name (`JPEG`, `PNG`, `ARW`, ...), if known.
    pub original_format: Option<String>,
}

impl ImageClassification {
    /// Used when a file cannot be decoded: an opaque photo of unknown format.
    pub fn conservative() -> Self {
        Self {
            has_transparency: false,
            is_photo: true,
            original_format: None,
        }
    }

    /// RAW sensor data is always treated as an opaque photo.
    pub fn raw(extension: &str) -> Self {
        Self {
            has_transparency: false,
            is_photo: true,
            original_format: Some(extension.to_ascii_uppercase()),
        }
    }
}

/// Why a standard image could not be classified. Never surfaced to callers.
#[derive(Error, Debug)]
enum ClassificationFailure {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unrecognized image format")]
    UnknownFormat,
}

/// Classify a decodable image, falling back to
/// [`ImageClassification::conservative`] on any error.
pub fn classify_standard(path: &Path, config: &ClassifierConfig) -> ImageClassification {
    match try_classify(path, config) {
        Ok(classification) => {
            tracing::debug!(
                path = %path.display(),
                transparency = classification.has_transparency,
                photo = classification.is_photo,
                "classified image"
            );
            classification
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not analyze image, assuming opaque photo"
            );
            ImageClassification::conservative()
        }
    }
}

fn try_classify(
    path: &Path,
    config: &ClassifierConfig,
) -> Result<ImageClassification, ClassificationFailure> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format().ok_or(ClassificationFailure::UnknownFormat)?;
    let indexed = is_indexed(format, path)?;
    let img = reader.decode()?;
    let color = img.color();

    let is_photo = if indexed || matches!(color, ColorType::L8 | ColorType::L16) {
        false
    } else if is_true_color(color) {
        let distinct = distinct_colors(&img, config.sample_pixels);
        distinct > config.distinct_colors
    } else {
        true
    };

    // Palette decoders widen to RGBA whether or not a transparent index is
    // in use, so indexed images only count as transparent if a pixel is.
    let has_transparency = if indexed {
        color.has_alpha() && img.pixels().any(|(_, _, pixel)| pixel.0[3] < u8::MAX)
    } else {
        color.has_alpha()
    };

    Ok(ImageClassification {
        has_transparency,
        is_photo,
        original_format: Some(format_name(format)),
    })
}

fn is_true_color(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::Rgb16
            | ColorType::Rgba16
            | ColorType::Rgb32F
            | ColorType::Rgba32F
    )
}

/// Count distinct RGBA values among the first `sample` pixels, row-major.
fn distinct_colors(img: &image::DynamicImage, sample: usize) -> usize {
    img.pixels()
        .take(sample)
        .map(|(_, _, pixel)| pixel.0)
        .collect::<HashSet<[u8; 4]>>()
        .len()
}

/// Whether the stored pixels are palette indices.
///
/// The decoder expands palettes to RGB(A), so this reads the header: GIF is
/// always indexed, PNG color type 3 is a palette, BMP at 8 bpp or less is one.
fn is_indexed(format: ImageFormat, path: &Path) -> std::io::Result<bool> {
    match format {
        ImageFormat::Gif => Ok(true),
        ImageFormat::Png => {
            let header = read_header(path, 26)?;
            // signature(8) + length(4) + "IHDR"(4) + width(4) + height(4) + depth(1) + color type(1)
            Ok(header.len() == 26 && &header[12..16] == b"IHDR" && header[25] == 3)
        }
        ImageFormat::Bmp => {
            let header = read_header(path, 30)?;
            Ok(header.len() == 30 && u16::from_le_bytes([header[28], header[29]]) <= 8)
        }
        _ => Ok(false),
    }
}

fn read_header(path: &Path, len: u64) -> std::io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(len as usize);
    std::fs::File::open(path)?
        .take(len)
        .read_to_end(&mut header)?;
    Ok(header)
}

/// Decoder-reported format as an uppercase code matching the catalog.
fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::OpenExr => "EXR".to_string(),
        other => format!("{other:?}").to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    /// 64x64 gradient: every pixel in the first 1000 has its own color.
    fn gradient() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 16) as u8, 128]))
    }

    #[test]
    fn gradient_png_is_photo() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gradient.png");
        gradient().save(&path).unwrap();

        let c = classify_standard(&path, &config());
        assert!(c.is_photo);
        assert!(!c.has_transparency);
        assert_eq!(c.original_format.as_deref(), Some("PNG"));
    }

    #[test]
    fn flat_png_is_graphic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("flat.png");
        RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        })
        .save(&path)
        .unwrap();

        let c = classify_standard(&path, &config());
        assert!(!c.is_photo);
    }

    #[test]
    fn exactly_threshold_colors_is_graphic() {
        // 100 columns, each its own color: the 1000-pixel sample has exactly 100.
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stripes.png");
        RgbImage::from_fn(100, 20, |x, _| Rgb([x as u8, 0, 0]))
            .save(&path)
            .unwrap();

        assert!(!classify_standard(&path, &config()).is_photo);

        let lower = ClassifierConfig {
            distinct_colors: 99,
            ..config()
        };
        assert!(classify_standard(&path, &lower).is_photo);
    }

    #[test]
    fn sample_size_is_configurable() {
        // First row is flat; the gradient only starts on row 1.
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("late.png");
        RgbImage::from_fn(64, 64, |x, y| {
            if y == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([(x * 4) as u8, (y * 4) as u8, 7])
            }
        })
        .save(&path)
        .unwrap();

        let tiny = ClassifierConfig {
            sample_pixels: 64,
            ..config()
        };
        assert!(!classify_standard(&path, &tiny).is_photo);
        assert!(classify_standard(&path, &config()).is_photo);
    }

    #[test]
    fn rgba_png_has_transparency() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alpha.png");
        RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 0]))
            .save(&path)
            .unwrap();

        let c = classify_standard(&path, &config());
        assert!(c.has_transparency);
        assert!(!c.is_photo);
    }

    #[test]
    fn greyscale_is_graphic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("grey.png");
        GrayImage::from_fn(64, 64, |x, y| Luma([((x + y) * 2) as u8]))
            .save(&path)
            .unwrap();

        assert!(!classify_standard(&path, &config()).is_photo);
    }

    #[test]
    fn gif_is_indexed_graphic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("anim.gif");
        gradient().save(&path).unwrap();

        let c = classify_standard(&path, &config());
        assert!(!c.is_photo);
        assert_eq!(c.original_format.as_deref(), Some("GIF"));
    }

    #[test]
    fn opaque_gif_has_no_transparency() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("banner.gif");
        RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
        .save(&path)
        .unwrap();

        let c = classify_standard(&path, &config());
        assert!(!c.has_transparency);
        assert!(!c.is_photo);
    }

    #[test]
    fn gif_with_transparent_index_has_transparency() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sprite.gif");
        RgbaImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([200, 30, 30, 255])
            }
        })
        .save(&path)
        .unwrap();

        assert!(classify_standard(&path, &config()).has_transparency);
    }

    #[test]
    fn jpeg_reports_jpeg_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        gradient().save(&path).unwrap();

        let c = classify_standard(&path, &config());
        assert_eq!(c.original_format.as_deref(), Some("JPEG"));
        assert!(c.is_photo);
    }

    #[test]
    fn format_is_sniffed_not_taken_from_extension() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        gradient().save(&png).unwrap();
        let misnamed = tmp.path().join("actually-png.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let c = classify_standard(&misnamed, &config());
        assert_eq!(c.original_format.as_deref(), Some("PNG"));
    }

    #[test]
    fn undecodable_file_gets_conservative_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();

        assert_eq!(
            classify_standard(&path, &config()),
            ImageClassification::conservative()
        );
    }

    #[test]
    fn missing_file_gets_conservative_default() {
        let c = classify_standard(Path::new("/definitely/not/here.png"), &config());
        assert_eq!(c, ImageClassification::conservative());
    }

    #[test]
    fn raw_classification_is_opaque_photo() {
        let c = ImageClassification::raw("arw");
        assert!(c.is_photo);
        assert!(!c.has_transparency);
        assert_eq!(c.original_format.as_deref(), Some("ARW"));
    }
}
