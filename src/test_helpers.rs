//! Shared test utilities for the simple-resize test suite.
//!
//! Fixture images are generated with the `image` crate at test time instead
//! of being checked in, so each test states exactly what it feeds the
//! classifier.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = tmp.path().join("photo.jpg");
//! write_gradient_jpeg(&path, 64, 64);
//! ```

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Fixture writers
// =========================================================================

/// Continuous-tone image: classified as a photo.
pub fn write_gradient_jpeg(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
    })
    .save_with_format(path, image::ImageFormat::Jpeg)
    .unwrap();
}

/// Two-color opaque PNG: classified as a graphic.
pub fn write_flat_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
    .save_with_format(path, image::ImageFormat::Png)
    .unwrap();
}

/// Single-color PNG with an alpha channel: classified as transparent.
pub fn write_rgba_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}
