//! CLI output formatting for every subcommand.
//!
//! # Information-First Display
//!
//! Output leads with what the engine concluded (photo or graphic, which
//! formats to use, what will be run) and shows paths as secondary context on
//! indented lines. Every entity follows the same two-level pattern:
//!
//! 1. **Header line**: positional index or file name + summary
//! 2. **Context lines**: indented `Size:`, `Recommended:`, `Scratch:`, etc.
//!
//! # Output Format
//!
//! ## Inspect
//!
//! ```text
//! DSC0001.ARW
//!     Type: photo, opaque (ARW, camera RAW)
//!     Size: 6000x4000 (assumed reference camera size)
//!     Recommended: JPEG, WEBP, AVIF, TIFF
//!     Compatible: PNG, BMP, ARW
//! ```
//!
//! ## Plan
//!
//! ```text
//! Plan → /srv/output/DSC0001_rsz.webp
//! 001 exiftool -b -JpgFromRaw /srv/uploads/DSC0001.ARW > /srv/output/DSC0001_preview_a1B2c3.jpg
//! 002 magick /srv/output/DSC0001_preview_a1B2c3.jpg -resize 50% -quality 85 WEBP:/srv/output/DSC0001_rsz.webp
//!     Scratch: /srv/output/DSC0001_preview_a1B2c3.jpg
//! ```
//!
//! ## Convert
//!
//! ```text
//! Converted 2 of 3
//!     /srv/output/a_rsz.webp
//!     /srv/output/b_rsz.webp
//! Failed 1
//!     /srv/uploads/c.png: invalid request: percentage must be ...
//! ```
//!
//! # Architecture
//!
//! Each subcommand has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cleanup::CleanupStats;
use crate::imaging::{
    AvailableFormatSet, BatchRecommendation, BatchReport, ConversionPlan, FormatCategory,
    ImageClassification, Inspection, RecommendationResult, StepRole,
};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One-line classification summary.
///
/// ```text
/// photo, opaque (JPEG)
/// graphic, transparent (PNG)
/// photo, opaque (unknown format)
/// ```
fn classification_summary(c: &ImageClassification, raw: bool) -> String {
    let kind = if c.is_photo { "photo" } else { "graphic" };
    let alpha = if c.has_transparency {
        "transparent"
    } else {
        "opaque"
    };
    let format = match (&c.original_format, raw) {
        (Some(f), true) => format!("{f}, camera RAW"),
        (Some(f), false) => f.clone(),
        (None, _) => "unknown format".to_string(),
    };
    format!("{kind}, {alpha} ({format})")
}

fn list_or_none(codes: &[String]) -> String {
    if codes.is_empty() {
        "(none)".to_string()
    } else {
        codes.join(", ")
    }
}

fn recommendation_lines(result: &RecommendationResult, depth: usize) -> Vec<String> {
    vec![
        format!(
            "{}Recommended: {}",
            indent(depth),
            list_or_none(&result.recommended)
        ),
        format!(
            "{}Compatible: {}",
            indent(depth),
            list_or_none(&result.compatible)
        ),
    ]
}

/// Quote an argument for display when a shell would split it.
fn shell_word(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '\'' | '"' | '>' | '<' | '!' | '$'))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Installed formats, then each category narrowed to what is installed.
pub fn format_formats(available: &AvailableFormatSet, categories: &[FormatCategory]) -> Vec<String> {
    let mut lines = vec![format!("Available formats ({})", available.len())];
    let codes: Vec<&str> = available.iter().collect();
    for chunk in codes.chunks(12) {
        lines.push(format!("{}{}", indent(1), chunk.join(" ")));
    }

    lines.push(String::new());
    lines.push("Categories".to_string());
    for (i, category) in categories.iter().enumerate() {
        lines.push(format!(
            "{} {} [{}]",
            format_index(i + 1),
            category.display_name,
            category.key.as_str()
        ));
        let installed = |codes: &[&str]| -> Vec<String> {
            codes
                .iter()
                .filter(|c| available.contains(c))
                .map(|c| c.to_string())
                .collect()
        };
        lines.push(format!(
            "{}Recommended: {}",
            indent(1),
            list_or_none(&installed(category.recommended))
        ));
        lines.push(format!(
            "{}Compatible: {}",
            indent(1),
            list_or_none(&installed(category.compatible))
        ));
    }
    lines
}

pub fn print_formats(available: &AvailableFormatSet, categories: &[FormatCategory]) {
    for line in format_formats(available, categories) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect / recommend
// ============================================================================

pub fn format_inspection(inspection: &Inspection) -> Vec<String> {
    let mut lines = vec![
        file_label(&inspection.path),
        format!(
            "{}Type: {}",
            indent(1),
            classification_summary(&inspection.classification, inspection.raw)
        ),
    ];
    match (&inspection.dimensions, &inspection.dimension_error) {
        (Some(d), _) => lines.push(format!(
            "{}Size: {}x{} ({})",
            indent(1),
            d.dimensions.width,
            d.dimensions.height,
            d.source.describe()
        )),
        (None, Some(e)) => lines.push(format!("{}Size: unknown ({})", indent(1), e)),
        (None, None) => lines.push(format!("{}Size: unknown", indent(1))),
    }
    lines.extend(recommendation_lines(&inspection.recommendation, 1));
    lines
}

pub fn print_inspection(inspection: &Inspection) {
    for line in format_inspection(inspection) {
        println!("{}", line);
    }
}

/// ```text
/// 001 photo.jpg: photo, opaque (JPEG)
/// 002 icon.png: graphic, transparent (PNG)
/// Batch: photos, graphics, transparency
///     Recommended: PNG, WEBP, AVIF, GIF
///     Compatible: TIFF, ICO, PSD
/// ```
pub fn format_batch_recommendation(batch: &BatchRecommendation) -> Vec<String> {
    let mut lines: Vec<String> = batch
        .members
        .iter()
        .enumerate()
        .map(|(i, (path, c))| {
            let raw = crate::imaging::ImageSource::from_path(path).is_raw();
            format!(
                "{} {}: {}",
                format_index(i + 1),
                file_label(path),
                classification_summary(c, raw)
            )
        })
        .collect();

    let summary = &batch.summary;
    let traits: Vec<&str> = [
        (summary.has_photos, "photos"),
        (summary.has_graphics, "graphics"),
        (summary.has_transparency, "transparency"),
    ]
    .into_iter()
    .filter_map(|(present, label)| present.then_some(label))
    .collect();
    lines.push(format!(
        "Batch: {}",
        if traits.is_empty() {
            "empty".to_string()
        } else {
            traits.join(", ")
        }
    ));
    lines.extend(recommendation_lines(&batch.recommendation, 1));
    lines
}

pub fn print_batch_recommendation(batch: &BatchRecommendation) {
    for line in format_batch_recommendation(batch) {
        println!("{}", line);
    }
}

// ============================================================================
// Plan / convert
// ============================================================================

pub fn format_plan(plan: &ConversionPlan) -> Vec<String> {
    let mut lines = vec![format!("Plan → {}", plan.destination().display())];
    for (i, step) in plan.steps().iter().enumerate() {
        let mut words = vec![step.role.tool_name().to_string()];
        words.extend(step.arguments.iter().map(|a| shell_word(a)));
        if step.role == StepRole::PreviewExtract {
            words.push(">".to_string());
            words.push(shell_word(&step.output.to_string_lossy()));
        }
        lines.push(format!("{} {}", format_index(i + 1), words.join(" ")));
    }
    for scratch in plan.scratch_paths() {
        lines.push(format!("{}Scratch: {}", indent(1), scratch.display()));
    }
    lines
}

pub fn print_plan(plan: &ConversionPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let total = report.outputs.len() + report.failures.len();
    let mut lines = vec![format!("Converted {} of {}", report.outputs.len(), total)];
    for output in &report.outputs {
        lines.push(format!("{}{}", indent(1), output.display()));
    }
    if !report.failures.is_empty() {
        lines.push(format!("Failed {}", report.failures.len()));
        for failure in &report.failures {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                failure.source.display(),
                failure.error
            ));
        }
    }
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Cleanup
// ============================================================================

pub fn format_cleanup(dirs: &[&Path], stats: &CleanupStats) -> Vec<String> {
    let mut lines = vec!["Swept".to_string()];
    for dir in dirs {
        lines.push(format!("{}{}", indent(1), dir.display()));
    }
    lines.push(format!(
        "Removed {} files ({:.2} MB) and {} empty directories",
        stats.files_removed,
        stats.bytes_freed as f64 / (1024.0 * 1024.0),
        stats.dirs_removed
    ));
    lines
}

pub fn print_cleanup(dirs: &[&Path], stats: &CleanupStats) {
    for line in format_cleanup(dirs, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
