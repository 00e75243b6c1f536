//! # Simple Resize
//!
//! Image classification and conversion planning for batch resizing. Pixel
//! work is never done here: ImageMagick resizes and encodes, ExifTool pulls
//! previews out of camera RAW files. This crate decides *what* to ask them.
//!
//! # Architecture: Inspect, Recommend, Plan, Execute
//!
//! ```text
//! path ─┬─ classify ──────┐
//!       │                 ├─ recommend  →  {recommended, compatible}
//!       │   formats ──────┘
//!       └─ dimensions
//!
//! request + path ─ plan  →  [exiftool -b ...] → magick ...  ─ execute → <stem>_rsz.<ext>
//! ```
//!
//! Classification and dimension lookup are independent. A plan is a plain
//! value listing every external invocation, built and validated before any
//! process is spawned, so `simple-resize plan` can print exactly what
//! `simple-resize convert` would run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Classification, format catalog, recommendations, dimensions, plans, execution |
//! | [`config`] | `simple-resize.toml` loading, validation, and merging over stock defaults |
//! | [`cleanup`] | Sweeps stale files out of the upload and output directories |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## External Tools Over Codecs
//!
//! ImageMagick reads and writes far more formats than any pure-Rust stack,
//! and users already trust its output. Shelling out keeps this crate small
//! and lets the installed ImageMagick decide which formats are offered: the
//! [format catalog](imaging::formats) only recommends what
//! `magick -list format` reports.
//!
//! ## Standard vs. RAW Dispatch Once
//!
//! Camera RAW files cannot be decoded in process and are converted through
//! their embedded JPEG preview. [`imaging::ImageSource`] makes that decision
//! once per input; classification, dimension lookup and plan shape all
//! match on it.
//!
//! ## Scratch Files Owned by the Plan
//!
//! The extracted RAW preview is a [`tempfile::TempPath`] held by the
//! [`imaging::ConversionPlan`]. Dropping the plan deletes it, whether the
//! conversion succeeded, failed, or never ran.
//!
//! ## Heuristics Live in Config
//!
//! The photo test (distinct colors among the first N pixels) and the
//! reference camera size used for unreadable RAW files are guesses. They
//! are exposed as `[classifier]` and `[raw]` settings rather than buried as
//! constants.

pub mod cleanup;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
