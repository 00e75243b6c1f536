//! Image inspection and conversion planning. External tools do the pixel work.
//!
//! | Step | Module | Tool |
//! |---|---|---|
//! | **Available formats** | [`formats`] | `magick -list format` |
//! | **Classify** | [`classify`] | `image` crate (in process) |
//! | **Recommend** | [`recommend`] | none |
//! | **Dimensions** | [`dimensions`] | `magick identify`, `exiftool` |
//! | **Plan** | [`plan`] | none (may probe RAW preview tags) |
//! | **Execute** | [`execute`] | `exiftool -b`, `magick` |
//!
//! The module is split into:
//! - **Parameters**: Validated request types ([`ConversionRequest`], [`Quality`], ...)
//! - **Source**: [`ImageSource`], the standard/RAW dispatch every step matches on
//! - **Backend**: [`ConversionBackend`] trait + [`MagickBackend`]
//! - **Operations**: High-level functions combining all of the above

pub mod backend;
pub mod classify;
pub mod dimensions;
pub mod execute;
pub mod formats;
pub mod magick_backend;
pub mod operations;
pub mod params;
pub mod plan;
pub mod recommend;
pub mod source;

pub use backend::{BackendError, ConversionBackend, Dimensions};
pub use classify::ImageClassification;
pub use dimensions::{DimensionError, DimensionSource, ResolvedDimensions};
pub use execute::{ConvertError, execute};
pub use formats::{AvailableFormatSet, CategoryKey, FormatCatalog, FormatCategory, categories};
pub use magick_backend::MagickBackend;
pub use operations::{
    BatchRecommendation, BatchReport, ConvertJob, Inspection, ItemFailure, convert_batch,
    convert_one, inspect, recommend_for_paths,
};
pub use params::{
    ConversionRequest, Enhancements, Quality, ResizeSpec, SharpenTier, ValidationError,
};
pub use plan::{
    CommandStep, ConversionPlan, PlanContext, PlanError, StepRole, WorkRoots, output_file_name,
};
pub use recommend::{BatchClassification, RecommendationResult, recommend, recommend_batch};
pub use source::ImageSource;
