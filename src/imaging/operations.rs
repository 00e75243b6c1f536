//! High-level image operations.
//!
//! These functions combine classification, dimension lookup, recommendation
//! and plan execution. They take configuration plus the current format set
//! and call the backend; the CLI is a thin layer over them.

use super::backend::ConversionBackend;
use super::classify::ImageClassification;
use super::dimensions::ResolvedDimensions;
use super::execute::{ConvertError, execute};
use super::formats::AvailableFormatSet;
use super::params::ConversionRequest;
use super::plan::{PlanContext, output_file_name};
use super::recommend::{BatchClassification, RecommendationResult, recommend, recommend_batch};
use super::source::ImageSource;
use crate::config::ResizeConfig;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Everything known about one input without converting it.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub path: PathBuf,
    pub raw: bool,
    pub classification: ImageClassification,
    /// `None` when every dimension source failed; see `dimension_error`.
    pub dimensions: Option<ResolvedDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_error: Option<String>,
    pub recommendation: RecommendationResult,
}

/// Classify, measure and recommend formats for one file.
///
/// Classification and dimension lookup are independent; a dimension
/// failure is recorded rather than aborting the inspection.
pub fn inspect(
    backend: &impl ConversionBackend,
    path: &Path,
    config: &ResizeConfig,
    available: &AvailableFormatSet,
) -> Inspection {
    let source = ImageSource::from_path(path);
    let classification = source.classify(&config.classifier);
    let (dimensions, dimension_error) = match source.resolve_dimensions(backend, &config.raw) {
        Ok(d) => (Some(d), None),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "dimensions unavailable");
            (None, Some(e.to_string()))
        }
    };
    let recommendation = recommend(&classification, available);

    Inspection {
        path: path.to_path_buf(),
        raw: source.is_raw(),
        classification,
        dimensions,
        dimension_error,
        recommendation,
    }
}

/// Shared recommendation for a set of files.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecommendation {
    pub members: Vec<(PathBuf, ImageClassification)>,
    pub summary: BatchClassification,
    pub recommendation: RecommendationResult,
}

/// Classify every file in parallel, then recommend once for the whole set.
pub fn recommend_for_paths(
    paths: &[PathBuf],
    config: &ResizeConfig,
    available: &AvailableFormatSet,
) -> BatchRecommendation {
    let members: Vec<(PathBuf, ImageClassification)> = paths
        .par_iter()
        .map(|p| {
            let c = ImageSource::from_path(p).classify(&config.classifier);
            (p.clone(), c)
        })
        .collect();
    let (summary, recommendation) = recommend_batch(members.iter().map(|(_, c)| c), available);

    BatchRecommendation {
        members,
        summary,
        recommendation,
    }
}

/// One file to convert and how.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    pub source: PathBuf,
    pub request: ConversionRequest,
}

#[derive(Debug)]
pub struct ItemFailure {
    pub source: PathBuf,
    pub error: ConvertError,
}

/// Outcome of a batch: every item lands in exactly one list.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Convert one file into the output root as `<stem>_rsz.<ext>`.
pub fn convert_one(
    backend: &impl ConversionBackend,
    source: &Path,
    request: &ConversionRequest,
    ctx: PlanContext<'_>,
) -> Result<PathBuf, ConvertError> {
    let name = output_file_name(&ImageSource::from_path(source), request.format.as_deref());
    convert_named(backend, source, &name, request, ctx)
}

fn convert_named(
    backend: &impl ConversionBackend,
    source: &Path,
    file_name: &str,
    request: &ConversionRequest,
    ctx: PlanContext<'_>,
) -> Result<PathBuf, ConvertError> {
    let source = ImageSource::from_path(source);
    let destination = ctx.roots.output().join(file_name);
    let plan = source.build_plan(backend, &destination, request, ctx)?;
    execute(backend, plan)
}

/// Output file names for a batch, in job order.
///
/// Inputs that would land on the same `<stem>_rsz.<ext>` (`a.png` and
/// `a.gif` both converted to WEBP) get `_1`, `_2`, ... appended to the stem
/// in order of appearance, so no two items write the same file.
pub fn batch_file_names(jobs: &[ConvertJob]) -> Vec<String> {
    let mut taken = HashSet::new();
    jobs.iter()
        .map(|job| {
            let name = output_file_name(
                &ImageSource::from_path(&job.source),
                job.request.format.as_deref(),
            );
            let (stem, extension) = name.rsplit_once('.').unwrap_or((name.as_str(), ""));
            let mut candidate = name.clone();
            let mut n = 1;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{stem}_{n}.{extension}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Convert many files in parallel. One item failing never stops the others.
pub fn convert_batch(
    backend: &impl ConversionBackend,
    jobs: &[ConvertJob],
    ctx: PlanContext<'_>,
) -> BatchReport {
    let names = batch_file_names(jobs);
    let results: Vec<(PathBuf, Result<PathBuf, ConvertError>)> = jobs
        .par_iter()
        .zip(&names)
        .map(|(job, name)| {
            let result = convert_named(backend, &job.source, name, &job.request, ctx);
            if let Err(e) = &result {
                tracing::warn!(source = %job.source.display(), error = %e, "conversion failed");
            }
            (job.source.clone(), result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (source, result) in results {
        match result {
            Ok(output) => report.outputs.push(output),
            Err(error) => report.failures.push(ItemFailure { source, error }),
        }
    }
    report
}
