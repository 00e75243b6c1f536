//! Conversion command synthesis.
//!
//! A [`ConversionPlan`] is the full list of external invocations for one
//! request, built before anything is spawned:
//!
//! ```text
//! standard:  magick <src> [-auto-gamma] [-auto-level] [-resize T] [-unsharp G] -quality Q <dst>
//! RAW:       exiftool -b -<JpgFromRaw|PreviewImage> <src>      > <scratch>.jpg
//!            magick <scratch>.jpg ... -quality Q <dst>
//! ```
//!
//! Everything that can be rejected (parameters, output format, paths, a RAW
//! file without a preview) is rejected here, so a plan that exists is a plan
//! the executor can run. Scratch files are owned by the plan as
//! [`TempPath`]s and vanish when it is dropped.

use super::backend::{BackendError, ConversionBackend};
use super::formats::AvailableFormatSet;
use super::params::{ConversionRequest, ResizeSpec, ValidationError};
use super::source::ImageSource;
use crate::config::LimitsConfig;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;

/// Embedded previews tried for RAW input, best first.
pub const PREVIEW_TAGS: [&str; 2] = ["JpgFromRaw", "PreviewImage"];

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("{} has no embedded preview to convert", .0.display())]
    NoPreview(PathBuf),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a step does, and therefore which tool runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    /// Dump an embedded JPEG preview from a RAW file to stdout.
    PreviewExtract,
    /// Resize, adjust and encode the final output.
    ResizeConvert,
}

impl StepRole {
    /// Default program name; the backend maps this to its configured path.
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::PreviewExtract => "exiftool",
            Self::ResizeConvert => "magick",
        }
    }
}

/// One external invocation. `arguments` excludes the program itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandStep {
    pub role: StepRole,
    pub arguments: Vec<String>,
    pub input: PathBuf,
    /// For [`StepRole::PreviewExtract`], the file stdout is written to.
    pub output: PathBuf,
}

/// Ordered steps plus the scratch files they share.
#[derive(Debug)]
pub struct ConversionPlan {
    steps: Vec<CommandStep>,
    scratch: Vec<TempPath>,
    destination: PathBuf,
}

impl ConversionPlan {
    pub fn steps(&self) -> &[CommandStep] {
        &self.steps
    }

    /// Final output file.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn scratch_paths(&self) -> impl Iterator<Item = &Path> {
        self.scratch.iter().map(|p| &**p)
    }
}

/// Input and output directories, canonicalized once.
#[derive(Debug, Clone)]
pub struct WorkRoots {
    input: PathBuf,
    output: PathBuf,
}

impl WorkRoots {
    pub fn new(input: &Path, output: &Path) -> std::io::Result<Self> {
        Ok(Self {
            input: input.canonicalize()?,
            output: output.canonicalize()?,
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Everything plan synthesis reads besides the request itself.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub roots: &'a WorkRoots,
    pub available: &'a AvailableFormatSet,
    pub limits: &'a LimitsConfig,
}

/// Resolve and confine both paths of a conversion.
///
/// Returns the canonical source and the destination rebuilt under the
/// canonical output directory. The destination itself need not exist yet.
pub fn validate_paths(
    roots: &WorkRoots,
    source: &Path,
    destination: &Path,
) -> Result<(PathBuf, PathBuf), ValidationError> {
    let source_canon = source
        .canonicalize()
        .map_err(|e| ValidationError::InvalidPath {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !source_canon.starts_with(&roots.input) {
        return Err(ValidationError::PathEscapesRoot {
            path: source.to_path_buf(),
            root: roots.input.clone(),
        });
    }

    let name = plain_file_name(destination)?;
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let parent_canon = parent
        .canonicalize()
        .map_err(|e| ValidationError::InvalidPath {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !parent_canon.starts_with(&roots.output) {
        return Err(ValidationError::PathEscapesRoot {
            path: destination.to_path_buf(),
            root: roots.output.clone(),
        });
    }

    Ok((source_canon, parent_canon.join(name)))
}

fn plain_file_name(path: &Path) -> Result<&std::ffi::OsStr, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidPath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    match path.components().next_back() {
        Some(Component::Normal(name)) => {
            if name.to_string_lossy().starts_with('-') {
                Err(invalid("file name must not start with '-'"))
            } else {
                Ok(name)
            }
        }
        _ => Err(invalid("destination must end in a plain file name")),
    }
}

/// Render a path so a tool never mistakes it for an option.
pub fn safe_path_arg(path: &Path) -> Cow<'_, str> {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        Cow::Owned(format!("./{s}"))
    } else {
        s
    }
}

/// ImageMagick `-resize` geometry for a spec.
///
/// | spec | keep_aspect | no_enlarge | token |
/// |---|---|---|---|
/// | box | no | - | `WxH!` |
/// | box | yes | no | `WxH` |
/// | box | yes | yes | `WxH>` |
/// | percentage | - | - | `P%` |
pub fn resize_token(spec: ResizeSpec, keep_aspect: bool, no_enlarge: bool) -> String {
    match spec {
        ResizeSpec::Box { width, height } if !keep_aspect => format!("{width}x{height}!"),
        ResizeSpec::Box { width, height } if no_enlarge => format!("{width}x{height}>"),
        ResizeSpec::Box { width, height } => format!("{width}x{height}"),
        ResizeSpec::Percentage(p) => format!("{p}%"),
    }
}

/// Argument vector for the resize/convert step.
///
/// Order is fixed: input, auto-gamma, auto-level, resize, unsharp, quality,
/// output. Gamma is corrected before levels are stretched, and sharpening
/// runs after resampling.
pub fn convert_arguments(input: &Path, output: &str, request: &ConversionRequest) -> Vec<String> {
    let mut args = vec![safe_path_arg(input).into_owned()];
    let enhancements = &request.enhancements;

    if enhancements.auto_gamma {
        args.push("-auto-gamma".to_string());
    }
    if enhancements.auto_level {
        args.push("-auto-level".to_string());
    }
    if let Some(spec) = request.resize {
        args.push("-resize".to_string());
        args.push(resize_token(spec, request.keep_aspect, request.no_enlarge));
    }
    if let Some(tier) = enhancements.sharpen {
        args.push("-unsharp".to_string());
        args.push(tier.mask().to_geometry());
    }
    args.push("-quality".to_string());
    args.push(request.quality.value().to_string());
    args.push(output.to_string());
    args
}

/// `<stem>_rsz.<ext>`: the requested format lowercased, else the source's
/// own extension. RAW sources without a requested format become JPEG.
pub fn output_file_name(source: &ImageSource, format: Option<&str>) -> String {
    let path = source.path();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let extension = match format {
        Some(f) => f.to_ascii_lowercase(),
        None if source.is_raw() => "jpg".to_string(),
        None => path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_string()),
    };
    format!("{stem}_rsz.{extension}")
}

/// Validate a request and build its plan.
///
/// The only backend calls made are the preview-tag probes for RAW input.
pub fn synthesize_plan(
    backend: &impl ConversionBackend,
    source: &ImageSource,
    destination: &Path,
    request: &ConversionRequest,
    ctx: PlanContext<'_>,
) -> Result<ConversionPlan, PlanError> {
    if let Some(spec) = request.resize {
        spec.validate(ctx.limits)?;
    }
    let format = match &request.format {
        Some(f) if ctx.available.contains(f) => Some(f.to_ascii_uppercase()),
        Some(f) => return Err(ValidationError::UnsupportedFormat(f.to_ascii_uppercase()).into()),
        None => None,
    };
    let (source_path, destination) = validate_paths(ctx.roots, source.path(), destination)?;

    let output_arg = match &format {
        Some(f) => format!("{f}:{}", destination.display()),
        None => safe_path_arg(&destination).into_owned(),
    };

    let mut steps = Vec::with_capacity(2);
    let mut scratch = Vec::new();

    let convert_input = if source.is_raw() {
        let tag = find_preview_tag(backend, &source_path)?;
        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "raw".to_string());
        let preview = tempfile::Builder::new()
            .prefix(&format!("{stem}_preview_"))
            .suffix(".jpg")
            .tempfile_in(ctx.roots.output())?
            .into_temp_path();
        let preview_path = preview.to_path_buf();
        scratch.push(preview);

        steps.push(CommandStep {
            role: StepRole::PreviewExtract,
            arguments: vec![
                "-b".to_string(),
                format!("-{tag}"),
                safe_path_arg(&source_path).into_owned(),
            ],
            input: source_path.clone(),
            output: preview_path.clone(),
        });
        preview_path
    } else {
        source_path
    };

    steps.push(CommandStep {
        role: StepRole::ResizeConvert,
        arguments: convert_arguments(&convert_input, &output_arg, request),
        input: convert_input,
        output: destination.clone(),
    });

    for step in &steps {
        tracing::debug!(
            tool = step.role.tool_name(),
            args = ?step.arguments,
            "planned step"
        );
    }

    Ok(ConversionPlan {
        steps,
        scratch,
        destination,
    })
}

fn find_preview_tag(
    backend: &impl ConversionBackend,
    path: &Path,
) -> Result<&'static str, PlanError> {
    for tag in PREVIEW_TAGS {
        if backend.has_tag(path, tag)? {
            tracing::info!(path = %path.display(), tag, "using embedded RAW preview");
            return Ok(tag);
        }
        tracing::debug!(path = %path.display(), tag, "preview tag absent");
    }
    Err(PlanError::NoPreview(path.to_path_buf()))
}
