//! Subprocess backend: ImageMagick for pixels, ExifTool for RAW metadata.
//!
//! Tools are located on `PATH` once, when the backend is built. ImageMagick 7
//! ships a single `magick` entry point; when it is missing, the ImageMagick 6
//! pair `convert` + `identify` is used instead. ExifTool is optional until a
//! RAW file shows up.

use super::backend::{BackendError, ConversionBackend};
use super::plan::{CommandStep, StepRole, safe_path_arg};
use crate::config::ToolsConfig;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

#[derive(Debug, Clone)]
enum Magick {
    /// `magick <args>`, `magick identify <args>`.
    V7(PathBuf),
    /// `convert <args>`, `identify <args>`.
    Legacy { convert: PathBuf, identify: PathBuf },
}

#[derive(Debug, Clone)]
pub struct MagickBackend {
    magick: Option<Magick>,
    exiftool: Option<PathBuf>,
    magick_name: String,
    exiftool_name: String,
}

impl MagickBackend {
    pub fn new(tools: &ToolsConfig) -> Self {
        let magick = match which::which(&tools.magick) {
            Ok(path) => Some(Magick::V7(path)),
            Err(_) => match (which::which("convert"), which::which("identify")) {
                (Ok(convert), Ok(identify)) => {
                    tracing::info!(
                        wanted = %tools.magick,
                        "magick not found, using ImageMagick 6 convert/identify"
                    );
                    Some(Magick::Legacy { convert, identify })
                }
                _ => {
                    tracing::warn!(tool = %tools.magick, "ImageMagick not found on PATH");
                    None
                }
            },
        };
        let exiftool = which::which(&tools.exiftool)
            .inspect_err(|_| {
                tracing::debug!(tool = %tools.exiftool, "exiftool not found; RAW input unsupported")
            })
            .ok();

        Self {
            magick,
            exiftool,
            magick_name: tools.magick.clone(),
            exiftool_name: tools.exiftool.clone(),
        }
    }

    /// Whether each tool was found, as `(magick, exiftool)`.
    pub fn tools_found(&self) -> (bool, bool) {
        (self.magick.is_some(), self.exiftool.is_some())
    }

    fn magick(&self) -> Result<&Magick, BackendError> {
        self.magick.as_ref().ok_or_else(|| BackendError::ToolMissing {
            tool: self.magick_name.clone(),
        })
    }

    fn exiftool(&self) -> Result<&Path, BackendError> {
        self.exiftool
            .as_deref()
            .ok_or_else(|| BackendError::ToolMissing {
                tool: self.exiftool_name.clone(),
            })
    }

    /// Program and leading arguments for a plain conversion.
    fn convert_command(&self) -> Result<(&Path, &'static [&'static str]), BackendError> {
        let no_args: &'static [&'static str] = &[];
        Ok(match self.magick()? {
            Magick::V7(path) => (path.as_path(), no_args),
            Magick::Legacy { convert, .. } => (convert.as_path(), no_args),
        })
    }

    fn identify_command(&self) -> Result<(&Path, &'static [&'static str]), BackendError> {
        let subcommand: &'static [&'static str] = &["identify"];
        Ok(match self.magick()? {
            Magick::V7(path) => (path.as_path(), subcommand),
            Magick::Legacy { identify, .. } => (identify.as_path(), &subcommand[..0]),
        })
    }
}

fn spawn<I, S>(program: &Path, args: I) -> std::io::Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    tracing::debug!(command = ?cmd, "spawning");
    cmd.output()
}

fn tool_failed(tool: &str, output: &Output) -> BackendError {
    BackendError::ToolFailed {
        tool: tool.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

/// Spawn `program`, wait, and return stdout. Non-zero exit is an error.
fn run<I, S>(tool: &str, program: &Path, args: I) -> Result<Vec<u8>, BackendError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = spawn(program, args)?;
    if !output.status.success() {
        return Err(tool_failed(tool, &output));
    }
    Ok(output.stdout)
}

/// Like [`run`] for metadata lookups: ExifTool exits non-zero without a
/// word when none of the requested tags exist, so a silent failure yields
/// empty stdout. A failure that explains itself on stderr is still an error.
fn run_lookup<I, S>(tool: &str, program: &Path, args: I) -> Result<Vec<u8>, BackendError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = spawn(program, args)?;
    if output.status.success() {
        return Ok(output.stdout);
    }
    if output.stdout.is_empty() && output.stderr.trim_ascii().is_empty() {
        tracing::debug!(tool, status = %output.status, "no matching tags");
        return Ok(Vec::new());
    }
    Err(tool_failed(tool, &output))
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

impl ConversionBackend for MagickBackend {
    fn list_formats(&self) -> Result<String, BackendError> {
        let (program, _) = self.convert_command()?;
        run(&self.magick_name, program, ["-list", "format"]).map(lossy)
    }

    fn identify(&self, path: &Path) -> Result<String, BackendError> {
        let (program, prefix) = self.identify_command()?;
        let args = prefix
            .iter()
            .map(|a| a.to_string())
            .chain([safe_path_arg(path).into_owned()]);
        run(&self.magick_name, program, args).map(lossy)
    }

    fn read_tags(&self, path: &Path, tags: &[&str]) -> Result<String, BackendError> {
        let args = ["-s3".to_string()]
            .into_iter()
            .chain(tags.iter().map(|t| format!("-{t}")))
            .chain([safe_path_arg(path).into_owned()]);
        run_lookup(&self.exiftool_name, self.exiftool()?, args).map(lossy)
    }

    fn extract_tag(&self, path: &Path, tag: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let args = [
            "-b".to_string(),
            format!("-{tag}"),
            safe_path_arg(path).into_owned(),
        ];
        let bytes = run_lookup(&self.exiftool_name, self.exiftool()?, args)?;
        Ok((!bytes.is_empty()).then_some(bytes))
    }

    fn run_step(&self, step: &CommandStep) -> Result<Vec<u8>, BackendError> {
        match step.role {
            StepRole::PreviewExtract => {
                run(&self.exiftool_name, self.exiftool()?, &step.arguments)
            }
            StepRole::ResizeConvert => {
                let (program, prefix) = self.convert_command()?;
                run(
                    &self.magick_name,
                    program,
                    prefix.iter().copied().chain(step.arguments.iter().map(String::as_str)),
                )
            }
        }
    }
}
