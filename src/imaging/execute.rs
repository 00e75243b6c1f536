//! Running a [`ConversionPlan`] against a backend.
//!
//! The plan is taken by value: once execution returns, successfully or not,
//! the plan is dropped and its scratch files go with it.

use super::backend::{BackendError, ConversionBackend};
use super::plan::{CommandStep, ConversionPlan, PlanError, StepRole};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("conversion failed: {0}")]
    Backend(#[from] BackendError),
}

/// Run every step in order and return the output path.
///
/// A failed resize/convert step leaves no partial output behind.
pub fn execute(
    backend: &impl ConversionBackend,
    plan: ConversionPlan,
) -> Result<PathBuf, ConvertError> {
    for step in plan.steps() {
        tracing::debug!(
            tool = step.role.tool_name(),
            args = ?step.arguments,
            "running step"
        );
        if let Err(e) = run_step(backend, step) {
            if step.role == StepRole::ResizeConvert {
                remove_partial(&step.output);
            }
            return Err(e.into());
        }
    }
    let destination = plan.destination().to_path_buf();
    tracing::info!(output = %destination.display(), "converted");
    Ok(destination)
}

fn run_step(backend: &impl ConversionBackend, step: &CommandStep) -> Result<(), BackendError> {
    let stdout = backend.run_step(step)?;
    if step.role == StepRole::PreviewExtract {
        if stdout.is_empty() {
            return Err(BackendError::ToolFailed {
                tool: step.role.tool_name().to_string(),
                status: "empty output".to_string(),
                stderr: format!("no preview data in {}", step.input.display()),
            });
        }
        std::fs::write(&step.output, stdout)?;
    }
    Ok(())
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial output"),
    }
}
