//! Step execution error types

use std::path::PathBuf;
use thiserror::Error;

use super::runner::CommandFailure;
use crate::domain::ActionKind;

/// A step that could not be carried out; fatal to the run
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Failed to install {spec}: {status}")]
    PackageInstall { spec: String, status: CommandFailure },

    #[error("Failed to create virtual environment at {}: {message}", .path.display())]
    VenvCreation { path: PathBuf, message: String },

    #[error("Failed to create conda environment '{name}': {message}")]
    CondaEnvCreation { name: String, message: String },

    #[error("Failed to build image '{name}': {status}")]
    ContainerBuild { name: String, status: CommandFailure },

    #[error("Failed to write Dockerfile at {}: {message}", .path.display())]
    DockerfileWrite { path: PathBuf, message: String },

    /// The action reached the executor in a shape it cannot run
    #[error("Cannot execute {kind}: {reason}")]
    InvalidStep { kind: ActionKind, reason: String },
}

impl StepError {
    /// Stable short name for console output
    pub fn kind(&self) -> &'static str {
        match self {
            StepError::PackageInstall { .. } => "package-install",
            StepError::VenvCreation { .. } => "venv-creation",
            StepError::CondaEnvCreation { .. } => "conda-env-creation",
            StepError::ContainerBuild { .. } => "container-build",
            StepError::DockerfileWrite { .. } => "dockerfile-write",
            StepError::InvalidStep { .. } => "invalid-step",
        }
    }
}
