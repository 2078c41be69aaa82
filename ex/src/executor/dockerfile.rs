//! Dockerfile rendering and writing

use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::StepError;

/// File name written into the target directory
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Embedded Dockerfile template
const TEMPLATE: &str = include_str!("../../templates/Dockerfile.hbs");

#[derive(Debug, Serialize)]
struct DockerfileContext<'a> {
    python_version: &'a str,
}

/// Render the Dockerfile for a Python base image tag
pub fn render_dockerfile(python_version: &str) -> Result<String, handlebars::RenderError> {
    debug!(%python_version, "render_dockerfile: called");
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(handlebars::no_escape);
    hbs.set_strict_mode(true);
    hbs.render_template(TEMPLATE, &DockerfileContext { python_version })
}

/// Render and write `<dir>/Dockerfile`, creating `dir` if needed
///
/// An existing Dockerfile is overwritten.
pub fn write_dockerfile(dir: &Path, python_version: &str) -> Result<PathBuf, StepError> {
    debug!(?dir, %python_version, "write_dockerfile: called");
    let path = dir.join(DOCKERFILE_NAME);
    let write_error = |message: String| StepError::DockerfileWrite {
        path: path.clone(),
        message,
    };

    let content = render_dockerfile(python_version).map_err(|e| write_error(e.to_string()))?;
    std::fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;
    std::fs::write(&path, content).map_err(|e| write_error(e.to_string()))?;

    debug!(?path, "write_dockerfile: written");
    Ok(path)
}
