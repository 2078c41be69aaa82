//! Requirement collection from a project directory

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::RequirementBundle;

/// Files read from the project root, paired with their bundle keys
pub const ARTIFACTS: [(&str, &str); 5] = [
    ("README.md", "readme"),
    ("requirements.txt", "requirements.txt"),
    ("pyproject.toml", "pyproject.toml"),
    ("setup.py", "setup.py"),
    ("package.json", "package.json"),
];

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Project directory not found: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("Failed to inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Gather the well-known requirement artifacts present in `root`
///
/// Missing files are simply absent from the bundle. Files that exist but
/// cannot be read as UTF-8 text are skipped with a warning.
pub fn collect_requirements(root: &Path) -> Result<RequirementBundle, CollectError> {
    debug!(?root, "collect_requirements: called");
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CollectError::ProjectNotFound(root.to_path_buf()));
        }
        Err(source) => {
            return Err(CollectError::Io {
                path: root.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(CollectError::ProjectNotFound(root.to_path_buf()));
    }

    let mut bundle = RequirementBundle::new();
    for (file_name, key) in ARTIFACTS {
        let path = root.join(file_name);
        if !path.is_file() {
            debug!(?path, "collect_requirements: not present");
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(?path, bytes = content.len(), "collect_requirements: read");
                bundle = bundle.with_artifact(key, content);
            }
            Err(e) => warn!("Skipping unreadable {}: {}", path.display(), e),
        }
    }

    debug!(artifact_count = bundle.len(), "collect_requirements: done");
    Ok(bundle)
}
