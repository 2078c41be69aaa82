//! Run-scoped record of which interpreter later installs target

use std::path::{Path, PathBuf};

/// The environment subsequent `install_package` steps install into
///
/// Owned by one run and threaded through the executor by `&mut`; starts as
/// `Ambient` and only `create_conda_env` changes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveEnvironment {
    /// The configured host interpreter
    #[default]
    Ambient,
    /// A conda environment at `prefix`
    Conda { name: String, prefix: PathBuf },
}

impl ActiveEnvironment {
    /// Interpreter to run `-m pip` with
    pub fn interpreter(&self, ambient: &str) -> String {
        match self {
            Self::Ambient => ambient.to_string(),
            Self::Conda { prefix, .. } => conda_python(prefix).to_string_lossy().into_owned(),
        }
    }

    /// Short description for logs and outcome messages
    pub fn describe(&self) -> String {
        match self {
            Self::Ambient => "ambient interpreter".to_string(),
            Self::Conda { name, .. } => format!("conda env '{}'", name),
        }
    }
}

/// Python executable inside a conda prefix
pub fn conda_python(prefix: &Path) -> PathBuf {
    if cfg!(windows) {
        prefix.join("python.exe")
    } else {
        prefix.join("bin").join("python")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_uses_configured_python() {
        assert_eq!(ActiveEnvironment::Ambient.interpreter("python3.11"), "python3.11");
    }

    #[cfg(unix)]
    #[test]
    fn test_conda_uses_prefix_python() {
        let env = ActiveEnvironment::Conda {
            name: "proj".to_string(),
            prefix: PathBuf::from("/opt/conda/envs/proj"),
        };
        assert_eq!(env.interpreter("python3"), "/opt/conda/envs/proj/bin/python");
        assert_eq!(env.describe(), "conda env 'proj'");
    }
}
