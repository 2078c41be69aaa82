//! Requirement inputs and the dependency manifest inferred from them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Raw text artifacts collected from a project, keyed by artifact name
///
/// Keys are `readme` for the README and the file name for dependency
/// manifests (`requirements.txt`, `pyproject.toml`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementBundle {
    artifacts: BTreeMap<String, String>,
}

impl RequirementBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used while collecting
    pub fn with_artifact(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.artifacts.insert(name.into(), content.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Pretty JSON rendering embedded into advisor prompts
    pub fn to_pretty_json(&self) -> String {
        debug!(artifact_count = self.artifacts.len(), "RequirementBundle::to_pretty_json: called");
        serde_json::to_string_pretty(&self.artifacts).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Python version plus package → version-constraint map
///
/// An empty constraint means "any version".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    pub python_version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl DependencyManifest {
    pub fn new(python_version: impl Into<String>) -> Self {
        Self {
            python_version: python_version.into(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, constraint: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), constraint.into());
        self
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
