//! Advisor capability
//!
//! Translates unstructured project requirements into a dependency manifest,
//! and a manifest plus target parameters into an ordered list of candidate
//! actions. The default implementation asks a language model; tests swap in
//! fixed fixtures.

use async_trait::async_trait;

mod error;
mod llm;
pub mod parse;

pub use error::AdvisorError;
pub use llm::LlmAdvisor;

use crate::domain::{DependencyManifest, RawAction, RequirementBundle};

/// Target environment parameters passed to [`Advisor::plan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTarget {
    /// `conda`, `venv` or `docker`
    pub env_type: String,
    pub env_name: String,
    pub python_version: String,
}

/// Pluggable, potentially unreliable source of manifests and plans
///
/// Implementations must not retry on unparseable replies and must not guess
/// partial results.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Infer the dependency manifest from collected artifacts
    async fn analyze(&self, bundle: &RequirementBundle) -> Result<DependencyManifest, AdvisorError>;

    /// Produce the ordered candidate actions for a manifest and target
    ///
    /// Environment creation is expected before any install that depends on it;
    /// callers do not reorder.
    async fn plan(&self, manifest: &DependencyManifest, target: &PlanTarget) -> Result<Vec<RawAction>, AdvisorError>;
}
