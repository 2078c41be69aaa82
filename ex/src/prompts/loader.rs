//! Prompt Loader
//!
//! Loads prompt templates from a project override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::domain::{DependencyManifest, RequirementBundle};

/// Context for rendering the `analyze` template
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeContext {
    /// Pretty JSON of the requirement bundle
    pub bundle: String,
    /// No artifacts were found in the project
    pub empty: bool,
}

impl AnalyzeContext {
    pub fn new(bundle: &RequirementBundle) -> Self {
        debug!(artifact_count = bundle.len(), "AnalyzeContext::new: called");
        Self {
            bundle: bundle.to_pretty_json(),
            empty: bundle.is_empty(),
        }
    }
}

/// Context for rendering the `plan` template
#[derive(Debug, Clone, Serialize)]
pub struct PlanContext {
    /// Pretty JSON of the dependency manifest
    pub manifest: String,
    pub env_type: String,
    pub env_name: String,
    pub python_version: String,
    /// Environment type booleans for conditional rendering
    pub is_conda: bool,
    pub is_venv: bool,
    pub is_docker: bool,
}

impl PlanContext {
    pub fn new(manifest: &DependencyManifest, env_type: &str, env_name: &str, python_version: &str) -> Self {
        debug!(%env_type, %env_name, %python_version, "PlanContext::new: called");
        Self {
            manifest: manifest.to_pretty_json(),
            env_type: env_type.to_string(),
            env_name: env_name.to_string(),
            python_version: python_version.to_string(),
            is_conda: env_type == "conda",
            is_venv: env_type == "venv",
            is_docker: env_type == "docker",
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.envx/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at a project directory
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let project_root = project_root.as_ref();
        debug!(?project_root, "PromptLoader::new: called");
        let user_dir = project_root.join(".envx/prompts");

        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: checking override directory");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts embed raw JSON; HTML escaping would corrupt quotes
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.set_strict_mode(true);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.envx/prompts/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// The shared JSON-only system prompt
    pub fn system_prompt(&self) -> Result<String> {
        debug!("PromptLoader::system_prompt: called");
        self.load_template("system")
    }
}
