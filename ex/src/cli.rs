//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::advisor::PlanTarget;
use crate::executor::DEFAULT_PYTHON_VERSION;

/// envx - provision Python project environments from an LLM-generated plan
#[derive(Debug, Parser)]
#[command(
    name = "envx",
    about = "Analyze a project's requirements and provision its Python environment",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze, plan and execute: provision the project's environment
    Configure {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the inferred dependency manifest as JSON
    Analyze {
        /// Project directory to inspect
        #[arg(value_name = "PROJECT_PATH")]
        project: PathBuf,

        /// API key (overrides environment and config file)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Print the validated plan as JSON without executing it
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments shared by `configure` and `plan`
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Project directory to provision
    #[arg(value_name = "PROJECT_PATH")]
    pub project: PathBuf,

    /// API key (overrides environment and config file)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Kind of environment to create
    #[arg(long, value_enum, default_value_t = EnvType::Conda)]
    pub env_type: EnvType,

    /// Environment name (defaults to the project directory name)
    #[arg(long)]
    pub env_name: Option<String>,

    /// Python version for the new environment
    #[arg(long, default_value = DEFAULT_PYTHON_VERSION)]
    pub python_version: String,
}

impl TargetArgs {
    /// Plan target with the environment name defaulted from the project path
    pub fn plan_target(&self) -> PlanTarget {
        debug!(project = ?self.project, "TargetArgs::plan_target: called");
        PlanTarget {
            env_type: self.env_type.as_str().to_string(),
            env_name: self
                .env_name
                .clone()
                .unwrap_or_else(|| default_env_name(&self.project)),
            python_version: self.python_version.clone(),
        }
    }
}

/// Target environment kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvType {
    Conda,
    Venv,
    Docker,
}

impl EnvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvType::Conda => "conda",
            EnvType::Venv => "venv",
            EnvType::Docker => "docker",
        }
    }
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML (API key redacted)
    Show,
    /// Print the user config file path
    Path,
}

/// Final component of the project path, canonicalized when possible so `.`
/// yields the directory's real name
pub fn default_env_name(project: &Path) -> String {
    let resolved = project.canonicalize().unwrap_or_else(|_| project.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "myenv".to_string())
}
