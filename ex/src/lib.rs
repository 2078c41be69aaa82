//! envx - LLM-planned Python environment provisioning
//!
//! envx reads a project's requirement artifacts, asks an advisor (a language
//! model) for a dependency manifest and then for an ordered provisioning plan,
//! validates that plan against a closed action vocabulary and executes it
//! step by step on the host.
//!
//! # Core Concepts
//!
//! - **Untrusted Advisor**: replies are parsed strictly and validated before
//!   anything runs; unknown actions abort the run with nothing executed
//! - **Closed Vocabulary**: four action kinds, dispatched by exhaustive match
//! - **Run-Scoped State**: the active conda environment lives in the run,
//!   never in process-global state
//! - **Fail Fast**: the first failing step ends the run; nothing is rolled back
//!
//! # Modules
//!
//! - [`domain`] - ActionSpec, manifests, outcomes and the run report
//! - [`collect`] - Requirement artifact collection
//! - [`llm`] - LLM client trait and OpenAI-compatible implementation
//! - [`advisor`] - Advisor trait and the LLM-backed advisor
//! - [`plan`] - Plan validation
//! - [`executor`] - Step execution through a command runner
//! - [`orchestrator`] - The run state machine
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod advisor;
pub mod cli;
pub mod collect;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod llm;
pub mod orchestrator;
pub mod plan;
pub mod prompts;
pub mod report;

// Re-export commonly used types
pub use advisor::{Advisor, AdvisorError, LlmAdvisor, PlanTarget};
pub use collect::{CollectError, collect_requirements};
pub use config::{Config, ConfigError, ExecutorConfig, LlmConfig};
pub use domain::{
    ActionKind, ActionSpec, DependencyManifest, ExecutionOutcome, ParamValue, Plan, RawAction, RequirementBundle,
    RunReport, RunState,
};
pub use error::EnvxError;
pub use executor::{ActiveEnvironment, CommandRunner, StepError, StepExecutor, SystemRunner};
pub use orchestrator::{NoProgress, Orchestrator, ProgressEvent, ProgressSink, RunFailure};
pub use plan::{PlanError, PlanValidator};
