//! Domain types for envx
//!
//! The shared vocabulary between the advisor, the plan validator, the step
//! executor and the orchestrator. No behavior beyond small accessors.

mod action;
mod manifest;
mod outcome;

pub use action::{ActionKind, ActionSpec, ParamValue};
pub use manifest::{DependencyManifest, RequirementBundle};
pub use outcome::{ExecutionOutcome, RunReport, RunState};

/// A candidate action exactly as the advisor returned it, before validation
pub type RawAction = serde_json::Value;

/// Ordered sequence of validated actions; execution order is list order
pub type Plan = Vec<ActionSpec>;
