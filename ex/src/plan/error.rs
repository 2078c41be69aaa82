//! Plan validation error types

use thiserror::Error;

use crate::domain::ActionKind;

/// Structural problems with an advisor plan; never retried
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Step {index}: unknown action kind '{kind}'")]
    UnknownActionKind { index: usize, kind: String },

    #[error("Step {index}: {kind} is missing required parameter '{param}'")]
    MissingParameter {
        index: usize,
        kind: ActionKind,
        param: &'static str,
    },

    #[error("Step {index}: malformed action: {reason}")]
    MalformedAction { index: usize, reason: String },

    #[error("Step {index}: unsupported installer '{method}' (only pip is supported)")]
    UnsupportedInstaller { index: usize, method: String },
}
