//! Advisor error types

use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by an [`Advisor`](super::Advisor)
///
/// Both are fatal to the run. `Unavailable` may succeed if the caller
/// re-invokes the whole run; `Response` usually will not.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The reply could not be parsed into the expected structure
    #[error("Advisor response could not be parsed: {0}")]
    Response(String),

    /// Transport, authentication, rate-limit or timeout failure
    #[error("Advisor unavailable: {message}")]
    Unavailable { message: String, auth: bool },

    /// A prompt template failed to load or render
    #[error("Advisor prompt error: {0}")]
    Prompt(String),
}

impl AdvisorError {
    /// Whether the failure looks like a rejected or missing credential
    pub fn is_auth(&self) -> bool {
        matches!(self, AdvisorError::Unavailable { auth: true, .. })
    }
}

impl From<LlmError> for AdvisorError {
    fn from(err: LlmError) -> Self {
        if err.is_malformed_reply() {
            AdvisorError::Response(err.to_string())
        } else {
            AdvisorError::Unavailable {
                auth: err.is_auth(),
                message: err.to_string(),
            }
        }
    }
}
