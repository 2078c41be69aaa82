//! Top-level error for envx runs

use thiserror::Error;

use crate::advisor::AdvisorError;
use crate::collect::CollectError;
use crate::config::ConfigError;
use crate::domain::ActionSpec;
use crate::executor::StepError;
use crate::llm::LlmError;
use crate::plan::PlanError;

/// Every way a run can stop; all are fatal and nothing is rolled back
#[derive(Debug, Error)]
pub enum EnvxError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Step {index} ({}) failed: {source}", .action.summary())]
    Step {
        index: usize,
        action: ActionSpec,
        source: StepError,
    },
}

impl EnvxError {
    /// Stable short name printed as `error[<kind>]`
    pub fn kind(&self) -> &'static str {
        match self {
            EnvxError::Config(ConfigError::MissingApiKey { .. }) => "missing-api-key",
            EnvxError::Config(ConfigError::Read { .. }) => "config-read",
            EnvxError::Config(ConfigError::Parse { .. }) => "config-parse",
            EnvxError::Collect(CollectError::ProjectNotFound(_)) => "project-not-found",
            EnvxError::Collect(CollectError::Io { .. }) => "io",
            EnvxError::Llm(_) => "llm-client",
            EnvxError::Advisor(AdvisorError::Response(_)) => "advisor-response",
            EnvxError::Advisor(AdvisorError::Unavailable { .. }) => "advisor-unavailable",
            EnvxError::Advisor(AdvisorError::Prompt(_)) => "advisor-prompt",
            EnvxError::Plan(PlanError::UnknownActionKind { .. }) => "unknown-action-kind",
            EnvxError::Plan(PlanError::MissingParameter { .. }) => "missing-parameter",
            EnvxError::Plan(PlanError::MalformedAction { .. }) => "malformed-action",
            EnvxError::Plan(PlanError::UnsupportedInstaller { .. }) => "unsupported-installer",
            EnvxError::Step { source, .. } => source.kind(),
        }
    }

    /// Whether supplying a (different) API key could fix this
    pub fn is_credential(&self) -> bool {
        match self {
            EnvxError::Config(ConfigError::MissingApiKey { .. }) => true,
            EnvxError::Advisor(e) => e.is_auth(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;
    use crate::executor::CommandFailure;

    #[test]
    fn test_kinds() {
        let err: EnvxError = AdvisorError::Response("bad".to_string()).into();
        assert_eq!(err.kind(), "advisor-response");

        let err: EnvxError = PlanError::UnknownActionKind {
            index: 0,
            kind: "run_shell".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "unknown-action-kind");

        let err: EnvxError = ConfigError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "missing-api-key");
        assert!(err.is_credential());
    }

    #[test]
    fn test_step_error_carries_context() {
        let action = ActionSpec::new(ActionKind::InstallPackage).with_param("name", "numpy");
        let err = EnvxError::Step {
            index: 2,
            action,
            source: StepError::PackageInstall {
                spec: "numpy".to_string(),
                status: CommandFailure::Timeout { timeout_ms: 5 },
            },
        };

        assert_eq!(err.kind(), "package-install");
        assert!(!err.is_credential());
        assert_eq!(
            err.to_string(),
            "Step 2 (install_package{name=numpy}) failed: Failed to install numpy: timed out after 5ms"
        );
    }

    #[test]
    fn test_auth_failure_is_credential() {
        let err: EnvxError = AdvisorError::Unavailable {
            message: "API error 401".to_string(),
            auth: true,
        }
        .into();
        assert!(err.is_credential());
        assert_eq!(err.kind(), "advisor-unavailable");
    }
}
