//! Per-step outcomes and the run report that accumulates them

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::ActionSpec;

/// Orchestrator state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum RunState {
    #[default]
    Idle,
    CollectingRequirements,
    Analyzing,
    Planning,
    Validating,
    /// Executing the step at this zero-based index
    Executing(usize),
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::CollectingRequirements => write!(f, "collecting-requirements"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::Planning => write!(f, "planning"),
            Self::Validating => write!(f, "validating"),
            Self::Executing(i) => write!(f, "executing({})", i),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of executing one plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    /// Zero-based position in the plan
    pub index: usize,
    pub action: ActionSpec,
    pub success: bool,
    pub message: String,
}

impl ExecutionOutcome {
    pub fn success(index: usize, action: ActionSpec, message: impl Into<String>) -> Self {
        Self {
            index,
            action,
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(index: usize, action: ActionSpec, message: impl Into<String>) -> Self {
        Self {
            index,
            action,
            success: false,
            message: message.into(),
        }
    }
}

/// Everything one `configure` invocation did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub outcomes: Vec<ExecutionOutcome>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        let run_id = uuid::Uuid::now_v7().to_string();
        debug!(%run_id, "RunReport::new: called");
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Idle,
            outcomes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn transition(&mut self, next: RunState) {
        debug!(run_id = %self.run_id, from = %self.state, to = %next, "RunReport::transition: called");
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn record(&mut self, outcome: ExecutionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
