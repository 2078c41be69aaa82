//! Console rendering of run progress and results
//!
//! Progress goes to stderr so JSON printed by `analyze` and `plan` stays
//! clean on stdout.

use colored::Colorize;
use std::path::Path;

use crate::advisor::PlanTarget;
use crate::domain::{ExecutionOutcome, RunReport, RunState};
use crate::orchestrator::{ProgressEvent, ProgressSink};

/// Prints run progress to stderr as it happens
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn notify(&self, event: ProgressEvent<'_>) {
        if let Some(line) = render_event(event) {
            eprintln!("{}", line);
        }
    }
}

/// One console line for an event, or None for events not worth showing
pub fn render_event(event: ProgressEvent<'_>) -> Option<String> {
    match event {
        ProgressEvent::Phase(state) => phase_label(state).map(|label| format!("{} {}", "==>".bright_cyan().bold(), label)),
        ProgressEvent::Collected(bundle) => {
            let names = bundle.names().collect::<Vec<_>>();
            if names.is_empty() {
                None
            } else {
                Some(format!("    found: {}", names.join(", ")))
            }
        }
        ProgressEvent::Analyzed(manifest) => Some(format!(
            "    python {} with {} dependencies",
            manifest.python_version,
            manifest.dependencies.len()
        )),
        ProgressEvent::Planned(plan) => Some(format!("    {} step(s) planned", plan.len())),
        ProgressEvent::StepStarted { index, total, action } => Some(format!(
            "{} [{}/{}] {}",
            "-->".cyan(),
            index + 1,
            total,
            action.summary()
        )),
        ProgressEvent::StepFinished(outcome) => Some(render_outcome(outcome)),
        ProgressEvent::Warning(message) => Some(format!("{} {}", "warning:".yellow().bold(), message)),
    }
}

fn phase_label(state: RunState) -> Option<&'static str> {
    match state {
        RunState::CollectingRequirements => Some("Collecting requirements"),
        RunState::Analyzing => Some("Analyzing dependencies"),
        RunState::Planning => Some("Planning configuration"),
        RunState::Validating => Some("Validating plan"),
        // Steps, completion and failure have their own lines
        RunState::Idle | RunState::Executing(_) | RunState::Completed | RunState::Failed => None,
    }
}

fn render_outcome(outcome: &ExecutionOutcome) -> String {
    if outcome.success {
        format!("    {} {}", "ok".green(), outcome.message)
    } else {
        format!("    {} {}", "failed".red().bold(), outcome.message)
    }
}

/// Header printed before a run starts
pub fn render_target(project: &Path, target: &PlanTarget) -> String {
    format!(
        "{}\n    project:     {}\n    environment: {} '{}'\n    python:      {}",
        "envx configure".bright_cyan().bold(),
        project.display(),
        target.env_type,
        target.env_name,
        target.python_version
    )
}

/// Final summary line for a finished run
pub fn render_summary(report: &RunReport) -> String {
    let elapsed = report
        .finished_at
        .map(|end| (end - report.started_at).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();
    match report.state {
        RunState::Completed => format!(
            "{} {} step(s) succeeded in {:.1}s (run {})",
            "Environment configured:".green().bold(),
            report.succeeded(),
            elapsed,
            report.run_id
        ),
        _ => format!(
            "{} {} succeeded, {} failed (run {})",
            "Configuration failed:".red().bold(),
            report.succeeded(),
            report.failed(),
            report.run_id
        ),
    }
}
