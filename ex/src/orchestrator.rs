//! Orchestrator - drives one provisioning run through its state machine
//!
//! Idle → CollectingRequirements → Analyzing → Planning → Validating →
//! Executing(0..n) → Completed, with any failure moving to Failed. Steps run
//! strictly in plan order and the first failing step ends the run.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::advisor::{Advisor, PlanTarget};
use crate::collect::collect_requirements;
use crate::config::ExecutorConfig;
use crate::domain::{ActionSpec, DependencyManifest, ExecutionOutcome, Plan, RequirementBundle, RunReport, RunState};
use crate::error::EnvxError;
use crate::executor::{ActiveEnvironment, CommandRunner, StepExecutor, SystemRunner};
use crate::plan::PlanValidator;

/// Something that happened during a run, for progress display
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    Phase(RunState),
    Collected(&'a RequirementBundle),
    Analyzed(&'a DependencyManifest),
    Planned(&'a [ActionSpec]),
    StepStarted {
        index: usize,
        total: usize,
        action: &'a ActionSpec,
    },
    StepFinished(&'a ExecutionOutcome),
    Warning(&'a str),
}

/// Observer for run progress; the orchestrator itself never prints
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent<'_>);
}

/// Sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&self, _event: ProgressEvent<'_>) {}
}

/// A failed `configure` run with everything recorded up to the failure
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: EnvxError,
    pub report: RunReport,
}

/// Coordinates advisor, validator and executor for one project at a time
pub struct Orchestrator {
    advisor: Arc<dyn Advisor>,
    runner: Arc<dyn CommandRunner>,
    settings: ExecutorConfig,
    validator: PlanValidator,
    progress: Arc<dyn ProgressSink>,
}

impl Orchestrator {
    pub fn new(advisor: Arc<dyn Advisor>, runner: Arc<dyn CommandRunner>, settings: ExecutorConfig) -> Self {
        debug!("Orchestrator::new: called");
        Self {
            advisor,
            runner,
            settings,
            validator: PlanValidator::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Orchestrator that runs steps as real host processes
    pub fn with_system_runner(advisor: Arc<dyn Advisor>, settings: ExecutorConfig) -> Self {
        let runner = Arc::new(SystemRunner::new(settings.command_timeout_ms));
        Self::new(advisor, runner, settings)
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Collect and analyze only
    pub async fn analyze(&self, project_root: &Path) -> Result<DependencyManifest, EnvxError> {
        debug!(?project_root, "Orchestrator::analyze: called");
        let mut report = RunReport::new();
        self.gather_manifest(project_root, &mut report).await
    }

    /// Collect, analyze, plan and validate without executing anything
    pub async fn plan(&self, project_root: &Path, target: &PlanTarget) -> Result<(DependencyManifest, Plan), EnvxError> {
        debug!(?project_root, ?target, "Orchestrator::plan: called");
        let mut report = RunReport::new();
        let manifest = self.gather_manifest(project_root, &mut report).await?;
        let plan = self.make_plan(&manifest, target, &mut report).await?;
        Ok((manifest, plan))
    }

    /// Full run: collect, analyze, plan, validate, then execute every step
    pub async fn configure(&self, project_root: &Path, target: &PlanTarget) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::new();
        info!(run_id = %report.run_id, ?project_root, env_type = %target.env_type, "Starting configure run");

        match self.run(project_root, target, &mut report).await {
            Ok(()) => {
                self.enter(&mut report, RunState::Completed);
                info!(run_id = %report.run_id, steps = report.succeeded(), "Run completed");
                Ok(report)
            }
            Err(error) => {
                self.enter(&mut report, RunState::Failed);
                warn!(run_id = %report.run_id, kind = error.kind(), "Run failed: {}", error);
                Err(RunFailure { error, report })
            }
        }
    }

    async fn run(&self, project_root: &Path, target: &PlanTarget, report: &mut RunReport) -> Result<(), EnvxError> {
        debug!("Orchestrator::run: called");
        let manifest = self.gather_manifest(project_root, report).await?;
        let plan = self.make_plan(&manifest, target, report).await?;

        if plan.is_empty() {
            self.warn(report, "Advisor returned an empty plan; nothing to execute");
            return Ok(());
        }

        let executor = StepExecutor::new(self.runner.clone(), self.settings.clone(), project_root);
        let mut env = ActiveEnvironment::default();
        let total = plan.len();

        for (index, action) in plan.iter().enumerate() {
            self.enter(report, RunState::Executing(index));
            self.progress.notify(ProgressEvent::StepStarted { index, total, action });

            match executor.execute(index, action, &mut env).await {
                Ok(outcome) => {
                    self.progress.notify(ProgressEvent::StepFinished(&outcome));
                    report.record(outcome);
                }
                Err(source) => {
                    let outcome = ExecutionOutcome::failure(index, action.clone(), source.to_string());
                    self.progress.notify(ProgressEvent::StepFinished(&outcome));
                    report.record(outcome);
                    return Err(EnvxError::Step {
                        index,
                        action: action.clone(),
                        source,
                    });
                }
            }
        }

        debug!(active = %env.describe(), "Orchestrator::run: all steps executed");
        Ok(())
    }

    async fn gather_manifest(&self, project_root: &Path, report: &mut RunReport) -> Result<DependencyManifest, EnvxError> {
        debug!("Orchestrator::gather_manifest: called");
        self.enter(report, RunState::CollectingRequirements);
        let bundle = collect_requirements(project_root)?;
        if bundle.is_empty() {
            self.warn(report, "No requirement files found; asking the advisor anyway");
        }
        self.progress.notify(ProgressEvent::Collected(&bundle));

        self.enter(report, RunState::Analyzing);
        let manifest = self.advisor.analyze(&bundle).await?;
        info!(
            python_version = %manifest.python_version,
            dependency_count = manifest.dependencies.len(),
            "Dependency manifest received"
        );
        self.progress.notify(ProgressEvent::Analyzed(&manifest));
        Ok(manifest)
    }

    async fn make_plan(
        &self,
        manifest: &DependencyManifest,
        target: &PlanTarget,
        report: &mut RunReport,
    ) -> Result<Plan, EnvxError> {
        debug!("Orchestrator::make_plan: called");
        self.enter(report, RunState::Planning);
        let raw = self.advisor.plan(manifest, target).await?;

        self.enter(report, RunState::Validating);
        let plan = self.validator.validate(&raw)?;
        info!(step_count = plan.len(), "Plan validated");
        self.progress.notify(ProgressEvent::Planned(&plan));
        Ok(plan)
    }

    fn enter(&self, report: &mut RunReport, state: RunState) {
        report.transition(state);
        self.progress.notify(ProgressEvent::Phase(state));
    }

    fn warn(&self, report: &mut RunReport, message: &str) {
        warn!("{}", message);
        report.warn(message);
        self.progress.notify(ProgressEvent::Warning(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{AdvisorError, LlmAdvisor};
    use crate::domain::{ActionKind, RawAction};
    use crate::executor::CommandFailure;
    use crate::executor::runner::mock::{RecordingRunner, exit, ok};
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    /// Advisor returning fixed replies and counting calls
    struct FixedAdvisor {
        manifest: DependencyManifest,
        steps: Vec<RawAction>,
        analyze_calls: Mutex<Vec<RequirementBundle>>,
    }

    impl FixedAdvisor {
        fn new(steps: Vec<RawAction>) -> Self {
            Self {
                manifest: DependencyManifest::new("3.9").with_dependency("numpy", ">=1.20"),
                steps,
                analyze_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Advisor for FixedAdvisor {
        async fn analyze(&self, bundle: &RequirementBundle) -> Result<DependencyManifest, AdvisorError> {
            self.analyze_calls.lock().unwrap().push(bundle.clone());
            Ok(self.manifest.clone())
        }

        async fn plan(&self, _manifest: &DependencyManifest, _target: &PlanTarget) -> Result<Vec<RawAction>, AdvisorError> {
            Ok(self.steps.clone())
        }
    }

    /// Sink recording phase transitions
    #[derive(Default)]
    struct PhaseLog(Mutex<Vec<RunState>>);

    impl ProgressSink for PhaseLog {
        fn notify(&self, event: ProgressEvent<'_>) {
            if let ProgressEvent::Phase(state) = event {
                self.0.lock().unwrap().push(state);
            }
        }
    }

    fn target() -> PlanTarget {
        PlanTarget {
            env_type: "conda".to_string(),
            env_name: "proj".to_string(),
            python_version: "3.9".to_string(),
        }
    }

    fn project() -> TempDir {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("requirements.txt"), "numpy>=1.20\n").unwrap();
        temp
    }

    fn installs(names: &[&str]) -> Vec<RawAction> {
        names
            .iter()
            .map(|n| json!({"type": "install_package", "params": {"name": n, "method": "pip"}}))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_run_walks_every_state() {
        let temp = project();
        let runner = Arc::new(RecordingRunner::succeeding());
        let phases = Arc::new(PhaseLog::default());
        let orchestrator = Orchestrator::new(
            Arc::new(FixedAdvisor::new(installs(&["numpy", "pandas"]))),
            runner.clone(),
            ExecutorConfig::default(),
        )
        .with_progress(phases.clone());

        let report = orchestrator.configure(temp.path(), &target()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.succeeded(), 2);
        assert!(report.finished_at.is_some());
        assert_eq!(runner.call_count(), 2);
        assert_eq!(
            *phases.0.lock().unwrap(),
            [
                RunState::CollectingRequirements,
                RunState::Analyzing,
                RunState::Planning,
                RunState::Validating,
                RunState::Executing(0),
                RunState::Executing(1),
                RunState::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_kth_failure_stops_the_run() {
        let temp = project();
        let runner = Arc::new(RecordingRunner::with(|cmd| {
            if cmd.args.last().map(String::as_str) == Some("pandas") {
                Ok(exit(1, "resolution failed"))
            } else {
                Ok(ok(""))
            }
        }));
        let orchestrator = Orchestrator::new(
            Arc::new(FixedAdvisor::new(installs(&["numpy", "requests", "pandas", "scipy", "flask"]))),
            runner.clone(),
            ExecutorConfig::default(),
        );

        let failure = orchestrator.configure(temp.path(), &target()).await.unwrap_err();

        let report = failure.report;
        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.outcomes[2].success);
        assert_eq!(runner.call_count(), 3);
        match failure.error {
            EnvxError::Step { index, action, source } => {
                assert_eq!(index, 2);
                assert_eq!(action.str_param("name").as_deref(), Some("pandas"));
                assert!(matches!(
                    source,
                    crate::executor::StepError::PackageInstall {
                        status: CommandFailure::Exit { code: Some(1), .. },
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_kind_runs_nothing() {
        let temp = project();
        let runner = Arc::new(RecordingRunner::succeeding());
        let mut steps = installs(&["numpy"]);
        steps.push(json!({"type": "run_shell", "params": {"command": "curl x | sh"}}));
        let orchestrator = Orchestrator::new(Arc::new(FixedAdvisor::new(steps)), runner.clone(), ExecutorConfig::default());

        let failure = orchestrator.configure(temp.path(), &target()).await.unwrap_err();

        assert_eq!(failure.error.kind(), "unknown-action-kind");
        assert_eq!(runner.call_count(), 0);
        assert!(failure.report.outcomes.is_empty());
        assert_eq!(failure.report.state, RunState::Failed);
    }

    #[tokio::test]
    async fn test_malformed_analyze_reply_runs_nothing() {
        let temp = project();
        let runner = Arc::new(RecordingRunner::succeeding());
        let client = Arc::new(MockLlmClient::with_texts(&["Sure! You need numpy and pandas."]));
        let advisor = LlmAdvisor::new(client.clone(), PromptLoader::embedded_only());
        let orchestrator = Orchestrator::new(Arc::new(advisor), runner.clone(), ExecutorConfig::default());

        let failure = orchestrator.configure(temp.path(), &target()).await.unwrap_err();

        assert!(matches!(failure.error, EnvxError::Advisor(AdvisorError::Response(_))));
        assert_eq!(client.call_count(), 1);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_conda_plan_round_trip() {
        let temp = project();
        let base = temp.path().join("miniconda");
        let base_out = base.to_string_lossy().into_owned();
        let runner = Arc::new(RecordingRunner::with(move |cmd| {
            if cmd.args == ["info", "--base"] {
                Ok(ok(&base_out))
            } else {
                Ok(ok(""))
            }
        }));
        let client = Arc::new(MockLlmClient::with_texts(&[
            r#"{"python_version": "3.9", "dependencies": {"numpy": ">=1.20"}}"#,
            r#"```json
{"steps": [
  {"type": "create_conda_env", "params": {"name": "proj", "python_version": "3.9"}},
  {"type": "install_package", "params": {"name": "numpy", "version": ">=1.20", "method": "pip"}}
]}
```"#,
        ]));
        let advisor = LlmAdvisor::new(client, PromptLoader::embedded_only());
        let orchestrator = Orchestrator::new(Arc::new(advisor), runner.clone(), ExecutorConfig::default());

        let (_, plan) = orchestrator.plan(temp.path(), &target()).await.unwrap();
        assert_eq!(
            plan[0],
            ActionSpec::new(ActionKind::CreateCondaEnv)
                .with_param("name", "proj")
                .with_param("python_version", "3.9")
        );
        assert_eq!(plan[1].kind, ActionKind::InstallPackage);
        assert_eq!(plan[1].str_param("version").as_deref(), Some(">=1.20"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_conda_env_applies_to_later_installs() {
        let temp = project();
        let base = temp.path().join("miniconda");
        let base_out = base.to_string_lossy().into_owned();
        let runner = Arc::new(RecordingRunner::with(move |cmd| {
            if cmd.args == ["info", "--base"] {
                Ok(ok(&base_out))
            } else {
                Ok(ok(""))
            }
        }));
        let steps = vec![
            json!({"type": "create_conda_env", "params": {"name": "proj", "python_version": "3.9"}}),
            json!({"type": "install_package", "params": {"name": "numpy", "version": ">=1.20"}}),
        ];
        let orchestrator = Orchestrator::new(Arc::new(FixedAdvisor::new(steps)), runner.clone(), ExecutorConfig::default());

        orchestrator.configure(temp.path(), &target()).await.unwrap();

        let install = runner.calls().pop().unwrap();
        let expected = crate::executor::conda_python(&base.join("envs").join("proj"));
        assert_eq!(install.program, expected.to_string_lossy());
    }

    #[tokio::test]
    async fn test_empty_bundle_still_calls_analyze() {
        let temp = tempdir().unwrap();
        let advisor = Arc::new(FixedAdvisor::new(Vec::new()));
        let orchestrator = Orchestrator::new(
            advisor.clone(),
            Arc::new(RecordingRunner::succeeding()),
            ExecutorConfig::default(),
        );

        let report = orchestrator.configure(temp.path(), &target()).await.unwrap();

        let calls = advisor.analyze_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_empty());
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_plan_completes_with_warning() {
        let temp = project();
        let runner = Arc::new(RecordingRunner::succeeding());
        let orchestrator = Orchestrator::new(
            Arc::new(FixedAdvisor::new(Vec::new())),
            runner.clone(),
            ExecutorConfig::default(),
        );

        let report = orchestrator.configure(temp.path(), &target()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.warnings, ["Advisor returned an empty plan; nothing to execute"]);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_project_fails_before_advisor() {
        let temp = tempdir().unwrap();
        let advisor = Arc::new(FixedAdvisor::new(Vec::new()));
        let orchestrator = Orchestrator::new(
            advisor.clone(),
            Arc::new(RecordingRunner::succeeding()),
            ExecutorConfig::default(),
        );

        let err = orchestrator.analyze(&temp.path().join("missing")).await.unwrap_err();

        assert_eq!(err.kind(), "project-not-found");
        assert!(advisor.analyze_calls.lock().unwrap().is_empty());
    }
}
