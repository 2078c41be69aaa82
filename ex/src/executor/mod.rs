//! StepExecutor - performs the host mutation for one validated action
//!
//! Every subprocess goes through a [`CommandRunner`]; relative paths resolve
//! against the project root and commands run there. The only state carried
//! between steps is the [`ActiveEnvironment`] the caller threads through.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

mod dockerfile;
mod env_state;
mod error;
pub mod runner;
mod specifier;

pub use dockerfile::{DOCKERFILE_NAME, render_dockerfile, write_dockerfile};
pub use env_state::{ActiveEnvironment, conda_python};
pub use error::StepError;
pub use runner::{CommandFailure, CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use specifier::resolve_specifier;

use crate::config::ExecutorConfig;
use crate::domain::{ActionKind, ActionSpec, ExecutionOutcome};

/// Defaults applied when the plan omits a parameter
pub const DEFAULT_VENV_PATH: &str = "venv";
pub const DEFAULT_CONDA_ENV_NAME: &str = "myenv";
pub const DEFAULT_PYTHON_VERSION: &str = "3.8";
pub const DEFAULT_IMAGE_NAME: &str = "myapp";

/// Executes validated actions against the host
pub struct StepExecutor {
    runner: Arc<dyn CommandRunner>,
    settings: ExecutorConfig,
    project_root: PathBuf,
}

impl StepExecutor {
    /// The root is made absolute so paths handed to child processes agree
    /// with the paths checked here, whatever the child's working directory.
    pub fn new(runner: Arc<dyn CommandRunner>, settings: ExecutorConfig, project_root: impl Into<PathBuf>) -> Self {
        let project_root = absolute_root(project_root.into());
        debug!(?project_root, "StepExecutor::new: called");
        Self {
            runner,
            settings,
            project_root,
        }
    }

    /// Execute one action, updating `env` when it creates a conda environment
    pub async fn execute(
        &self,
        index: usize,
        action: &ActionSpec,
        env: &mut ActiveEnvironment,
    ) -> Result<ExecutionOutcome, StepError> {
        debug!(%index, action = %action.summary(), "StepExecutor::execute: called");
        let message = match action.kind {
            ActionKind::InstallPackage => self.install_package(action, env).await?,
            ActionKind::CreateVenv => self.create_venv(action).await?,
            ActionKind::CreateCondaEnv => self.create_conda_env(action, env).await?,
            ActionKind::CreateDockerfile => self.create_dockerfile(action).await?,
        };
        info!(%index, %message, "Step completed");
        Ok(ExecutionOutcome::success(index, action.clone(), message))
    }

    async fn install_package(&self, action: &ActionSpec, env: &ActiveEnvironment) -> Result<String, StepError> {
        debug!("StepExecutor::install_package: called");
        let name = action.str_param("name").ok_or_else(|| StepError::InvalidStep {
            kind: action.kind,
            reason: "missing package name".to_string(),
        })?;
        let spec = resolve_specifier(&name, action.str_param("version").as_deref());
        let python = env.interpreter(&self.settings.python);

        let command = CommandSpec::new(python)
            .args(["-m", "pip", "install"])
            .arg(spec.clone())
            .current_dir(&self.project_root);
        self.run_checked(&command)
            .await
            .map_err(|status| StepError::PackageInstall {
                spec: spec.clone(),
                status,
            })?;

        Ok(format!("Installed {} into {}", spec, env.describe()))
    }

    async fn create_venv(&self, action: &ActionSpec) -> Result<String, StepError> {
        debug!("StepExecutor::create_venv: called");
        let path = self.resolve_path(&action.str_param_or("path", DEFAULT_VENV_PATH));

        if path.join("pyvenv.cfg").is_file() {
            debug!(?path, "StepExecutor::create_venv: pyvenv.cfg present, reusing");
            return Ok(format!("Reused existing virtual environment at {}", path.display()));
        }

        let command = CommandSpec::new(&self.settings.python)
            .args(["-m", "venv"])
            .arg(path.to_string_lossy())
            .current_dir(&self.project_root);
        self.run_checked(&command)
            .await
            .map_err(|status| StepError::VenvCreation {
                path: path.clone(),
                message: status.to_string(),
            })?;

        if !path.is_dir() {
            return Err(StepError::VenvCreation {
                path,
                message: "command succeeded but the directory does not exist".to_string(),
            });
        }

        Ok(format!("Created virtual environment at {}", path.display()))
    }

    async fn create_conda_env(&self, action: &ActionSpec, env: &mut ActiveEnvironment) -> Result<String, StepError> {
        debug!("StepExecutor::create_conda_env: called");
        let name = action.str_param_or("name", DEFAULT_CONDA_ENV_NAME);
        let python_version = action.str_param_or("python_version", DEFAULT_PYTHON_VERSION);
        let conda_error = |message: String| StepError::CondaEnvCreation {
            name: name.clone(),
            message,
        };

        let base_query = CommandSpec::new(&self.settings.conda)
            .args(["info", "--base"])
            .current_dir(&self.project_root);
        let output = self
            .run_checked(&base_query)
            .await
            .map_err(|status| conda_error(format!("conda info --base failed: {}", status)))?;
        let base = output.stdout.trim();
        if base.is_empty() {
            return Err(conda_error("conda info --base printed no path".to_string()));
        }

        let prefix = Path::new(base).join("envs").join(&name);
        let message = if prefix.is_dir() {
            debug!(?prefix, "StepExecutor::create_conda_env: prefix exists, reusing");
            format!("Reused existing conda environment '{}'", name)
        } else {
            let create = CommandSpec::new(&self.settings.conda)
                .args(["create", "-y", "-n"])
                .arg(name.clone())
                .arg(format!("python={}", python_version))
                .current_dir(&self.project_root);
            self.run_checked(&create)
                .await
                .map_err(|status| conda_error(status.to_string()))?;
            format!("Created conda environment '{}' with Python {}", name, python_version)
        };

        info!(%name, ?prefix, "Later installs target conda environment");
        *env = ActiveEnvironment::Conda {
            name: name.clone(),
            prefix,
        };
        Ok(message)
    }

    async fn create_dockerfile(&self, action: &ActionSpec) -> Result<String, StepError> {
        debug!("StepExecutor::create_dockerfile: called");
        let python_version = action.str_param_or("python_version", DEFAULT_PYTHON_VERSION);
        let dir = action
            .str_param("path")
            .map(|p| self.resolve_path(&p))
            .unwrap_or_else(|| self.project_root.clone());

        let path = write_dockerfile(&dir, &python_version)?;
        if !action.flag("build") {
            return Ok(format!("Wrote {}", path.display()));
        }

        let name = action.str_param_or("name", DEFAULT_IMAGE_NAME);
        let build = CommandSpec::new(&self.settings.docker)
            .args(["build", "-t"])
            .arg(name.clone())
            .arg(".")
            .current_dir(&dir);
        self.run_checked(&build)
            .await
            .map_err(|status| StepError::ContainerBuild {
                name: name.clone(),
                status,
            })?;

        Ok(format!("Wrote {} and built image '{}'", path.display(), name))
    }

    /// Run a command, treating a non-zero exit as a failure
    async fn run_checked(&self, command: &CommandSpec) -> Result<CommandOutput, CommandFailure> {
        debug!(command = %command.display(), "StepExecutor::run_checked: called");
        let output = self.runner.run(command).await?;
        if output.success() {
            Ok(output)
        } else {
            debug!(code = ?output.code, "StepExecutor::run_checked: non-zero exit");
            Err(CommandFailure::from_output(&output))
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

fn absolute_root(root: PathBuf) -> PathBuf {
    let root = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root
    };
    match std::path::absolute(&root) {
        Ok(absolute) => absolute,
        Err(e) => {
            warn!(?root, %e, "could not make project root absolute; using it as given");
            root
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner::mock::{RecordingRunner, exit, ok};
    use tempfile::tempdir;

    fn executor(runner: Arc<RecordingRunner>, root: &Path) -> StepExecutor {
        StepExecutor::new(runner, ExecutorConfig::default(), root)
    }

    fn install(name: &str, version: Option<&str>) -> ActionSpec {
        let action = ActionSpec::new(ActionKind::InstallPackage).with_param("name", name);
        match version {
            Some(v) => action.with_param("version", v),
            None => action,
        }
    }

    #[tokio::test]
    async fn test_install_uses_ambient_python_and_resolved_spec() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::succeeding());
        let mut env = ActiveEnvironment::Ambient;

        let outcome = executor(runner.clone(), temp.path())
            .execute(0, &install("numpy", Some("1.2.3")), &mut env)
            .await
            .unwrap();

        assert!(outcome.success);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "python3");
        assert_eq!(calls[0].args, ["-m", "pip", "install", "numpy==1.2.3"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(temp.path()));
    }

    #[tokio::test]
    async fn test_install_failure_reports_spec_and_status() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::with(|_| Ok(exit(1, "No matching distribution"))));

        let err = executor(runner, temp.path())
            .execute(0, &install("numpy", Some(">=99")), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap_err();

        match err {
            StepError::PackageInstall { spec, status } => {
                assert_eq!(spec, "numpy>=99");
                assert_eq!(status.to_string(), "exit code 1\nNo matching distribution");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_install_without_name_is_invalid_step() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::succeeding());

        let err = executor(runner.clone(), temp.path())
            .execute(
                0,
                &ActionSpec::new(ActionKind::InstallPackage),
                &mut ActiveEnvironment::Ambient,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::InvalidStep { .. }));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_surfaces_through_step_error() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::with(|cmd| {
            Err(CommandFailure::Spawn {
                program: cmd.program.clone(),
                message: "No such file or directory".to_string(),
            })
        }));

        let err = executor(runner, temp.path())
            .execute(0, &install("numpy", None), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to start 'python3'"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_conda_env_redirects_later_installs() {
        let temp = tempdir().unwrap();
        let base = temp.path().join("conda");
        let base_out = base.to_string_lossy().into_owned();
        let runner = Arc::new(RecordingRunner::with(move |cmd| {
            if cmd.args == ["info", "--base"] {
                Ok(ok(&format!("{}\n", base_out)))
            } else {
                Ok(ok(""))
            }
        }));
        let executor = executor(runner.clone(), temp.path());
        let mut env = ActiveEnvironment::Ambient;

        let create = ActionSpec::new(ActionKind::CreateCondaEnv)
            .with_param("name", "proj")
            .with_param("python_version", "3.9");
        executor.execute(0, &create, &mut env).await.unwrap();
        executor.execute(1, &install("numpy", Some(">=1.20")), &mut env).await.unwrap();

        let prefix = base.join("envs").join("proj");
        assert_eq!(
            env,
            ActiveEnvironment::Conda {
                name: "proj".to_string(),
                prefix: prefix.clone()
            }
        );

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].program, "conda");
        assert_eq!(calls[1].args, ["create", "-y", "-n", "proj", "python=3.9"]);
        assert_eq!(calls[2].program, prefix.join("bin/python").to_string_lossy());
        assert_eq!(calls[2].args, ["-m", "pip", "install", "numpy>=1.20"]);
    }

    #[tokio::test]
    async fn test_conda_env_reuses_existing_prefix() {
        let temp = tempdir().unwrap();
        let base = temp.path().join("conda");
        std::fs::create_dir_all(base.join("envs").join("myenv")).unwrap();
        let base_out = base.to_string_lossy().into_owned();
        let runner = Arc::new(RecordingRunner::with(move |_| Ok(ok(&base_out))));
        let mut env = ActiveEnvironment::Ambient;

        let outcome = executor(runner.clone(), temp.path())
            .execute(0, &ActionSpec::new(ActionKind::CreateCondaEnv), &mut env)
            .await
            .unwrap();

        assert!(outcome.message.contains("Reused"));
        assert_eq!(runner.call_count(), 1);
        assert!(matches!(env, ActiveEnvironment::Conda { ref name, .. } if name == "myenv"));
    }

    #[tokio::test]
    async fn test_conda_failure_leaves_environment_unchanged() {
        let temp = tempdir().unwrap();
        let base_out = temp.path().to_string_lossy().into_owned();
        let runner = Arc::new(RecordingRunner::with(move |cmd| {
            if cmd.args.first().map(String::as_str) == Some("create") {
                Ok(exit(1, "PackagesNotFoundError"))
            } else {
                Ok(ok(&base_out))
            }
        }));
        let mut env = ActiveEnvironment::Ambient;

        let err = executor(runner, temp.path())
            .execute(0, &ActionSpec::new(ActionKind::CreateCondaEnv), &mut env)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::CondaEnvCreation { ref name, .. } if name == "myenv"));
        assert_eq!(env, ActiveEnvironment::Ambient);
    }

    #[tokio::test]
    async fn test_conda_base_query_failure() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::with(|_| Ok(exit(127, "conda: command not found"))));

        let err = executor(runner.clone(), temp.path())
            .execute(0, &ActionSpec::new(ActionKind::CreateCondaEnv), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("conda info --base failed"));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_venv_reuses_existing_environment() {
        let temp = tempdir().unwrap();
        let venv = temp.path().join(".venv");
        std::fs::create_dir_all(&venv).unwrap();
        std::fs::write(venv.join("pyvenv.cfg"), "home = /usr/bin").unwrap();
        let runner = Arc::new(RecordingRunner::succeeding());

        let action = ActionSpec::new(ActionKind::CreateVenv).with_param("path", ".venv");
        let outcome = executor(runner.clone(), temp.path())
            .execute(0, &action, &mut ActiveEnvironment::Ambient)
            .await
            .unwrap();

        assert!(outcome.message.contains("Reused"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_venv_requires_directory_afterwards() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::succeeding());

        let err = executor(runner.clone(), temp.path())
            .execute(0, &ActionSpec::new(ActionKind::CreateVenv), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::VenvCreation { ref path, .. } if path == &temp.path().join("venv")));
        let calls = runner.calls();
        assert_eq!(calls[0].args[..2], ["-m", "venv"]);
    }

    #[tokio::test]
    async fn test_venv_succeeds_when_directory_created() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::with(|cmd| {
            if let Some(path) = cmd.args.last() {
                std::fs::create_dir_all(path).ok();
            }
            Ok(ok(""))
        }));

        let outcome = executor(runner, temp.path())
            .execute(0, &ActionSpec::new(ActionKind::CreateVenv), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap();

        assert!(outcome.message.starts_with("Created virtual environment"));
        assert!(temp.path().join("venv").is_dir());
    }

    #[tokio::test]
    async fn test_venv_with_relative_project_root() {
        let temp = tempfile::tempdir_in(".").unwrap();
        let relative = PathBuf::from(temp.path().file_name().unwrap());
        // Resolve the path argument against the child's working directory
        let runner = Arc::new(RecordingRunner::with(|cmd| {
            if let (Some(cwd), Some(path)) = (&cmd.cwd, cmd.args.last()) {
                std::fs::create_dir_all(cwd.join(path)).ok();
            }
            Ok(ok(""))
        }));

        let outcome = executor(runner.clone(), &relative)
            .execute(0, &ActionSpec::new(ActionKind::CreateVenv), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap();

        assert!(outcome.message.starts_with("Created virtual environment"));
        assert!(temp.path().join("venv").is_dir());
        assert!(!temp.path().join(&relative).exists());

        let calls = runner.calls();
        assert!(Path::new(&calls[0].args[2]).is_absolute());
        assert!(calls[0].cwd.as_deref().is_some_and(Path::is_absolute));
    }

    #[tokio::test]
    async fn test_venv_reuse_with_relative_project_root() {
        let temp = tempfile::tempdir_in(".").unwrap();
        std::fs::create_dir_all(temp.path().join("venv")).unwrap();
        std::fs::write(temp.path().join("venv").join("pyvenv.cfg"), "home = /usr/bin").unwrap();
        let relative = PathBuf::from(temp.path().file_name().unwrap());
        let runner = Arc::new(RecordingRunner::succeeding());

        let outcome = executor(runner.clone(), &relative)
            .execute(0, &ActionSpec::new(ActionKind::CreateVenv), &mut ActiveEnvironment::Ambient)
            .await
            .unwrap();

        assert!(outcome.message.contains("Reused"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dockerfile_without_build_runs_nothing() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::succeeding());

        let action = ActionSpec::new(ActionKind::CreateDockerfile).with_param("python_version", "3.10");
        executor(runner.clone(), temp.path())
            .execute(0, &action, &mut ActiveEnvironment::Ambient)
            .await
            .unwrap();

        let content = std::fs::read_to_string(temp.path().join(DOCKERFILE_NAME)).unwrap();
        assert!(content.contains("FROM python:3.10"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dockerfile_build_failure_keeps_file() {
        let temp = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::with(|_| Ok(exit(1, "Cannot connect to the Docker daemon"))));

        let action = ActionSpec::new(ActionKind::CreateDockerfile)
            .with_param("path", "deploy")
            .with_param("build", "yes");
        let err = executor(runner.clone(), temp.path())
            .execute(0, &action, &mut ActiveEnvironment::Ambient)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::ContainerBuild { ref name, .. } if name == "myapp"));
        let dir = temp.path().join("deploy");
        assert!(dir.join(DOCKERFILE_NAME).is_file());

        let calls = runner.calls();
        assert_eq!(calls[0].program, "docker");
        assert_eq!(calls[0].args, ["build", "-t", "myapp", "."]);
        assert_eq!(calls[0].cwd.as_deref(), Some(dir.as_path()));
    }
}
