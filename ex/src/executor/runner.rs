//! CommandRunner - the seam between step executors and host processes

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Maximum characters of captured output kept for diagnostics
const OUTPUT_TAIL_CHARS: usize = 2_000;

/// One external process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the current one when None
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; None when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Tail of stderr (or stdout when stderr is empty) for error messages
    pub fn diagnostic_tail(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let trimmed = source.trim();
        let count = trimmed.chars().count();
        if count > OUTPUT_TAIL_CHARS {
            let tail: String = trimmed.chars().skip(count - OUTPUT_TAIL_CHARS).collect();
            format!("...{}", tail)
        } else {
            trimmed.to_string()
        }
    }
}

/// Why a command did not produce a usable result
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    #[error("{}{}", describe_code(.code), format_tail(.output_tail))]
    Exit { code: Option<i32>, output_tail: String },

    #[error("failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl CommandFailure {
    /// Failure for a process that ran but exited unsuccessfully
    pub fn from_output(output: &CommandOutput) -> Self {
        CommandFailure::Exit {
            code: output.code,
            output_tail: output.diagnostic_tail(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn format_tail(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\n{}", tail)
    }
}

/// Runs external processes to completion
///
/// Only the exit status is a success signal; output is captured for
/// diagnostics and for the few queries that read it (`conda info --base`).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CommandFailure>;
}

/// Runs commands on the host with a per-command timeout
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CommandFailure> {
        debug!(command = %command.display(), cwd = ?command.cwd, "SystemRunner::run: called");
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                debug!(status = ?output.status, "SystemRunner::run: command completed");
                output
            }
            Ok(Err(e)) => {
                debug!(%e, "SystemRunner::run: failed to execute command");
                return Err(CommandFailure::Spawn {
                    program: command.program.clone(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                debug!("SystemRunner::run: command timed out");
                return Err(CommandFailure::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
