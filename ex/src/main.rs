//! envx - LLM-planned Python environment provisioning
//!
//! CLI entry point: configure, analyze, plan and config inspection.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use envx::cli::{Cli, Command, ConfigCommand, TargetArgs};
use envx::config::{Config, ConfigError, LOCAL_CONFIG_FILE, LlmConfig};
use envx::llm::create_client;
use envx::orchestrator::Orchestrator;
use envx::prompts::PromptLoader;
use envx::report::{ConsoleProgress, render_summary, render_target};
use envx::{EnvxError, LlmAdvisor, RunFailure};

fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("envx")
        .join("logs");

    match fs::create_dir_all(&log_dir).and_then(|_| fs::File::create(log_dir.join("envx.log"))) {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_ansi(false)
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| eyre::eyre!("Failed to initialize logging: {}", e))?;
        }
        Err(e) => {
            eprintln!("Warning: cannot open log file in {}: {}; logging to stderr", log_dir.display(), e);
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| eyre::eyre!("Failed to initialize logging: {}", e))?;
        }
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported as errors by clap but are not failures
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Credentials may live in ./.env; a missing file is not an error
    let dotenv = dotenvy::dotenv();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    if let Err(e) = setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()) {
        eprintln!("Warning: {:#}", e);
    }
    debug!(dotenv = ?dotenv.as_ref().ok(), "main: .env lookup done");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_ref()).map_err(EnvxError::from)?;
    info!("envx loaded config: model={} base-url={}", config.llm.model, config.llm.base_url);

    // Dispatch command; the parsed command may hold an API key, so it is not logged whole
    match cli.command {
        Command::Configure { target } => {
            debug!("main: matched Configure command");
            cmd_configure(&config, &target).await
        }
        Command::Analyze { project, api_key } => {
            debug!(?project, "main: matched Analyze command");
            cmd_analyze(&config, &project, api_key.as_deref()).await
        }
        Command::Plan { target } => {
            debug!("main: matched Plan command");
            cmd_plan(&config, &target).await
        }
        Command::Config { command } => {
            debug!(?command, "main: matched Config command");
            cmd_config(&config, command)
        }
    }
}

/// Wire the LLM advisor and system runner for one project
fn build_orchestrator(config: &Config, project: &Path, api_key: Option<&str>) -> Result<Orchestrator, EnvxError> {
    debug!(?project, "build_orchestrator: called");
    let api_key = config.llm.resolve_api_key(api_key)?;
    let client = create_client(&config.llm.resolve(api_key))?;
    let advisor = LlmAdvisor::new(client, PromptLoader::new(project)).with_max_tokens(config.llm.max_tokens);

    Ok(Orchestrator::with_system_runner(Arc::new(advisor), config.executor.clone()).with_progress(Arc::new(ConsoleProgress)))
}

/// Analyze, plan and execute
async fn cmd_configure(config: &Config, args: &TargetArgs) -> Result<()> {
    debug!(project = ?args.project, "cmd_configure: called");
    let target = args.plan_target();
    let orchestrator = build_orchestrator(config, &args.project, args.api_key.as_deref())?;
    eprintln!("{}", render_target(&args.project, &target));

    match orchestrator.configure(&args.project, &target).await {
        Ok(report) => {
            println!("{}", render_summary(&report));
            Ok(())
        }
        Err(RunFailure { error, report }) => {
            eprintln!("{}", render_summary(&report));
            Err(error.into())
        }
    }
}

/// Print the dependency manifest
async fn cmd_analyze(config: &Config, project: &Path, api_key: Option<&str>) -> Result<()> {
    debug!(?project, "cmd_analyze: called");
    let orchestrator = build_orchestrator(config, project, api_key)?;
    let manifest = orchestrator.analyze(project).await?;
    println!("{}", manifest.to_pretty_json());
    Ok(())
}

/// Print the validated plan without executing it
async fn cmd_plan(config: &Config, args: &TargetArgs) -> Result<()> {
    debug!(project = ?args.project, "cmd_plan: called");
    let target = args.plan_target();
    let orchestrator = build_orchestrator(config, &args.project, args.api_key.as_deref())?;
    let (_, plan) = orchestrator.plan(&args.project, &target).await?;
    println!("{}", serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?);
    Ok(())
}

fn cmd_config(config: &Config, command: ConfigCommand) -> Result<()> {
    debug!(?command, "cmd_config: called");
    match command {
        ConfigCommand::Show => {
            print!("{}", config.to_redacted_yaml()?);
            Ok(())
        }
        ConfigCommand::Path => {
            let path = Config::user_config_path().ok_or_else(|| eyre::eyre!("No config directory on this platform"))?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Print `error[<kind>]: <message>` plus credential hints when relevant
fn report_error(err: &eyre::Report) {
    let envx_error = err.downcast_ref::<EnvxError>();
    let (kind, message) = match envx_error {
        Some(e) => (e.kind(), e.to_string()),
        None => ("error", format!("{:#}", err)),
    };
    eprintln!("{}: {}", format!("error[{}]", kind).red().bold(), message);

    if let Some(e) = envx_error.filter(|e| e.is_credential()) {
        let env_var = match e {
            EnvxError::Config(ConfigError::MissingApiKey { env_var }) => env_var.clone(),
            _ => LlmConfig::default().api_key_env,
        };
        let user_config = Config::user_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "the user config file".to_string());
        eprintln!("hint: provide an API key in one of these ways:");
        eprintln!("  1. pass --api-key <KEY>");
        eprintln!("  2. export {}=<KEY>, or add it to a .env file in the working directory", env_var);
        eprintln!("  3. set llm.api-key in {} or {}", LOCAL_CONFIG_FILE, user_config);
    }
}
