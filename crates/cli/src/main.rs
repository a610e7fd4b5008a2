// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! warden: the hardened command orchestrator's CLI entry point.
//!
//! Loads a config, expands it, wires the logging pipeline as the
//! group-summary notifier, drives the runner, and maps the outcome to
//! one of spec.md §6's fixed exit codes.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use warden_core::{Clock, ExecutionContext, Handler, Level, LogRecord, RunId, SystemClock};
use warden_exec::{GroupStatus, GroupSummary, Runner, RunnerOptions, SummaryNotifier};
use warden_log::{FileSink, LevelMode, MultiSinkHandler, RedactingHandler, RedactionRules, StderrSink, WebhookNotifier};

#[derive(Parser)]
#[command(name = "warden", version, about = "Hardened command orchestrator")]
struct Cli {
    /// Path to the TOML config describing command groups.
    #[arg(long)]
    config: PathBuf,

    /// `.env`-style file whose entries join the caller's ambient environment.
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,

    /// Record every would-be operation without spawning anything.
    #[arg(long)]
    dry_run: bool,

    /// Identifier correlating this invocation's logs, temp dirs, and notifications.
    #[arg(long = "run-id")]
    run_id: String,

    /// Leave group temp directories in place after execution.
    #[arg(long)]
    keep_temp_dirs: bool,

    /// Comma-separated group names to run (and their dependency closure); empty runs all groups.
    #[arg(long, value_delimiter = ',')]
    groups: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        let code = err
            .downcast_ref::<warden_core::Error>()
            .map(|e| e.exit_code())
            .unwrap_or(1);
        eprintln!("Error: {err:#}");
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = warden_config::load_config(&cli.config)?;
    let _log_guard = setup_logging(config.global.log_level.as_deref())?;

    let state = state_dir();
    std::fs::create_dir_all(&state).context("creating state directory")?;

    let mut system_env: HashMap<String, String> = std::env::vars().collect();
    if let Some(env_file) = &cli.env_file {
        system_env.extend(warden_config::load_env_file(env_file)?);
    }

    let global = warden_config::expand_global(&config.global, &system_env)?;
    let groups = config
        .groups
        .iter()
        .map(|g| warden_config::expand_group(&global, g))
        .collect::<warden_core::Result<Vec<_>>>()?;

    let notifier: Arc<dyn SummaryNotifier> = Arc::new(LogNotifier::new(cli.dry_run));

    let options = RunnerOptions {
        run_id: RunId::new(cli.run_id.clone()),
        dry_run: cli.dry_run,
        keep_temp_dirs: cli.keep_temp_dirs,
        temp_base: state.join("temp"),
        hash_store_root: state.join("hashes"),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let runner = Runner::new(options, global, groups, system_env, clock, notifier)?;

    let ctx = ExecutionContext::new(RunId::new(cli.run_id));
    let cancel_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt, canceling remaining groups");
            cancel_ctx.cancel();
        }
    });

    let resource = runner.resource_manager();
    let outcome = runner.execute_filtered(&ctx, &cli.groups).await;

    if cli.dry_run {
        if let Some(result) = resource.dry_run_results() {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    outcome.map_err(anyhow::Error::from)
}

/// `WARDEN_STATE_DIR` takes priority (isolation for tests); otherwise
/// `$XDG_STATE_HOME/warden` or `~/.local/state/warden`.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WARDEN_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("warden");
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".local/state/warden")
}

fn setup_logging(log_level: Option<&str>) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

/// Bridges the group executor's summary callback to the `warden-log`
/// pipeline: every summary becomes one `LogRecord` routed through
/// redaction and fan-out to stderr, file, and (when configured) webhook
/// sinks. `WARDEN_WEBHOOK_URL`/`WARDEN_WEBHOOK_LEVEL` configure the
/// webhook sink since spec.md §6's config keys carry no such field.
struct LogNotifier {
    handler: Box<dyn Handler>,
}

impl LogNotifier {
    fn new(dry_run: bool) -> Self {
        let mut sinks: Vec<Box<dyn Handler>> = vec![
            Box::new(StderrSink::new(Level::Info)),
            Box::new(FileSink::new(state_dir().join("summary.ndjson"), Level::Debug)),
        ];

        if let Ok(url) = std::env::var("WARDEN_WEBHOOK_URL") {
            let mode = match std::env::var("WARDEN_WEBHOOK_LEVEL").as_deref() {
                Ok("warn_and_above") => LevelMode::WarnAndAbove,
                _ => LevelMode::ExactInfo,
            };
            sinks.push(Box::new(WebhookNotifier::new(url, mode, dry_run)));
        }

        let fanout = Box::new(MultiSinkHandler::new(sinks));
        let failure_logger = Box::new(StderrSink::new(Level::Error));
        let redacting = RedactingHandler::new(fanout, failure_logger, redaction_rules());

        Self {
            handler: Box::new(redacting),
        }
    }
}

/// The default sensitive-key set, plus any operator-supplied value
/// patterns from `WARDEN_REDACTION_PATTERNS` (comma-separated regexes) —
/// §6's config keys have no redaction-pattern field, so site-specific
/// secret shapes (e.g. a vendor token format) are supplied this way.
fn redaction_rules() -> RedactionRules {
    let extra: Vec<String> = std::env::var("WARDEN_REDACTION_PATTERNS")
        .ok()
        .map(|raw| raw.split(',').map(str::trim).filter(|p| !p.is_empty()).map(String::from).collect())
        .unwrap_or_default();

    if extra.is_empty() {
        return RedactionRules::defaults();
    }

    let sensitive_keys = vec!["password".to_string(), "token".to_string(), "api_key".to_string(), "secret".to_string()];
    RedactionRules::new(&extra, &sensitive_keys).unwrap_or_else(|e| {
        warn!(error = %e, "invalid WARDEN_REDACTION_PATTERNS entry, falling back to defaults");
        RedactionRules::defaults()
    })
}

#[async_trait]
impl SummaryNotifier for LogNotifier {
    async fn notify(&self, summary: &GroupSummary) {
        let level = match summary.status {
            GroupStatus::Success => Level::Info,
            GroupStatus::Error | GroupStatus::VerificationFailed => Level::Error,
        };
        let status = match summary.status {
            GroupStatus::Success => "SUCCESS",
            GroupStatus::Error | GroupStatus::VerificationFailed => "ERROR",
        };

        let record = LogRecord::new(level, format!("group {} finished", summary.group))
            .with_attr("run_id", summary.run_id.clone())
            .with_attr("group", summary.group.clone())
            .with_attr("status", status)
            .with_attr("exit_code", summary.exit_code.map(|c| c as i64))
            .with_attr("last_command", summary.last_command.clone())
            .with_attr("last_output", summary.last_output.clone())
            .with_attr("duration_ms", summary.duration.as_millis() as i64);

        if let Err(e) = self.handler.handle(&record).await {
            warn!(error = %e, group = summary.group.as_str(), "failed to deliver group summary notification");
        }
    }
}
