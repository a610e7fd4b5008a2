// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group executor (spec.md §4.9): the linear state machine
//! `Init → Verifying → Executing → Notifying → Cleanup` run once per
//! group. Grounded on `oj-engine::runtime`'s handler-dispatch-with-
//! deferred-cleanup shape — the final two states always run, no matter
//! which earlier state failed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;
use warden_config::filter_environment;
use warden_core::{Error, ExecutionContext, Result, RuntimeCommand, RuntimeGlobal, RuntimeGroup};
use warden_resource::ResourceManager;
use warden_security::{validate_command_allowlist, validate_values, CommandAllowlist};
use warden_verify::{verify_group, HashStore};

/// Outcome reported to the injected summary callback regardless of the
/// group's ultimate `Result` (spec.md §4.9 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Success,
    Error,
    VerificationFailed,
}

#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub run_id: String,
    pub group: String,
    pub status: GroupStatus,
    pub exit_code: Option<i32>,
    pub last_command: Option<String>,
    pub last_output: String,
    pub duration: Duration,
}

/// Receives one `GroupSummary` per group execution. The real
/// implementation (wired in `warden-cli`) emits it as a structured log
/// record with `slack_notify=true`/`message_type=command_group_summary`
/// through the `warden-log` pipeline (spec.md §4.9 step 4); network I/O
/// is that downstream handler's job, not the executor's.
#[async_trait]
pub trait SummaryNotifier: Send + Sync {
    async fn notify(&self, summary: &GroupSummary);
}

/// A notifier that does nothing, for callers (tests, `--dry-run` without
/// a configured webhook) that don't need one.
pub struct NullNotifier;

#[async_trait]
impl SummaryNotifier for NullNotifier {
    async fn notify(&self, _summary: &GroupSummary) {}
}

#[allow(clippy::too_many_arguments)]
pub async fn execute_group(
    ctx: &ExecutionContext,
    run_id: &str,
    global: &RuntimeGlobal,
    group: &RuntimeGroup,
    caller_env: &HashMap<String, String>,
    resource: &dyn ResourceManager,
    hash_store: &dyn HashStore,
    allowlist: &CommandAllowlist,
    notifier: &dyn SummaryNotifier,
) -> Result<()> {
    let start = Instant::now();

    // Init
    let temp_dir = if group.temp_dir {
        Some(resource.create_temp_dir(&group.name).await?)
    } else {
        None
    };

    let outcome = run_state_machine(ctx, global, group, caller_env, resource, hash_store, allowlist, temp_dir.as_deref()).await;

    // Notifying — always runs, regardless of which state produced `outcome`.
    let summary = GroupSummary {
        run_id: run_id.to_string(),
        group: group.name.clone(),
        status: outcome.status,
        exit_code: outcome.exit_code,
        last_command: outcome.last_command,
        last_output: outcome.last_output,
        duration: start.elapsed(),
    };
    notifier.notify(&summary).await;

    // Cleanup — best-effort, never changes the group's status.
    if let Some(dir) = &temp_dir {
        if let Err(e) = resource.cleanup_temp_dir(dir).await {
            warn!(group = group.name.as_str(), error = %e, "temp dir cleanup failed");
        }
    }

    match outcome.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct StateOutcome {
    status: GroupStatus,
    exit_code: Option<i32>,
    last_command: Option<String>,
    last_output: String,
    error: Option<Error>,
}

#[allow(clippy::too_many_arguments)]
async fn run_state_machine(
    ctx: &ExecutionContext,
    global: &RuntimeGlobal,
    group: &RuntimeGroup,
    caller_env: &HashMap<String, String>,
    resource: &dyn ResourceManager,
    hash_store: &dyn HashStore,
    allowlist: &CommandAllowlist,
    temp_dir: Option<&std::path::Path>,
) -> StateOutcome {
    // Verifying
    if let Err(verification_error) = verify_group(&group.name, &group.expanded_verify_files, hash_store) {
        warn!(group = group.name.as_str(), cause = verification_error.cause.as_str(), "group verification failed; skipping");
        return StateOutcome {
            status: GroupStatus::VerificationFailed,
            exit_code: None,
            last_command: None,
            last_output: String::new(),
            error: Some(Error::VerificationFailed {
                group: verification_error.group,
                total: verification_error.total,
                verified: verification_error.verified,
                failed: verification_error.failed,
                skipped: verification_error.skipped,
                cause: verification_error.cause,
            }),
        };
    }

    // Executing
    let filtered_env = filter_environment(&group.env_allowed, caller_env);
    let mut last_command: Option<String> = None;
    let mut last_output = String::new();
    let mut last_exit_code: Option<i32> = None;
    let mut error: Option<Error> = None;

    for cmd in &group.commands {
        last_command = Some(cmd.name.clone());

        match dispatch_command(ctx, global, group, cmd, &filtered_env, resource, allowlist, temp_dir).await {
            Ok(result) => {
                last_output = result.stdout_lossy();
                last_exit_code = Some(result.exit_code);
                if !result.success() {
                    error = Some(Error::CommandFailed {
                        command: cmd.name.clone(),
                        exit_code: result.exit_code,
                    });
                    break;
                }
            }
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    StateOutcome {
        status: if error.is_some() { GroupStatus::Error } else { GroupStatus::Success },
        exit_code: last_exit_code,
        last_command,
        last_output,
        error,
    }
}

/// Steps (a)–(e) of spec.md §4.9 "Executing" for a single command.
async fn dispatch_command(
    ctx: &ExecutionContext,
    _global: &RuntimeGlobal,
    group: &RuntimeGroup,
    cmd: &RuntimeCommand,
    group_env: &HashMap<String, String>,
    resource: &dyn ResourceManager,
    allowlist: &CommandAllowlist,
    temp_dir: Option<&std::path::Path>,
) -> Result<warden_core::ExecutionResult> {
    // (b) resolve env, validate.
    let mut env = group_env.clone();
    env.extend(group.expanded_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(group.expanded_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(cmd.expanded_env.iter().map(|(k, v)| (k.clone(), v.clone())));

    validate_values(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    validate_values(cmd.args.iter().map(|a| (cmd.name.as_str(), a.as_str())))?;

    // (c) resolve executable path: the allowlist (if configured) gates
    // which executables may run at all; absoluteness for privileged
    // commands is enforced by the resource manager itself.
    validate_command_allowlist(allowlist, &cmd.cmd)?;

    // (d) effective working directory: command -> group WorkDir -> temp dir -> empty.
    let work_dir = cmd
        .work_dir
        .clone()
        .or_else(|| group.work_dir.clone())
        .or_else(|| temp_dir.map(|p| p.display().to_string()));

    let mut resolved = cmd.clone();
    resolved.work_dir = work_dir.clone();

    // (e) validate the output path, then execute.
    if let Some(output_file) = &resolved.output_file {
        let base = work_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        resource.validate_output_path(output_file, &base)?;
    }

    resource.execute_command(ctx, &resolved, &group.name, &env).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;
    use warden_core::{InheritanceMode, RunId};
    use warden_resource::DryRunResourceManager;
    use warden_verify::FileHashStore;

    fn global() -> RuntimeGlobal {
        RuntimeGlobal {
            timeout: StdDuration::from_secs(30),
            output_size_limit: 0,
            log_level: None,
            env_allowed: Default::default(),
            expanded_vars: HashMap::new(),
            expanded_env: HashMap::new(),
            expanded_verify_files: vec![],
        }
    }

    fn group_with_commands(commands: Vec<RuntimeCommand>) -> RuntimeGroup {
        RuntimeGroup {
            name: "build".to_string(),
            description: None,
            priority: 1,
            depends_on: vec![],
            inheritance_mode: InheritanceMode::Inherit,
            env_allowed: Default::default(),
            expanded_vars: HashMap::new(),
            expanded_env: HashMap::new(),
            expanded_verify_files: vec![],
            temp_dir: false,
            work_dir: None,
            commands,
        }
    }

    fn command(name: &str, cmd: &str, args: &[&str]) -> RuntimeCommand {
        RuntimeCommand {
            name: name.to_string(),
            cmd: cmd.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            expanded_env: HashMap::new(),
            work_dir: None,
            timeout: StdDuration::from_secs(5),
            output_size_limit: 0,
            output_file: None,
            run_as_user: None,
            run_as_group: None,
        }
    }

    #[tokio::test]
    async fn success_path_invokes_notifier_and_returns_ok() {
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let resource = DryRunResourceManager::new();
        let dir = tempfile::tempdir().unwrap();
        let hash_store = FileHashStore::new(dir.path());
        let allowlist = CommandAllowlist::default();
        let notifier = NullNotifier;
        let group = group_with_commands(vec![command("build", "make", &["all"])]);

        let result = execute_group(
            &ctx,
            "r1",
            &global(),
            &group,
            &HashMap::new(),
            &resource,
            &hash_store,
            &allowlist,
            &notifier,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn command_allowlist_rejects_disallowed_command() {
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let resource = DryRunResourceManager::new();
        let dir = tempfile::tempdir().unwrap();
        let hash_store = FileHashStore::new(dir.path());
        let allowlist = CommandAllowlist::new(&["^make$".to_string()]).unwrap();
        let notifier = NullNotifier;
        let group = group_with_commands(vec![command("fetch", "curl", &["https://example.com"])]);

        let err = execute_group(
            &ctx,
            "r1",
            &global(),
            &group,
            &HashMap::new(),
            &resource,
            &hash_store,
            &allowlist,
            &notifier,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(_)));
    }

    #[tokio::test]
    async fn verification_failure_skips_execution_and_reports_verification_failed() {
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let resource = DryRunResourceManager::new();
        let dir = tempfile::tempdir().unwrap();
        let hash_store = FileHashStore::new(dir.path().join("store"));
        store_mismatch(&dir, &hash_store);
        let allowlist = CommandAllowlist::default();
        let notifier = NullNotifier;

        let mut group = group_with_commands(vec![command("build", "make", &[])]);
        group.expanded_verify_files = vec![dir.path().join("artifact.bin").to_string_lossy().into_owned()];

        let err = execute_group(
            &ctx,
            "r1",
            &global(),
            &group,
            &HashMap::new(),
            &resource,
            &hash_store,
            &allowlist,
            &notifier,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::VerificationFailed { .. }));
    }

    fn store_mismatch(dir: &tempfile::TempDir, hash_store: &FileHashStore) {
        let target = dir.path().join("artifact.bin");
        std::fs::write(&target, b"current").unwrap();
        hash_store.record(&target, "stale-digest").unwrap();
    }
}
