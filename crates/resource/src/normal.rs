// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The side-effecting `ResourceManager` (spec.md §4.8 "normal"): spawns
//! real child processes, writes real output files, creates real temp
//! directories. Grounded on `oj-adapters::subprocess::run_with_timeout`'s
//! timeout-wrapped `Command` idiom, extended with streamed, size-bounded
//! capture, cancellation racing, privilege elevation, and process-monitor
//! registration.

use crate::capture::CaptureBuffer;
use crate::manager::ResourceManager;
use crate::monitor::ProcessMonitor;
use crate::privilege::PrivilegeManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};
use warden_core::{Clock, DryRunResult, Error, ExecutionContext, ExecutionResult, Result, RuntimeCommand};
use warden_security::{validate_output_path, RiskLevel};

const READ_CHUNK: usize = 8192;

pub struct NormalResourceManager {
    clock: Arc<dyn Clock>,
    temp_base: PathBuf,
    keep_temp_dirs: bool,
    monitor: Arc<ProcessMonitor>,
    privileges: Option<Arc<PrivilegeManager>>,
    temp_dirs: Mutex<Vec<PathBuf>>,
}

impl NormalResourceManager {
    pub fn new(
        clock: Arc<dyn Clock>,
        temp_base: PathBuf,
        keep_temp_dirs: bool,
        monitor: Arc<ProcessMonitor>,
        privileges: Option<Arc<PrivilegeManager>>,
    ) -> Self {
        Self {
            clock,
            temp_base,
            keep_temp_dirs,
            monitor,
            privileges,
            temp_dirs: Mutex::new(Vec::new()),
        }
    }

    /// spec.md §4.9c: resolve the executable path; a privileged command
    /// (`run_as_user`/`run_as_group` set) must name an absolute path so a
    /// `$PATH` search can't be hijacked to escalate to an unintended binary.
    fn resolve_executable(cmd: &RuntimeCommand) -> Result<String> {
        let privileged = cmd.run_as_user.is_some() || cmd.run_as_group.is_some();
        if privileged && !Path::new(&cmd.cmd).is_absolute() {
            return Err(Error::CommandNotFound(format!(
                "{:?} must be an absolute path when run_as_user/run_as_group is set",
                cmd.cmd
            )));
        }
        Ok(cmd.cmd.clone())
    }

    fn build_command(executable: &str, cmd: &RuntimeCommand, env: &HashMap<String, String>) -> Command {
        let mut command = Command::new(executable);
        command.args(&cmd.args);
        command.env_clear();
        command.envs(env);
        if let Some(work_dir) = &cmd.work_dir {
            command.current_dir(work_dir);
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command
    }

    fn spawn(&self, mut command: Command, cmd: &RuntimeCommand) -> Result<Child> {
        let spawn_one = || {
            command.spawn().map_err(|e| Error::ExecutorError {
                command: cmd.cmd.clone(),
                message: e.to_string(),
            })
        };

        match (&self.privileges, cmd.run_as_user.as_deref(), cmd.run_as_group.as_deref()) {
            (Some(privileges), run_as_user, run_as_group) if run_as_user.is_some() || run_as_group.is_some() => {
                privileges.with_privileges("spawn", &cmd.name, run_as_user, run_as_group, spawn_one)
            }
            (None, Some(_), _) | (None, _, Some(_)) => Err(Error::ConfigInvalid(format!(
                "command {:?} requests run_as_user/run_as_group but no privilege manager is configured",
                cmd.name
            ))),
            _ => spawn_one(),
        }
    }

    async fn resolve_output_file(&self, cmd: &RuntimeCommand) -> Result<Option<PathBuf>> {
        let Some(output_file) = &cmd.output_file else {
            return Ok(None);
        };
        let work_dir = cmd
            .work_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let (resolved, _risk) = validate_output_path(output_file, &work_dir)?;
        Ok(Some(resolved))
    }
}

#[async_trait]
impl ResourceManager for NormalResourceManager {
    async fn execute_command(
        &self,
        ctx: &ExecutionContext,
        cmd: &RuntimeCommand,
        group: &str,
        env: &HashMap<String, String>,
    ) -> Result<ExecutionResult> {
        let token = uuid::Uuid::new_v4().to_string();
        let executable = Self::resolve_executable(cmd)?;
        let output_path = self.resolve_output_file(cmd).await?;

        let command = Self::build_command(&executable, cmd, env);
        let mut child = self.spawn(command, cmd)?;
        let pid = child.id();
        if let Some(pid) = pid {
            self.monitor.register(pid, &cmd.name, self.clock.now());
        }

        #[allow(clippy::expect_used)]
        let stdout = child.stdout.take().expect("configured with Stdio::piped");
        #[allow(clippy::expect_used)]
        let stderr = child.stderr.take().expect("configured with Stdio::piped");
        let cap = cmd.output_size_limit;

        let stdout_task = tokio::spawn(read_capped(stdout, cap, output_path.clone()));
        let stderr_task = tokio::spawn(read_capped(stderr, cap, None));

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = ctx.canceled() => Outcome::Canceled,
            _ = tokio::time::sleep(cmd.timeout) => Outcome::TimedOut,
        };

        if !matches!(outcome, Outcome::Exited(_)) {
            if let Err(e) = child.kill().await {
                warn!(group, command = %cmd.name, error = %e, "failed to kill child after cancellation/timeout");
            }
            let _ = child.wait().await;
        }

        if let Some(pid) = pid {
            self.monitor.unregister(pid);
        }

        let stdout_result = stdout_task.await.unwrap_or_default();
        let stderr_result = stderr_task.await.unwrap_or_default();

        match outcome {
            Outcome::Canceled => Err(Error::Canceled),
            Outcome::TimedOut => Err(Error::Timeout {
                command: cmd.name.clone(),
                timeout_secs: cmd.timeout.as_secs(),
            }),
            Outcome::Exited(Err(e)) => Err(Error::ExecutorError {
                command: cmd.name.clone(),
                message: e.to_string(),
            }),
            Outcome::Exited(Ok(status)) => {
                debug!(group, command = %cmd.name, exit_code = status.code(), "command finished");
                Ok(ExecutionResult {
                    token,
                    exit_code: status.code().unwrap_or(-1),
                    stdout: stdout_result.bytes,
                    stderr: stderr_result.bytes,
                    output_overflowed: stdout_result.overflowed || stderr_result.overflowed,
                })
            }
        }
    }

    fn validate_output_path(&self, path: &str, work_dir: &Path) -> Result<(PathBuf, RiskLevel)> {
        validate_output_path(path, work_dir)
    }

    async fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.temp_base).await?;
        let dir = self.temp_base.join(format!("{group_name}-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir(&dir).await?;
        self.temp_dirs.lock().push(dir.clone());
        Ok(dir)
    }

    async fn cleanup_temp_dir(&self, path: &Path) -> Result<()> {
        if self.keep_temp_dirs {
            return Ok(());
        }
        self.temp_dirs.lock().retain(|p| p != path);
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn cleanup_all_temp_dirs(&self) -> Result<()> {
        let dirs = std::mem::take(&mut *self.temp_dirs.lock());
        for dir in dirs {
            if self.keep_temp_dirs {
                continue;
            }
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %dir.display(), error = %e, "temp dir cleanup failed");
                }
            }
        }
        Ok(())
    }

    fn dry_run_results(&self) -> Option<DryRunResult> {
        None
    }

    fn set_execution_error(&self, _kind: &str, _message: &str, _component: &str, _details: &str, _phase: &str) {}
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Canceled,
    TimedOut,
}

#[derive(Default)]
struct CapturedStream {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Reads `source` to EOF, accumulating into a size-bounded buffer and
/// optionally tee-ing the same bytes into `file_path` (spec.md §4.5).
async fn read_capped(
    mut source: impl tokio::io::AsyncRead + Unpin,
    cap: u64,
    file_path: Option<PathBuf>,
) -> CapturedStream {
    let mut buf = CaptureBuffer::new(cap);
    let mut file = match &file_path {
        Some(path) => tokio::fs::File::create(path).await.ok(),
        None => None,
    };
    let mut file_written = 0u64;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        match source.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.push(&chunk[..n]);
                if let Some(f) = file.as_mut() {
                    if cap == 0 || file_written < cap {
                        let remaining = if cap == 0 { n as u64 } else { cap - file_written };
                        let to_write = remaining.min(n as u64) as usize;
                        if tokio::io::AsyncWriteExt::write_all(f, &chunk[..to_write]).await.is_ok() {
                            file_written += to_write as u64;
                        }
                    }
                }
            }
            Err(_) => break,
        }
    }

    let (bytes, overflowed) = buf.into_parts();
    CapturedStream { bytes, overflowed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{RunId, SystemClock};

    fn runtime_command(cmd: &str, args: &[&str]) -> RuntimeCommand {
        RuntimeCommand {
            name: "test".to_string(),
            cmd: cmd.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            expanded_env: HashMap::new(),
            work_dir: None,
            timeout: std::time::Duration::from_secs(5),
            output_size_limit: 0,
            output_file: None,
            run_as_user: None,
            run_as_group: None,
        }
    }

    fn manager() -> NormalResourceManager {
        NormalResourceManager::new(
            Arc::new(SystemClock),
            std::env::temp_dir().join("warden-test"),
            false,
            ProcessMonitor::new(),
            None,
        )
    }

    #[tokio::test]
    async fn runs_a_command_and_captures_stdout() {
        let manager = manager();
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let cmd = runtime_command("/bin/echo", &["hello"]);
        let result = manager.execute_command(&ctx, &cmd, "g", &HashMap::new()).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout_lossy().trim(), "hello");
        assert!(!result.output_overflowed);
    }

    #[tokio::test]
    async fn nonzero_exit_is_reflected_without_erroring() {
        let manager = manager();
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let cmd = runtime_command("/bin/sh", &["-c", "exit 7"]);
        let result = manager.execute_command(&ctx, &cmd, "g", &HashMap::new()).await.unwrap();
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let manager = manager();
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let mut cmd = runtime_command("/bin/sleep", &["5"]);
        cmd.timeout = std::time::Duration::from_millis(50);
        let err = manager.execute_command(&ctx, &cmd, "g", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_is_honored() {
        let manager = manager();
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let cmd = runtime_command("/bin/sleep", &["5"]);
        let ctx_clone = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            ctx_clone.cancel();
        });
        let err = manager.execute_command(&ctx, &cmd, "g", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Canceled));
    }

    #[tokio::test]
    async fn temp_dir_lifecycle_create_and_cleanup() {
        let manager = manager();
        let dir = manager.create_temp_dir("build").await.unwrap();
        assert!(dir.exists());
        manager.cleanup_temp_dir(&dir).await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn privileged_command_without_manager_is_rejected() {
        let manager = manager();
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let mut cmd = runtime_command("/bin/echo", &["hi"]);
        cmd.run_as_user = Some("nobody".to_string());
        let err = manager.execute_command(&ctx, &cmd, "g", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[tokio::test]
    async fn privileged_command_with_relative_path_is_rejected() {
        let manager = NormalResourceManager::new(
            Arc::new(SystemClock),
            std::env::temp_dir().join("warden-test"),
            false,
            ProcessMonitor::new(),
            Some(Arc::new(PrivilegeManager::new(Arc::new(SystemClock)))),
        );
        let ctx = ExecutionContext::new(RunId::new("r1"));
        let mut cmd = runtime_command("echo", &["hi"]);
        cmd.run_as_user = Some("nobody".to_string());
        let err = manager.execute_command(&ctx, &cmd, "g", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(_)));
    }
}
