// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource manager façade (spec.md §4.8): the single entry point for
//! every side effect a command can cause. Two implementations
//! (`normal`, `dryrun`) share this trait; the group executor is oblivious
//! to which is active (spec.md §9 "Resource manager polymorphism").

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use warden_core::{DryRunResult, ExecutionContext, ExecutionResult, Result, RuntimeCommand};
use warden_security::RiskLevel;

#[async_trait]
pub trait ResourceManager: Send + Sync {
    async fn execute_command(
        &self,
        ctx: &ExecutionContext,
        cmd: &RuntimeCommand,
        group: &str,
        env: &HashMap<String, String>,
    ) -> Result<ExecutionResult>;

    /// Delegates to §4.4/§4.5; called before `execute_command` for any
    /// command declaring an output file.
    fn validate_output_path(&self, path: &str, work_dir: &Path) -> Result<(PathBuf, RiskLevel)>;

    async fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf>;
    async fn cleanup_temp_dir(&self, path: &Path) -> Result<()>;
    async fn cleanup_all_temp_dirs(&self) -> Result<()>;

    /// `None` outside dry-run mode.
    fn dry_run_results(&self) -> Option<DryRunResult>;

    /// Records a simulated failure into the dry-run result; a no-op
    /// outside dry-run mode.
    fn set_execution_error(&self, kind: &str, message: &str, component: &str, details: &str, phase: &str);
}
