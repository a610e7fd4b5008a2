// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The recording `ResourceManager` (spec.md §4.8 "dry-run"): never
//! side-effects, only appends a `ResourceAnalysis` per would-be operation
//! to a shared `DryRunResult`.

use crate::manager::ResourceManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use warden_core::{DryRunResult, ExecutionContext, ExecutionResult, ResourceAnalysis, Result, RuntimeCommand};
use warden_security::RiskLevel;

#[derive(Default)]
pub struct DryRunResourceManager {
    result: Mutex<DryRunResult>,
}

impl DryRunResourceManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceManager for DryRunResourceManager {
    async fn execute_command(
        &self,
        _ctx: &ExecutionContext,
        cmd: &RuntimeCommand,
        _group: &str,
        env: &HashMap<String, String>,
    ) -> Result<ExecutionResult> {
        let token = uuid::Uuid::new_v4().to_string();

        if cmd.run_as_user.is_some() || cmd.run_as_group.is_some() {
            self.result.lock().push(ResourceAnalysis::OperationPrivilegeElevation {
                command: cmd.name.clone(),
                run_as_user: cmd.run_as_user.clone(),
                run_as_group: cmd.run_as_group.clone(),
            });
        }

        self.result.lock().push(ResourceAnalysis::OperationExecute {
            token: token.clone(),
            command: cmd.cmd.clone(),
            args: cmd.args.clone(),
            env: env.clone(),
            work_dir: cmd.work_dir.clone().unwrap_or_default(),
        });

        Ok(ExecutionResult {
            token,
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            output_overflowed: false,
        })
    }

    fn validate_output_path(&self, path: &str, work_dir: &Path) -> Result<(PathBuf, RiskLevel)> {
        let resolved = warden_security::validate_output_path(path, work_dir)?;
        self.result.lock().push(ResourceAnalysis::OperationFilesystem {
            description: "validate output path".to_string(),
            path: resolved.0.display().to_string(),
        });
        Ok(resolved)
    }

    async fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf> {
        let path = std::env::temp_dir().join(format!("warden-dry-run-{group_name}-{}", uuid::Uuid::new_v4()));
        self.result.lock().push(ResourceAnalysis::OperationFilesystem {
            description: "create temp dir".to_string(),
            path: path.display().to_string(),
        });
        Ok(path)
    }

    async fn cleanup_temp_dir(&self, path: &Path) -> Result<()> {
        self.result.lock().push(ResourceAnalysis::OperationFilesystem {
            description: "cleanup temp dir".to_string(),
            path: path.display().to_string(),
        });
        Ok(())
    }

    async fn cleanup_all_temp_dirs(&self) -> Result<()> {
        Ok(())
    }

    fn dry_run_results(&self) -> Option<DryRunResult> {
        Some(self.result.lock().clone())
    }

    fn set_execution_error(&self, kind: &str, message: &str, component: &str, details: &str, phase: &str) {
        self.result.lock().push(ResourceAnalysis::SimulatedError {
            kind: kind.to_string(),
            message: message.to_string(),
            component: component.to_string(),
            details: details.to_string(),
            phase: phase.to_string(),
        });
    }
}
