// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result and telemetry types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of a single `ExecuteCommand` call (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Opaque token correlating this result to a dry-run analysis entry.
    pub token: String,
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Set when the output capture manager truncated the command's output.
    pub output_overflowed: bool,
}

impl ExecutionResult {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A live child process tracked by the process monitor (spec.md §3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub command_name: String,
    pub started_at: DateTime<Utc>,
}

/// Point-in-time snapshot of the privilege manager's counters (spec.md §3, §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivilegeMetrics {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_elevation: Duration,
    pub max_elevation: Duration,
    pub last_elevation_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// One entry in the privilege manager's audit trail (SPEC_FULL §10.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub operation: String,
    pub command_name: String,
    pub original_uid: u32,
    pub target_uid: u32,
    pub success: bool,
    pub duration: Duration,
    pub recorded_at: DateTime<Utc>,
}

/// Structured counts produced by the verification gate (spec.md §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationError {
    pub group: String,
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cause: String,
}

impl VerificationError {
    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

/// A single recorded intent in dry-run mode (spec.md §4.8 `GetDryRunResults`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResourceAnalysis {
    OperationExecute {
        token: String,
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        work_dir: String,
    },
    OperationFilesystem {
        description: String,
        path: String,
    },
    OperationPrivilegeElevation {
        command: String,
        run_as_user: Option<String>,
        run_as_group: Option<String>,
    },
    SimulatedError {
        kind: String,
        message: String,
        component: String,
        details: String,
        phase: String,
    },
}

/// The full recorded intent of a dry run (spec.md §4.8, §8 seed scenario 5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DryRunResult {
    pub analyses: Vec<ResourceAnalysis>,
}

impl DryRunResult {
    pub fn push(&mut self, analysis: ResourceAnalysis) {
        self.analyses.push(analysis);
    }

    pub fn execute_count(&self) -> usize {
        self.analyses
            .iter()
            .filter(|a| matches!(a, ResourceAnalysis::OperationExecute { .. }))
            .count()
    }
}
