// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds for the orchestrator.

use thiserror::Error;

/// Every failure mode the execution pipeline can surface, in one enum so
/// that the runner can match on error *kind* rather than on which crate
/// raised it (mirrors the teacher's layered `RuntimeError`/`ExecuteError`
/// split, collapsed to one enum since this pipeline has no event loop to
/// keep crate-local error types isolated from).
#[derive(Debug, Error)]
pub enum Error {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("env var {name:?} not in allowlist for group {group:?}")]
    AllowlistViolation { group: String, name: String },

    #[error("unclosed %{{...}} reference in {context:?}: {text:?}")]
    UnclosedReference { context: String, text: String },

    #[error("undefined variable {name:?} referenced in {context:?}")]
    UndefinedVariable { context: String, name: String },

    #[error("circular variable reference detected while expanding {context:?}")]
    CircularReference { context: String },

    #[error("verification failed for group {group:?}: {verified}/{total} verified, {failed} failed, {skipped} skipped ({cause})")]
    VerificationFailed {
        group: String,
        total: usize,
        verified: usize,
        failed: usize,
        skipped: usize,
        cause: String,
    },

    #[error("unsafe environment variable {name:?}: matched dangerous pattern {pattern:?}")]
    UnsafeEnvironmentVar { name: String, pattern: String },

    #[error("malformed environment variable name {name:?}: {reason}")]
    MalformedEnvironmentVar { name: String, reason: String },

    #[error("path traversal rejected for {path:?}")]
    PathTraversal { path: String },

    #[error("write permission denied for {path:?}")]
    WritePermissionDenied { path: String },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command {command:?} failed with exit code {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("executor error running {command:?}: {message}")]
    ExecutorError { command: String, message: String },

    #[error("command {command:?} timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("canceled")]
    Canceled,

    #[error("privilege elevation failed for {operation:?}: {message}")]
    PrivilegeElevationFailed { operation: String, message: String },

    #[error("dependency not found: group {group:?} depends on unknown group {dependency:?}")]
    DependencyNotFound { group: String, dependency: String },

    #[error("circular dependency detected involving group {0:?}")]
    CircularDependency(String),

    #[error("a non-empty --run-id is required")]
    RunIdRequired,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps an error to the CLI exit code defined in spec.md §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigInvalid(_) | Error::RunIdRequired => 2,
            Error::VerificationFailed { .. } => 3,
            Error::Timeout { .. } => 124,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
