// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Privilege manager (spec.md §4.6): `with_privileges` acquires the
//! requested user/group, runs a synchronous closure, and restores the
//! original identity unconditionally — including on panic, via a guard
//! whose `Drop` impl does the restore. Privileges are never held across
//! an `.await` because the closure itself is synchronous (spec.md §5).
//!
//! Metrics are grounded on the atomic-counter idiom used for `oj-core`'s
//! sequential ID generator; the audit trail is newline-delimited JSON,
//! one `AuditEntry` per attempt, per SPEC_FULL §10.6.

use parking_lot::Mutex;
use std::panic::{catch_unwind, UnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use warden_core::{AuditEntry, Clock, Error, PrivilegeMetrics, Result};

#[cfg(unix)]
use nix::unistd::{Gid, Group, Uid, User};

pub struct PrivilegeManager {
    clock: Arc<dyn Clock>,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_elevation_nanos: AtomicU64,
    max_elevation_nanos: AtomicU64,
    last_elevation_at: Mutex<Option<chrono::DateTime<chrono::Utc>>>,
    last_error: Mutex<Option<String>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl PrivilegeManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_elevation_nanos: AtomicU64::new(0),
            max_elevation_nanos: AtomicU64::new(0),
            last_elevation_at: Mutex::new(None),
            last_error: Mutex::new(None),
            audit: Mutex::new(Vec::new()),
        }
    }

    /// Acquires the identity named by `run_as_user`/`run_as_group`, runs
    /// `f`, and restores the prior identity regardless of outcome.
    #[cfg(unix)]
    pub fn with_privileges<F, T>(
        &self,
        operation: &str,
        command_name: &str,
        run_as_user: Option<&str>,
        run_as_group: Option<&str>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Result<T> + UnwindSafe,
        T: UnwindSafe,
    {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        let original_uid = Uid::current();
        let original_gid = Gid::current();

        // Guards the identity unconditionally, including when elevation
        // only partially succeeds (e.g. setegid succeeds, seteuid then
        // fails) — without this the gid would stay elevated forever since
        // `elevate`'s error path returns before any guard exists.
        let _guard = RestoreGuard {
            original_uid,
            original_gid,
        };

        let elevated = self.elevate(run_as_user, run_as_group);
        let target_uid = match &elevated {
            Ok((uid, _)) => *uid,
            Err(_) => original_uid,
        };

        let outcome = elevated.and_then(|_| {
            catch_unwind(f).unwrap_or_else(|payload| {
                // Restore happens via the guard's Drop before we resume
                // the unwind, so privileges are never leaked to the caller.
                std::panic::resume_unwind(payload)
            })
        });

        let duration = start.elapsed();
        let success = outcome.is_ok();
        self.record(
            operation,
            command_name,
            original_uid.as_raw(),
            target_uid.as_raw(),
            success,
            duration,
            outcome.as_ref().err().map(|e| e.to_string()),
        );
        outcome
    }

    #[cfg(unix)]
    fn elevate(&self, run_as_user: Option<&str>, run_as_group: Option<&str>) -> Result<(Uid, Option<Gid>)> {
        let target_uid = match run_as_user {
            Some(name) => resolve_uid(name)?,
            None => Uid::current(),
        };
        let target_gid = match run_as_group {
            Some(name) => Some(resolve_gid(name)?),
            None => None,
        };

        if let Some(gid) = target_gid {
            nix::unistd::setegid(gid).map_err(|e| Error::PrivilegeElevationFailed {
                operation: "setegid".to_string(),
                message: e.to_string(),
            })?;
        }
        nix::unistd::seteuid(target_uid).map_err(|e| Error::PrivilegeElevationFailed {
            operation: "seteuid".to_string(),
            message: e.to_string(),
        })?;

        Ok((target_uid, target_gid))
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        operation: &str,
        command_name: &str,
        original_uid: u32,
        target_uid: u32,
        success: bool,
        duration: Duration,
        error: Option<String>,
    ) {
        if success {
            self.successes.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        let nanos = duration.as_nanos() as u64;
        self.total_elevation_nanos.fetch_add(nanos, Ordering::SeqCst);
        self.max_elevation_nanos.fetch_max(nanos, Ordering::SeqCst);

        let now = self.clock.now();
        *self.last_elevation_at.lock() = Some(now);
        if let Some(err) = &error {
            *self.last_error.lock() = Some(err.clone());
        }

        self.audit.lock().push(AuditEntry {
            operation: operation.to_string(),
            command_name: command_name.to_string(),
            original_uid,
            target_uid,
            success,
            duration,
            recorded_at: now,
        });
    }

    pub fn metrics_snapshot(&self) -> PrivilegeMetrics {
        PrivilegeMetrics {
            attempts: self.attempts.load(Ordering::SeqCst),
            successes: self.successes.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            total_elevation: Duration::from_nanos(self.total_elevation_nanos.load(Ordering::SeqCst)),
            max_elevation: Duration::from_nanos(self.max_elevation_nanos.load(Ordering::SeqCst)),
            last_elevation_at: *self.last_elevation_at.lock(),
            last_error: self.last_error.lock().clone(),
        }
    }

    /// The audit trail as newline-delimited JSON, one line per attempt.
    pub fn audit_ndjson(&self) -> Result<String> {
        let mut out = String::new();
        for entry in self.audit.lock().iter() {
            out.push_str(&serde_json::to_string(entry).map_err(|e| Error::ExecutorError {
                command: entry.command_name.clone(),
                message: format!("serializing audit entry: {e}"),
            })?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(unix)]
struct RestoreGuard {
    original_uid: Uid,
    original_gid: Gid,
}

#[cfg(unix)]
impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let _ = nix::unistd::seteuid(self.original_uid);
        let _ = nix::unistd::setegid(self.original_gid);
    }
}

#[cfg(unix)]
fn resolve_uid(name: &str) -> Result<Uid> {
    User::from_name(name)
        .map_err(|e| Error::PrivilegeElevationFailed {
            operation: "resolve_uid".to_string(),
            message: e.to_string(),
        })?
        .map(|user| user.uid)
        .ok_or_else(|| Error::PrivilegeElevationFailed {
            operation: "resolve_uid".to_string(),
            message: format!("no such user: {name}"),
        })
}

#[cfg(unix)]
fn resolve_gid(name: &str) -> Result<Gid> {
    Group::from_name(name)
        .map_err(|e| Error::PrivilegeElevationFailed {
            operation: "resolve_gid".to_string(),
            message: e.to_string(),
        })?
        .map(|group| group.gid)
        .ok_or_else(|| Error::PrivilegeElevationFailed {
            operation: "resolve_gid".to_string(),
            message: format!("no such group: {name}"),
        })
}
