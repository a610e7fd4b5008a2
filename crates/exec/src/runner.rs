// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner (spec.md §4.10): holds the expanded config, wires the resource
//! manager / hash store / privilege manager, and drives `ExecuteAll` /
//! `ExecuteFiltered` over the group executor.

use crate::executor::{execute_group, NullNotifier, SummaryNotifier};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use warden_core::{Clock, Error, ExecutionContext, Result, RunId, RuntimeGlobal, RuntimeGroup};
use warden_resource::{DryRunResourceManager, NormalResourceManager, PrivilegeManager, ProcessMonitor, ResourceManager};
use warden_security::CommandAllowlist;
use warden_verify::{FileHashStore, HashStore};

/// Construction-time options the CLI gathers from flags (spec.md §6).
pub struct RunnerOptions {
    pub run_id: RunId,
    pub dry_run: bool,
    pub keep_temp_dirs: bool,
    pub temp_base: PathBuf,
    pub hash_store_root: PathBuf,
}

pub struct Runner {
    run_id: RunId,
    global: RuntimeGlobal,
    groups: Vec<RuntimeGroup>,
    caller_env: HashMap<String, String>,
    resource: Arc<dyn ResourceManager>,
    hash_store: Arc<dyn HashStore>,
    allowlist: CommandAllowlist,
    notifier: Arc<dyn SummaryNotifier>,
    privileges: Option<Arc<PrivilegeManager>>,
}

impl Runner {
    /// Validates a non-empty run identifier, then wires defaults per
    /// spec.md §4.10: a privilege manager only if some command requests
    /// `run_as_user`/`run_as_group`, and a normal or dry-run resource
    /// manager per `options.dry_run`.
    pub fn new(
        options: RunnerOptions,
        global: RuntimeGlobal,
        groups: Vec<RuntimeGroup>,
        caller_env: HashMap<String, String>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn SummaryNotifier>,
    ) -> Result<Self> {
        if options.run_id.as_str().trim().is_empty() {
            return Err(Error::RunIdRequired);
        }

        let needs_privileges = groups
            .iter()
            .flat_map(|g| &g.commands)
            .any(|c| c.run_as_user.is_some() || c.run_as_group.is_some());

        if needs_privileges && options.dry_run {
            // Dry-run never elevates; the analysis records the *intent*
            // to elevate (spec.md §4.8 OperationPrivilegeElevation)
            // without a real PrivilegeManager.
        }
        let privileges = if needs_privileges && !options.dry_run {
            Some(Arc::new(PrivilegeManager::new(clock.clone())))
        } else {
            None
        };
        if needs_privileges && privileges.is_none() && !options.dry_run {
            return Err(Error::ConfigInvalid(
                "run_as_user/run_as_group requested but no privilege manager is available".to_string(),
            ));
        }

        let resource: Arc<dyn ResourceManager> = if options.dry_run {
            Arc::new(DryRunResourceManager::new())
        } else {
            let monitor = ProcessMonitor::new();
            monitor.start();
            Arc::new(NormalResourceManager::new(
                clock,
                options.temp_base,
                options.keep_temp_dirs,
                monitor,
                privileges.clone(),
            ))
        };

        let hash_store: Arc<dyn HashStore> = Arc::new(FileHashStore::new(options.hash_store_root));

        Ok(Self {
            run_id: options.run_id,
            global,
            groups,
            caller_env,
            resource,
            hash_store,
            allowlist: CommandAllowlist::default(),
            notifier,
            privileges,
        })
    }

    /// Constructs a `Runner` with a no-op notifier, for callers that wire
    /// notification separately or don't need one (tests).
    pub fn with_null_notifier(
        options: RunnerOptions,
        global: RuntimeGlobal,
        groups: Vec<RuntimeGroup>,
        caller_env: HashMap<String, String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::new(options, global, groups, caller_env, clock, Arc::new(NullNotifier))
    }

    pub fn resource_manager(&self) -> Arc<dyn ResourceManager> {
        self.resource.clone()
    }

    pub fn privilege_manager(&self) -> Option<Arc<PrivilegeManager>> {
        self.privileges.clone()
    }

    /// spec.md §4.10 `ExecuteAll`: all groups, ascending priority order.
    pub async fn execute_all(&self, ctx: &ExecutionContext) -> Result<()> {
        let groups: Vec<&RuntimeGroup> = self.groups.iter().collect();
        self.execute_groups(ctx, groups).await
    }

    /// spec.md §4.10 `ExecuteFiltered`: the dependency closure of `names`,
    /// in original priority order. Empty `names` executes everything.
    pub async fn execute_filtered(&self, ctx: &ExecutionContext, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return self.execute_all(ctx).await;
        }
        let closure = dependency_closure(&self.groups, names)?;
        let groups: Vec<&RuntimeGroup> = self.groups.iter().filter(|g| closure.contains(&g.name)).collect();
        self.execute_groups(ctx, groups).await
    }

    async fn execute_groups(&self, ctx: &ExecutionContext, mut groups: Vec<&RuntimeGroup>) -> Result<()> {
        groups.sort_by_key(|g| g.priority);

        let mut first_error: Option<Error> = None;
        let mut first_verification_failure: Option<Error> = None;
        for group in groups {
            if ctx.is_canceled() {
                return Err(Error::Canceled);
            }

            let outcome = execute_group(
                ctx,
                self.run_id.as_str(),
                &self.global,
                group,
                &self.caller_env,
                self.resource.as_ref(),
                self.hash_store.as_ref(),
                &self.allowlist,
                self.notifier.as_ref(),
            )
            .await;

            match outcome {
                Ok(()) => {}
                Err(Error::Canceled) => return Err(Error::Canceled),
                Err(e @ Error::Timeout { .. }) => return Err(e),
                Err(e @ Error::VerificationFailed { ref group, total, verified, failed, skipped, ref cause }) => {
                    warn!(group = group.as_str(), total, verified, failed, skipped, cause = cause.as_str(), "group skipped after verification failure");
                    first_verification_failure.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        // A verification failure never aborts the batch early, but it must
        // still be visible in the final outcome (spec.md §6 exit code 3) —
        // "continue the batch" and "what the final exit code communicates"
        // are independent decisions. A harder error elsewhere takes
        // precedence if both occurred.
        match first_error.or(first_verification_failure) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Computes the dependency closure of `names` via DFS over each group's
/// `depends_on`, detecting cycles and missing dependencies (spec.md §4.10,
/// §9 "Cyclic graphs").
fn dependency_closure(groups: &[RuntimeGroup], names: &[String]) -> Result<HashSet<String>> {
    let by_name: HashMap<&str, &RuntimeGroup> = groups.iter().map(|g| (g.name.as_str(), g)).collect();
    let mut visiting: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut closure: HashSet<String> = HashSet::new();

    for name in names {
        if !by_name.contains_key(name.as_str()) {
            return Err(Error::DependencyNotFound {
                group: "<selection>".to_string(),
                dependency: name.clone(),
            });
        }
        visit(name, &by_name, &mut visiting, &mut visited, &mut closure)?;
    }
    Ok(closure)
}

fn visit(
    name: &str,
    by_name: &HashMap<&str, &RuntimeGroup>,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
    closure: &mut HashSet<String>,
) -> Result<()> {
    if visited.contains(name) {
        return Ok(());
    }
    if visiting.contains(name) {
        return Err(Error::CircularDependency(name.to_string()));
    }
    visiting.insert(name.to_string());

    #[allow(clippy::expect_used)]
    let group = by_name.get(name).expect("caller validated top-level names exist");
    for dep in &group.depends_on {
        if !by_name.contains_key(dep.as_str()) {
            return Err(Error::DependencyNotFound {
                group: name.to_string(),
                dependency: dep.clone(),
            });
        }
        visit(dep, by_name, visiting, visited, closure)?;
    }

    visiting.remove(name);
    visited.insert(name.to_string());
    closure.insert(name.to_string());
    Ok(())
}
