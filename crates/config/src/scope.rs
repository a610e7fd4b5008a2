// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties the variable expander (§4.1) and allowlist projection (§4.2)
//! together to turn raw `GlobalSpec`/`GroupSpec` into `RuntimeGlobal`/
//! `RuntimeGroup`.

use crate::env_filter::{effective_allowlist, require_allowlisted};
use crate::expand::{resolve_list, resolve_map};
use std::collections::HashMap;
use std::time::Duration;
use warden_core::{CommandSpec, GlobalSpec, GroupSpec, InheritanceMode, Result, RuntimeCommand, RuntimeGlobal, RuntimeGroup};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_OUTPUT_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// Expands `global` into its runtime form. `system_env` is the caller's
/// ambient environment (OS environment merged with any `--env-file`),
/// used to satisfy `from_env` entries.
pub fn expand_global(global: &GlobalSpec, system_env: &HashMap<String, String>) -> Result<RuntimeGlobal> {
    let env_allowed: std::collections::HashSet<String> = global.env_allowed.iter().cloned().collect();

    // from_env: internal name <- system env name, gated by the allowlist.
    let mut base: HashMap<String, String> = HashMap::new();
    for (internal_name, system_name) in &global.from_env {
        require_allowlisted(&env_allowed, system_name)
            .map_err(|_| warden_core::Error::AllowlistViolation {
                group: "global".to_string(),
                name: system_name.clone(),
            })?;
        let value = system_env.get(system_name).cloned().unwrap_or_default();
        base.insert(internal_name.clone(), value);
    }

    let vars = resolve_map(&global.vars, &base, "global.vars")?;

    let mut vars_and_base = base.clone();
    vars_and_base.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));

    let env = resolve_map(&global.env, &vars_and_base, "global.env")?;

    let mut full_scope = vars_and_base.clone();
    full_scope.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));

    let verify_files = resolve_list(&global.verify_files, &full_scope, "global.verify_files")?;

    Ok(RuntimeGlobal {
        timeout: Duration::from_secs(global.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        output_size_limit: global.output_size_limit.unwrap_or(DEFAULT_OUTPUT_SIZE_LIMIT),
        log_level: global.log_level.clone(),
        env_allowed,
        expanded_vars: vars,
        expanded_env: env,
        expanded_verify_files: verify_files,
    })
}

/// Expands `group` into its runtime form, inheriting `global`'s expanded
/// bindings as the base scope before layering the group's own
/// `vars`/`env`/`verify_files` (spec.md §4.1).
pub fn expand_group(global: &RuntimeGlobal, group: &GroupSpec) -> Result<RuntimeGroup> {
    let (mode, env_allowed) = effective_allowlist(&global.env_allowed, &group.env_allowed);

    let mut base = global.expanded_vars.clone();
    base.extend(global.expanded_env.iter().map(|(k, v)| (k.clone(), v.clone())));

    let ctx_prefix = format!("group[{}]", group.name);
    let vars = resolve_map(&group.vars, &base, &format!("{ctx_prefix}.vars"))?;

    let mut vars_and_base = base.clone();
    vars_and_base.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));

    let env = resolve_map(&group.env, &vars_and_base, &format!("{ctx_prefix}.env"))?;

    let mut full_scope = vars_and_base.clone();
    full_scope.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));

    let verify_files = resolve_list(
        &group.verify_files,
        &full_scope,
        &format!("{ctx_prefix}.verify_files"),
    )?;

    let commands = group
        .commands
        .iter()
        .map(|cmd| expand_command(global, group, cmd, &full_scope))
        .collect::<Result<Vec<_>>>()?;

    Ok(RuntimeGroup {
        name: group.name.clone(),
        description: group.description.clone(),
        priority: group.priority,
        depends_on: group.depends_on.clone(),
        inheritance_mode: mode,
        env_allowed,
        expanded_vars: vars,
        expanded_env: env,
        expanded_verify_files: verify_files,
        temp_dir: group.temp_dir,
        work_dir: group.work_dir.clone(),
        commands,
    })
}

fn expand_command(
    global: &RuntimeGlobal,
    group: &GroupSpec,
    cmd: &CommandSpec,
    scope: &HashMap<String, String>,
) -> Result<RuntimeCommand> {
    let ctx = format!("group[{}].command[{}].env", group.name, cmd.name);
    let expanded_env = resolve_map(&cmd.env, scope, &ctx)?;

    let timeout = cmd
        .timeout
        .or(group_timeout_override(group))
        .map(Duration::from_secs)
        .unwrap_or(global.timeout);

    let output_size_limit = cmd
        .output_size_limit
        .or(group.output_size_limit)
        .unwrap_or(global.output_size_limit);

    Ok(RuntimeCommand {
        name: cmd.name.clone(),
        cmd: cmd.cmd.clone(),
        args: cmd.args.clone(),
        expanded_env,
        work_dir: cmd.work_dir.clone(),
        timeout,
        output_size_limit,
        output_file: cmd.output_file.clone(),
        run_as_user: cmd.run_as_user.clone(),
        run_as_group: cmd.run_as_group.clone(),
    })
}

/// Groups have no timeout field of their own in the raw spec (spec.md
/// §3 lists `priority`/`depends_on`/allowlist/`vars`/`env`/`verify_files`/
/// `TempDir`/`WorkDir`/`commands` only) — per-command timeout falls back
/// straight to the global default when unset. Kept as a named seam so a
/// future group-level override has one place to land.
fn group_timeout_override(_group: &GroupSpec) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::GlobalSpec;

    #[test]
    fn global_from_env_requires_allowlist() {
        let mut global = GlobalSpec::default();
        global.env_allowed = vec!["SAFE".to_string()];
        global
            .from_env
            .insert("token".to_string(), "UNLISTED".to_string());

        let system_env: HashMap<String, String> =
            [("UNLISTED".to_string(), "secret".to_string())].into_iter().collect();

        let err = expand_global(&global, &system_env).unwrap_err();
        assert!(matches!(err, warden_core::Error::AllowlistViolation { .. }));
    }

    #[test]
    fn global_from_env_pulls_allowlisted_system_var() {
        let mut global = GlobalSpec::default();
        global.env_allowed = vec!["SAFE".to_string()];
        global.from_env.insert("token".to_string(), "SAFE".to_string());
        global.vars.insert("greeting".to_string(), "hi-%{token}".to_string());

        let system_env: HashMap<String, String> =
            [("SAFE".to_string(), "abc123".to_string())].into_iter().collect();

        let runtime = expand_global(&global, &system_env).unwrap();
        assert_eq!(runtime.expanded_vars.get("greeting"), Some(&"hi-abc123".to_string()));
    }

    #[test]
    fn group_inherits_global_bindings() {
        let mut global = GlobalSpec::default();
        global.vars.insert("root".to_string(), "/srv".to_string());
        let runtime_global = expand_global(&global, &HashMap::new()).unwrap();

        let mut group = GroupSpec {
            name: "build".to_string(),
            description: None,
            priority: 1,
            depends_on: vec![],
            env_allowed: None,
            vars: HashMap::new(),
            env: HashMap::new(),
            verify_files: vec![],
            temp_dir: false,
            work_dir: None,
            output_size_limit: None,
            commands: vec![],
        };
        group.vars.insert("bin".to_string(), "%{root}/bin".to_string());

        let runtime_group = expand_group(&runtime_global, &group).unwrap();
        assert_eq!(runtime_group.expanded_vars.get("bin"), Some(&"/srv/bin".to_string()));
        assert_eq!(runtime_group.inheritance_mode, InheritanceMode::Inherit);
    }
}
