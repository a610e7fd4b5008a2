// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-group environment allowlist projection (spec.md §4.2).
//!
//! Grounded on `oj-engine::vars::namespace_vars`'s projection-over-a-map
//! shape, generalized from "namespace everything" to "keep only what's
//! allowlisted under the group's inheritance mode."

use std::collections::{HashMap, HashSet};
use warden_core::{Error, InheritanceMode, Result};

/// Computes a group's effective allowlist and inheritance mode from the
/// global allowlist and the group's own raw `env_allowed` field
/// (spec.md §3, §8).
pub fn effective_allowlist(
    global_allowed: &HashSet<String>,
    group_allowed: &Option<Vec<String>>,
) -> (InheritanceMode, HashSet<String>) {
    let mode = InheritanceMode::classify(group_allowed);
    let allowed = match mode {
        InheritanceMode::Inherit => global_allowed.clone(),
        InheritanceMode::Explicit => group_allowed.clone().unwrap_or_default().into_iter().collect(),
        InheritanceMode::Reject => HashSet::new(),
    };
    (mode, allowed)
}

/// Rejects environment variable names containing whitespace, `=`, or NUL.
pub fn validate_env_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedEnvironmentVar {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }
    if name.chars().any(|c| c.is_whitespace() || c == '=' || c == '\0') {
        return Err(Error::MalformedEnvironmentVar {
            name: name.to_string(),
            reason: "name contains whitespace, '=', or NUL".to_string(),
        });
    }
    Ok(())
}

/// Returns the subset of `caller_env` visible to a group with the given
/// effective allowlist. Names failing [`validate_env_name`] are dropped
/// from the *caller-supplied* source set rather than failing the whole
/// filter — a malformed name already present in the ambient OS
/// environment must not abort every group; it simply can never be
/// allowlisted. `from_env`/`vars`/`env` values defined directly in the
/// config are validated separately, since those do cause a hard failure.
pub fn filter_environment(
    allowlist: &HashSet<String>,
    caller_env: &HashMap<String, String>,
) -> HashMap<String, String> {
    caller_env
        .iter()
        .filter(|(name, _)| validate_env_name(name).is_ok())
        .filter(|(name, _)| allowlist.contains(name.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Checks that `name` is present in `allowlist`, for gating `from_env`
/// sourcing (spec.md §4.1: "each requires the source system variable to
/// be allowlisted").
pub fn require_allowlisted(allowlist: &HashSet<String>, name: &str) -> Result<()> {
    if allowlist.contains(name) {
        Ok(())
    } else {
        Err(Error::AllowlistViolation {
            group: String::new(),
            name: name.to_string(),
        })
    }
}
