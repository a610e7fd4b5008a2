// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expanded ("runtime") forms produced by the variable expander and
//! environment filter (spec.md §3, §4.1, §4.2). Only these forms are
//! consumed by the group executor and resource manager — the raw
//! `config` types never reach execution directly.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// How a group's env allowlist relates to the global one (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InheritanceMode {
    /// Group's `env_allowlist` was absent: use the global allowlist as-is.
    Inherit,
    /// Group's `env_allowlist` was present and non-empty: use it, projecting
    /// the global allowlist away entirely.
    Explicit,
    /// Group's `env_allowlist` was present and empty: block all env
    /// inheritance for this group.
    Reject,
}

impl InheritanceMode {
    /// Classifies a group's raw `env_allowed` field per spec.md §3/§8.
    pub fn classify(raw: &Option<Vec<String>>) -> Self {
        match raw {
            None => InheritanceMode::Inherit,
            Some(list) if list.is_empty() => InheritanceMode::Reject,
            Some(_) => InheritanceMode::Explicit,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeGlobal {
    pub timeout: Duration,
    pub output_size_limit: u64,
    pub log_level: Option<String>,
    pub env_allowed: HashSet<String>,
    pub expanded_vars: HashMap<String, String>,
    pub expanded_env: HashMap<String, String>,
    pub expanded_verify_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeGroup {
    pub name: String,
    pub description: Option<String>,
    pub priority: i64,
    pub depends_on: Vec<String>,
    pub inheritance_mode: InheritanceMode,
    /// The effective allowlist after projecting `inheritance_mode`.
    pub env_allowed: HashSet<String>,
    pub expanded_vars: HashMap<String, String>,
    pub expanded_env: HashMap<String, String>,
    pub expanded_verify_files: Vec<String>,
    pub temp_dir: bool,
    pub work_dir: Option<String>,
    pub commands: Vec<RuntimeCommand>,
}

#[derive(Debug, Clone)]
pub struct RuntimeCommand {
    pub name: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub expanded_env: HashMap<String, String>,
    pub work_dir: Option<String>,
    pub timeout: Duration,
    /// Resolved per spec.md §4.5: command override, then group, then
    /// global. `0` means unlimited.
    pub output_size_limit: u64,
    pub output_file: Option<String>,
    pub run_as_user: Option<String>,
    pub run_as_group: Option<String>,
}
