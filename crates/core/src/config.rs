// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw, declarative configuration types (spec.md §3, §6).
//!
//! These mirror the TOML document byte-for-byte: no expansion, no
//! allowlist projection, no inheritance resolution. Only `warden-config`'s
//! loader and the components in `warden-config`/`warden-exec` interpret
//! them; the structs themselves carry no behavior.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported config schema version. A config declaring a different
/// `version` is rejected at load time (SPEC_FULL §10.4).
pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSpec {
    pub version: u32,
    #[serde(default)]
    pub global: GlobalSpec,
    #[serde(rename = "group", default)]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalSpec {
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub output_size_limit: Option<u64>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default, rename = "env_allowlist")]
    pub env_allowed: Vec<String>,
    #[serde(default)]
    pub from_env: HashMap<String, String>,
    #[serde(default)]
    pub vars: HashMap<String, String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub verify_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// `None` = not set (Inherit mode). `Some(vec![])` = explicitly empty
    /// (Reject mode). `Some(non_empty)` = Explicit mode. TOML cannot
    /// distinguish "absent" from "null" on its own, so the loader is
    /// responsible for using `Option<Vec<String>>` rather than
    /// `#[serde(default)]` here.
    #[serde(rename = "env_allowlist")]
    pub env_allowed: Option<Vec<String>>,
    #[serde(default)]
    pub vars: HashMap<String, String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub verify_files: Vec<String>,
    #[serde(default)]
    pub temp_dir: bool,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub output_size_limit: Option<u64>,
    #[serde(rename = "commands", default)]
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub output_size_limit: Option<u64>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub run_as_user: Option<String>,
    #[serde(default)]
    pub run_as_group: Option<String>,
}
