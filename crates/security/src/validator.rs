// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security validator (spec.md §4.4): value validation against the
//! dangerous-pattern set, output-path validation, and an optional
//! executable allowlist.

use crate::patterns::scan_dangerous;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use warden_core::{Error, Result};

/// How severe a path-validation finding is. Informational only — every
/// `Critical`/`High` finding is already a hard `Err`, but the caller may
/// want to log the level alongside the rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// An allowlist of executables a command's `cmd` may be. `None` means
/// unrestricted (spec.md §4.4: "may additionally restrict").
#[derive(Debug, Clone, Default)]
pub struct CommandAllowlist {
    patterns: Vec<Regex>,
}

impl CommandAllowlist {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::ConfigInvalid(format!("invalid command allowlist pattern {p:?}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn allows(&self, cmd: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(cmd))
    }
}

/// Validates a command/env value against the dangerous-pattern set
/// (spec.md §4.2), at execution time only.
pub fn validate_value(name: &str, value: &str) -> Result<()> {
    if let Some(pattern) = scan_dangerous(value) {
        return Err(Error::UnsafeEnvironmentVar {
            name: name.to_string(),
            pattern,
        });
    }
    Ok(())
}

/// Validates every entry of an expanded env/arg map or list against the
/// dangerous-pattern set.
pub fn validate_values<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(entries: I) -> Result<()> {
    for (name, value) in entries {
        validate_value(name, value)?;
    }
    Ok(())
}

/// Checks `cmd` is in `allowlist` (no-op when the allowlist is empty).
pub fn validate_command_allowlist(allowlist: &CommandAllowlist, cmd: &str) -> Result<()> {
    if allowlist.allows(cmd) {
        Ok(())
    } else {
        Err(Error::CommandNotFound(format!(
            "{cmd:?} is not in the command allowlist"
        )))
    }
}

/// Validates an output path (spec.md §4.4, §4.5): rejects absolute
/// paths, `..` traversal after normalization, and symlinks anywhere in
/// the parent chain; checks the effective user can write to the
/// resolved parent directory. Returns the resolved absolute path and
/// its risk level.
pub fn validate_output_path(path: &str, work_dir: &Path) -> Result<(PathBuf, RiskLevel)> {
    let raw = Path::new(path);
    if raw.is_absolute() {
        return Err(Error::PathTraversal {
            path: path.to_string(),
        });
    }

    let joined = work_dir.join(raw);
    let normalized = normalize(&joined);

    if !normalized.starts_with(normalize(work_dir)) {
        return Err(Error::PathTraversal {
            path: path.to_string(),
        });
    }

    reject_symlinks_in_parents(&normalized)?;

    let parent = normalized.parent().unwrap_or(work_dir);
    check_write_permission(parent)?;

    let risk = classify_risk(&normalized);
    Ok((normalized, risk))
}

/// Lexically normalizes a path, resolving `.`/`..` components without
/// touching the filesystem (the path's target need not exist yet).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn reject_symlinks_in_parents(path: &Path) -> Result<()> {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component.as_os_str());
        if current == path {
            break;
        }
        if let Ok(meta) = std::fs::symlink_metadata(&current) {
            if meta.file_type().is_symlink() {
                return Err(Error::PathTraversal {
                    path: path.display().to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn check_write_permission(dir: &Path) -> Result<()> {
    if !dir.exists() {
        // Created at group-setup time (temp_dir/work_dir lifecycle); its
        // own creation already validates the parent is writable.
        return Ok(());
    }
    match nix::unistd::access(dir, nix::unistd::AccessFlags::W_OK) {
        Ok(()) => Ok(()),
        Err(_) => Err(Error::WritePermissionDenied {
            path: dir.display().to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn check_write_permission(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Classifies a resolved output path by whether any of its components
/// names a conceptually sensitive directory. `path` is always anchored
/// under a work dir (`validate_output_path` already rejected absolute
/// and traversal-outside-work-dir cases), so matching against an
/// absolute-path prefix would never fire — this checks components
/// instead, catching e.g. `work_dir/etc/passwd`.
fn classify_risk(path: &Path) -> RiskLevel {
    let components: Vec<&str> = path.components().filter_map(|c| c.as_os_str().to_str()).collect();

    if components.iter().any(|c| matches!(*c, "etc" | "root" | "boot")) {
        RiskLevel::Critical
    } else if components.iter().any(|c| matches!(*c, "var" | "usr")) {
        RiskLevel::High
    } else if components.iter().any(|c| *c == "tmp") {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
