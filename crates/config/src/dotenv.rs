// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `.env` file reading (spec.md §6).
//!
//! `KEY=VALUE` lines. Name/value content validation is deferred to
//! execution time (§4.2) — the loader's own job is purely: read lines,
//! and refuse files whose permissions are loose enough that another local
//! user could tamper with the values before they're read.

use std::collections::HashMap;
use std::path::Path;
use warden_core::{Error, Result};

/// Permission bits that make a file writable by group or other.
/// "Stricter than 0644" (spec.md §6) means none of these bits may be set.
const LOOSE_WRITE_BITS: u32 = 0o022;

pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    check_permissions(path)?;
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigInvalid(format!("reading env file {}: {e}", path.display())))?;
    Ok(parse_env_file(&text))
}

fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = std::fs::metadata(path)
            .map_err(|e| Error::ConfigInvalid(format!("stat {}: {e}", path.display())))?;
        let mode = meta.permissions().mode();
        if mode & LOOSE_WRITE_BITS != 0 {
            return Err(Error::ConfigInvalid(format!(
                "env file {} has loose permissions {:o}; must not be group/other writable",
                path.display(),
                mode & 0o777
            )));
        }
    }
    Ok(())
}

/// Parses `KEY=VALUE` lines. Blank lines and lines starting with `#` are
/// skipped. Values are taken verbatim (no quote stripping, no shell
/// expansion) — the caller is responsible for subjecting them to the same
/// validator used for in-config values, at execution time.
fn parse_env_file(text: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            out.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_key_value_lines_and_skips_comments() {
        let parsed = parse_env_file("# comment\nFOO=bar\n\nBAZ=qux=extra\n");
        assert_eq!(parsed.get("FOO"), Some(&"bar".to_string()));
        assert_eq!(parsed.get("BAZ"), Some(&"qux=extra".to_string()));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn rejects_group_writable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "FOO=bar").unwrap();
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o664)).unwrap();
            let err = load_env_file(&path).unwrap_err();
            assert!(matches!(err, Error::ConfigInvalid(_)));
        }
    }

    #[test]
    fn accepts_owner_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "FOO=bar").unwrap();
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }

        let parsed = load_env_file(&path).unwrap();
        assert_eq!(parsed.get("FOO"), Some(&"bar".to_string()));
    }
}
