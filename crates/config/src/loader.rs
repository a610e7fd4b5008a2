// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config file loading — the external "config file parser" boundary
//! (spec.md §1), kept thin: pure `serde`/`toml` deserialization plus the
//! one piece of load-time validation spec.md actually asks for, the
//! version check (SPEC_FULL §10.4).

use std::path::Path;
use warden_core::{ConfigSpec, Error, Result, SUPPORTED_CONFIG_VERSION};

pub fn load_config(path: &Path) -> Result<ConfigSpec> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigInvalid(format!("reading {}: {e}", path.display())))?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<ConfigSpec> {
    let config: ConfigSpec =
        toml::from_str(text).map_err(|e| Error::ConfigInvalid(format!("parsing config: {e}")))?;

    if config.version != SUPPORTED_CONFIG_VERSION {
        return Err(Error::ConfigInvalid(format!(
            "unsupported config version {} (expected {})",
            config.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_version() {
        let err = parse_config("version = 99\n").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn parses_minimal_config() {
        let config = parse_config(
            r#"
            version = 1

            [[group]]
            name = "build"
            priority = 1

            [[group.commands]]
            name = "compile"
            cmd = "make"
            args = ["all"]
            "#,
        )
        .unwrap();
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].commands[0].cmd, "make");
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_config("not valid toml [[[").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }
}
