// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod dotenv;
mod env_filter;
mod expand;
mod loader;
mod scope;

pub use dotenv::load_env_file;
pub use env_filter::{effective_allowlist, filter_environment, require_allowlisted, validate_env_name};
pub use expand::{resolve_list, resolve_map, MAX_EXPANSION_DEPTH};
pub use loader::{load_config, parse_config};
pub use scope::{expand_global, expand_group};
