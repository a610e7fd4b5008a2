// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verification gate (spec.md §4.3): runs before a group's first command,
//! checking every path in the group's expanded `verify_files` against
//! the hash store. Grounded on `oj-storage`'s `SnapshotError`/
//! `CheckpointError` structured-outcome style — one counts struct
//! capturing verified/failed/skipped rather than a bare bool.

use crate::hashstore::{compute_digest, HashStore};
use std::path::Path;
use tracing::{info, warn};
use warden_core::VerificationError;

/// Verifies every path in `paths` against `store`.
///
/// - No expected digest on record: **skipped** (a path with nothing to
///   compare against cannot meaningfully fail; spec.md §4.3's "explicitly
///   skipped by policy").
/// - Digest matches: **verified**.
/// - Digest present but mismatched, or the file cannot be read/hashed:
///   **failed**.
///
/// Returns `Ok(())` if nothing failed, else `Err(VerificationError)` with
/// the full counts — the caller (group executor) treats this as
/// non-fatal to the batch (spec.md §4.3: the group is skipped, the
/// runner continues with the rest).
pub fn verify_group(
    group: &str,
    paths: &[String],
    store: &dyn HashStore,
) -> Result<(), VerificationError> {
    let total = paths.len();
    let mut verified = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    let mut first_cause: Option<String> = None;

    for raw_path in paths {
        let path = Path::new(raw_path);
        match store.expected_digest(path) {
            Ok(None) => {
                skipped += 1;
                info!(group, path = raw_path.as_str(), "no hash-store entry; skipping verification");
            }
            Ok(Some(expected)) => match compute_digest(path) {
                Ok(actual) if actual == expected => {
                    verified += 1;
                }
                Ok(actual) => {
                    failed += 1;
                    first_cause.get_or_insert_with(|| {
                        format!("{raw_path}: digest mismatch (expected {expected}, got {actual})")
                    });
                    warn!(group, path = raw_path.as_str(), "integrity check failed: digest mismatch");
                }
                Err(e) => {
                    failed += 1;
                    first_cause.get_or_insert_with(|| format!("{raw_path}: {e}"));
                    warn!(group, path = raw_path.as_str(), error = %e, "integrity check failed: could not hash file");
                }
            },
            Err(e) => {
                failed += 1;
                first_cause.get_or_insert_with(|| format!("{raw_path}: hash store error: {e}"));
                warn!(group, path = raw_path.as_str(), error = %e, "integrity check failed: hash store error");
            }
        }
    }

    if failed == 0 {
        Ok(())
    } else {
        Err(VerificationError {
            group: group.to_string(),
            total,
            verified,
            failed,
            skipped,
            cause: first_cause.unwrap_or_default(),
        })
    }
}
