// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-integrity hash store (spec.md §4.3; hash-store I/O is named an
//! external collaborator in spec.md §1, so this is the concrete
//! implementation behind a small trait the gate depends on).
//!
//! Grounded on `oj-storage`'s file-per-record persistence convention:
//! one small file per verified path, holding its expected digest tagged
//! with the algorithm that produced it (`sha256:<hex>`), under a root
//! directory supplied at construction.

use sha2::{Digest, Sha256};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use warden_core::{Error, Result};

/// Looks up the expected digest for a verified path. Implementations may
/// be backed by a filesystem directory, a database, or (in tests) an
/// in-memory map.
pub trait HashStore: Send + Sync {
    /// Returns the expected hex SHA-256 digest for `path`, or `None` if
    /// no entry exists (treated as "skipped" by the gate, not "failed").
    fn expected_digest(&self, path: &Path) -> Result<Option<String>>;
}

/// The only algorithm this store currently produces or accepts; carried
/// explicitly in the on-disk record so a future second algorithm doesn't
/// silently misread an older record.
const ALGORITHM: &str = "sha256";

/// One record file per verified path, named by a stable hash of the
/// path so arbitrarily deep/long paths don't need to be mirrored as a
/// directory tree.
pub struct FileHashStore {
    root: PathBuf,
}

impl FileHashStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes (or overwrites) the expected digest for `path`, tagged with
    /// the algorithm that produced it. Not used by the verification gate
    /// itself — this is the admin-side operation that seeds the store
    /// ahead of a run.
    pub fn record(&self, path: &Path, digest: &str) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.record_path(path), format!("{ALGORITHM}:{digest}"))?;
        Ok(())
    }

    fn record_path(&self, path: &Path) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        self.root.join(format!("{:016x}.sha256", hasher.finish()))
    }
}

impl HashStore for FileHashStore {
    fn expected_digest(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(self.record_path(path)) {
            Ok(contents) => {
                let tagged = contents.trim();
                let digest = tagged.strip_prefix(&format!("{ALGORITHM}:")).unwrap_or(tagged);
                Ok(Some(digest.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Computes the hex SHA-256 digest of a file's current contents.
pub fn compute_digest(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
