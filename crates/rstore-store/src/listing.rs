use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::path::{resolve, StoragePath};

/// Immediate children of a directory mapped to their modification time in
/// seconds since the epoch.
///
/// Subdirectory names carry a trailing `/`. Hidden entries (leading `.`) are
/// not listed. Always serializes as a JSON object, `{}` when empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing(BTreeMap<String, u64>);

impl Listing {
    /// Enumerate `dir`. A directory that vanished is an empty listing.
    pub fn read(dir: &Path) -> StoreResult<Self> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let mut listing = BTreeMap::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                debug!(dir = %dir.display(), "skipping entry with non UTF-8 name");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            // Follow symlinks; dangling ones and entries removed mid-scan are skipped.
            let metadata = match fs::metadata(entry.path()) {
                Ok(md) => md,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let mtime = u64::try_from(metadata.mtime()).unwrap_or(0);
            let key = if metadata.is_dir() { format!("{name}/") } else { name };
            listing.insert(key, mtime);
        }
        Ok(Self(listing))
    }

    pub fn entries(&self) -> &BTreeMap<String, u64> {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(&self.0).map_err(|e| StoreError::Internal(e.to_string()))
    }
}

/// List the directory `path` names under `root`.
///
/// Missing directories, unresolvable paths and paths naming a file all list
/// as empty.
pub fn list(root: &Path, path: &StoragePath) -> StoreResult<Listing> {
    match resolve(root, path) {
        Some(resolved) if resolved.is_dir() => Listing::read(resolved.path()),
        _ => Ok(Listing::default()),
    }
}
