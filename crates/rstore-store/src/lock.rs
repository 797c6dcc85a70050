use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// In-process registry of per-path exclusive locks.
///
/// Held from the moment a storage operation computes the current entity tag
/// until its side effect (read, write or delete) has completed, so two
/// operations on the same path inside one process cannot interleave between
/// precondition check and use. Other processes are not excluded.
#[derive(Debug, Default)]
pub struct PathLocks {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `path` is free, then hold it until the guard is dropped.
    pub fn acquire(&self, path: &Path) -> PathGuard<'_> {
        let mut held = self.held();
        while held.contains(path) {
            trace!(path = %path.display(), "waiting for path lock");
            held = self.released.wait(held).unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(path.to_path_buf());
        PathGuard { locks: self, path: path.to_path_buf() }
    }

    /// Number of paths currently locked.
    pub fn held_count(&self) -> usize {
        self.held().len()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // The set stays consistent even if a holder panicked.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its path on drop, on every exit path.
#[derive(Debug)]
pub struct PathGuard<'a> {
    locks: &'a PathLocks,
    path: PathBuf,
}

impl PathGuard<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.locks.held().remove(&self.path);
        self.locks.released.notify_all();
    }
}
