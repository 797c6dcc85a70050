//! Logical storage paths and their resolution against a storage root.
//!
//! A [`StoragePath`] is the slash-separated path a client addresses, e.g.
//! `/alice/contacts/work/bob`. A path whose last segment is empty
//! (`/alice/contacts/`) is a *directory-request*; that classification is
//! purely syntactic and made before the filesystem is consulted.
//!
//! Resolution canonicalizes `root + path` (following symlinks) and refuses
//! anything that lands outside the canonical root. An escape is reported the
//! same way as a missing entry: the caller simply sees "not found".

use std::fmt;
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Mode used for directories created implicitly by a write.
pub const DIRECTORY_MODE: u32 = 0o775;

/// A slash-separated path relative to a storage root.
///
/// Empty and `.` segments are dropped while parsing; `..` segments are
/// rejected outright so a parsed path can never climb above its root
/// lexically. Symlink escapes are caught later by [`resolve`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoragePath {
    segments: Vec<String>,
    directory: bool,
}

impl StoragePath {
    /// Parse a raw request path.
    ///
    /// ```
    /// use rstore_store::StoragePath;
    ///
    /// let p = StoragePath::parse("/alice/contacts/").unwrap();
    /// assert!(p.is_directory());
    /// assert_eq!(p.segments(), ["alice", "contacts"]);
    ///
    /// assert!(StoragePath::parse("/alice/../bob/x").is_err());
    /// ```
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let directory = raw.is_empty() || raw.ends_with('/');
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(StoreError::NotFound(format!(
                        "path escapes the storage root: {raw}"
                    )))
                }
                s if s.contains('\0') => {
                    return Err(StoreError::InvalidRequest("path contains a NUL byte".into()))
                }
                s => segments.push(s.to_string()),
            }
        }
        // "/foo/." names the directory foo, not a file.
        let directory = directory || segments.is_empty() || raw.ends_with("/.");
        Ok(Self { segments, directory })
    }

    /// The storage root itself.
    pub fn root() -> Self {
        Self { segments: Vec::new(), directory: true }
    }

    /// Whether this path denotes a collection rather than a single file.
    pub fn is_directory(&self) -> bool {
        self.directory
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Name of the addressed file, `None` for directory-requests.
    pub fn file_name(&self) -> Option<&str> {
        if self.directory {
            None
        } else {
            self.segments.last().map(String::as_str)
        }
    }

    /// The directory containing this path.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        if !self.directory || !segments.is_empty() {
            segments.pop();
        }
        Self { segments, directory: true }
    }

    /// Lexically join this path onto `root` without touching the filesystem.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.segments);
        path
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))?;
        if self.directory && !self.segments.is_empty() {
            write!(f, "/")?;
        }
        Ok(())
    }
}

/// What a resolved path points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Sockets, FIFOs, devices.
    Other,
}

/// A path that exists and lies within the storage root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    kind: EntryKind,
}

impl ResolvedPath {
    /// Canonical absolute filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Resolve `path` against `root`.
///
/// Returns `None` when the entry (or any ancestor, or the root itself) does
/// not exist, or when the canonical path lies outside the canonical root.
pub fn resolve(root: &Path, path: &StoragePath) -> Option<ResolvedPath> {
    let canonical_root = fs::canonicalize(root).ok()?;
    let canonical = fs::canonicalize(path.to_fs_path(root)).ok()?;
    if !canonical.starts_with(&canonical_root) {
        warn!(%path, resolved = %canonical.display(), "path resolves outside the storage root");
        return None;
    }
    let metadata = fs::metadata(&canonical).ok()?;
    let kind = if metadata.is_file() {
        EntryKind::File
    } else if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::Other
    };
    Some(ResolvedPath { path: canonical, kind })
}

/// Check the parent directory of `path` without creating anything.
///
/// Looks at the deepest ancestor of the parent that exists. Fails with
/// [`StoreError::InvalidRequest`] when it is not a directory and with
/// [`StoreError::NotFound`] when it lies outside the root. Returns whether
/// directories are still missing below it.
pub fn check_parent(root: &Path, path: &StoragePath) -> StoreResult<bool> {
    let parent = path.parent().to_fs_path(root);
    let Some(existing) = parent
        .ancestors()
        .take_while(|a| a.starts_with(root))
        .find(|a| a.symlink_metadata().is_ok())
    else {
        // Not even the root exists yet.
        return Ok(true);
    };
    let missing = existing != parent.as_path();
    let canonical_root = fs::canonicalize(root)?;
    let existing = fs::canonicalize(existing).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(format!("file not found: {path}")),
        _ => StoreError::Io(e),
    })?;
    if !existing.starts_with(&canonical_root) {
        warn!(%path, "parent directory resolves outside the storage root");
        return Err(StoreError::NotFound(format!("file not found: {path}")));
    }
    if !existing.is_dir() {
        return Err(StoreError::InvalidRequest(
            "parent of file already exists and is not a directory".into(),
        ));
    }
    Ok(missing)
}

/// Make sure the parent directory of `path` exists, creating it and any
/// missing ancestors, and return its canonical location.
///
/// A concurrent creation of the same directories is not an error. Fails the
/// same way as [`check_parent`], which runs before anything below the
/// deepest existing ancestor is created.
pub fn ensure_parent(root: &Path, path: &StoragePath) -> StoreResult<PathBuf> {
    create_dirs(root)?;
    let canonical_root = fs::canonicalize(root)?;
    let parent = path.parent().to_fs_path(root);
    if check_parent(root, path)? {
        debug!(dir = %parent.display(), "creating missing parent directories");
        create_dirs(&parent)?;
    }

    let canonical = fs::canonicalize(&parent)
        .map_err(|_| StoreError::InvalidRequest("unable to create directory".into()))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(StoreError::NotFound(format!("file not found: {path}")));
    }
    if !canonical.is_dir() {
        return Err(StoreError::InvalidRequest(
            "parent of file already exists and is not a directory".into(),
        ));
    }
    Ok(canonical)
}

/// Where `path` lives once symlinks in its parent are followed: the
/// canonical form of the parent's deepest existing ancestor, the remaining
/// lexical components, then the file name. Two request paths naming the
/// same file through different directory links map to the same location.
pub fn canonical_location(root: &Path, path: &StoragePath) -> PathBuf {
    let parent = path.parent().to_fs_path(root);
    let mut location = parent
        .ancestors()
        .find_map(|ancestor| {
            let canonical = fs::canonicalize(ancestor).ok()?;
            let rest = parent.strip_prefix(ancestor).ok()?;
            Some(if rest.as_os_str().is_empty() { canonical } else { canonical.join(rest) })
        })
        .unwrap_or_else(|| parent.clone());
    if let Some(name) = path.file_name() {
        location.push(name);
    }
    location
}

fn create_dirs(dir: &Path) -> StoreResult<()> {
    match DirBuilder::new().recursive(true).mode(DIRECTORY_MODE).create(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::InvalidRequest(
            "parent of file already exists and is not a directory".into(),
        )),
        Err(e) => Err(e.into()),
    }
}
