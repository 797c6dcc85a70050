//! Filesystem-backed document storage for rstore.
//!
//! Clients address documents by slash-separated paths below a storage root.
//! Files can be read, written and deleted; directories are listed, created
//! implicitly by writes, and never deleted explicitly.
//!
//! # Components
//!
//! - [`StoragePath`] / [`resolve`] -- logical paths and their canonical,
//!   root-confined location on disk
//! - [`EntityTag`] -- version identifier derived from inode, size and mtime
//! - [`evaluate`] -- `If-Match` / `If-None-Match` gating (200, 304 or 412)
//! - [`Listing`] -- directory contents as a `name -> mtime` JSON object
//! - [`AttributeStore`] -- per-file content type persistence, either in an
//!   extended attribute ([`XattrAttributes`]) or not at all ([`PlainAttributes`])
//! - [`Storage`] -- the four operations built from the above
//!
//! # Design Rules
//!
//! 1. Directory-requests (trailing `/`) are recognised syntactically, before
//!    the filesystem is touched.
//! 2. Anything resolving outside the root is "not found".
//! 3. Precondition outcomes (304/412) are responses, not errors.
//! 4. Tag computation, precondition check and side effect for one path run
//!    under one in-process lock.
//! 5. Writes are full replacements, staged in a temporary file and renamed
//!    into place.

pub mod attributes;
pub mod conditional;
pub mod descriptor;
pub mod error;
pub mod etag;
pub mod listing;
pub mod lock;
pub mod path;
pub mod storage;

// Re-export primary types at crate root for ergonomic imports.
pub use attributes::{
    AttributeMode, AttributeStore, PlainAttributes, XattrAttributes, DEFAULT_CONTENT_TYPE,
    MIME_ATTRIBUTE,
};
pub use conditional::{evaluate, Decision, Precondition, TagMatch};
pub use descriptor::{Method, Status, StorageRequest, StorageResponse};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use etag::EntityTag;
pub use listing::Listing;
pub use lock::{PathGuard, PathLocks};
pub use path::{resolve, EntryKind, ResolvedPath, StoragePath};
pub use storage::Storage;
