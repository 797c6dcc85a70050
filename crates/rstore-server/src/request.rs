use rstore_store::StoragePath;

use crate::auth::Permission;
use crate::error::ServerResult;

/// Segment marking an item readable without credentials.
pub const PUBLIC_SEGMENT: &str = "public";

/// A request path split into `/<owner>/[public/]<category>/...`.
///
/// The full path (owner included) is what gets stored, so user `alice`'s
/// documents live below `<files_directory>/alice/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPath {
    storage: StoragePath,
}

impl RequestPath {
    pub fn parse(raw: &str) -> ServerResult<Self> {
        Ok(Self { storage: StoragePath::parse(raw)? })
    }

    pub fn storage_path(&self) -> &StoragePath {
        &self.storage
    }

    pub fn into_storage_path(self) -> StoragePath {
        self.storage
    }

    pub fn resource_owner(&self) -> Option<&str> {
        self.storage.segments().first().map(String::as_str)
    }

    /// `/<owner>/public/...`
    pub fn is_public(&self) -> bool {
        self.storage.segments().get(1).is_some_and(|s| s == PUBLIC_SEGMENT)
    }

    /// Top-level category the scope check applies to; empty for the
    /// owner's root.
    pub fn category(&self) -> &str {
        let index = if self.is_public() { 2 } else { 1 };
        // A category is a directory, never the file itself.
        let segments = self.storage.segments();
        let dirs = if self.storage.is_directory() { segments.len() } else { segments.len().saturating_sub(1) };
        if index < dirs {
            &segments[index]
        } else {
            ""
        }
    }

    pub fn is_directory(&self) -> bool {
        self.storage.is_directory()
    }
}

/// Permission a method needs on the request's category.
pub fn required_permission(method: rstore_store::Method) -> Permission {
    if method.is_read_only() {
        Permission::Read
    } else {
        Permission::ReadWrite
    }
}
