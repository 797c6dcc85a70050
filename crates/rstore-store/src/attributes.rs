//! Per-file MIME type persistence.
//!
//! The content type a client declared on PUT is kept in a `user.mime_type`
//! extended attribute when the filesystem supports it. On filesystems
//! without extended attributes nothing is persisted and reads fall back to
//! [`DEFAULT_CONTENT_TYPE`]. Which backend is used is decided once, when the
//! storage is opened.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreResult;

/// Extended attribute holding a file's content type.
pub const MIME_ATTRIBUTE: &str = "user.mime_type";

/// Content type assumed when none was stored.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Storage capability for per-file content types.
pub trait AttributeStore: Send + Sync + fmt::Debug {
    /// Which variant this is.
    fn mode(&self) -> AttributeMode;

    /// The stored content type, `None` if nothing is stored.
    fn load_content_type(&self, file: &Path) -> StoreResult<Option<String>>;

    fn store_content_type(&self, file: &Path, content_type: &str) -> StoreResult<()>;
}

/// Configured attribute backend selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeMode {
    /// Probe the storage root once and pick.
    #[default]
    Auto,
    Xattr,
    Plain,
}

impl fmt::Display for AttributeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Xattr => write!(f, "xattr"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

/// Extended-attribute backed content types.
#[derive(Clone, Copy, Debug, Default)]
pub struct XattrAttributes;

impl AttributeStore for XattrAttributes {
    fn mode(&self) -> AttributeMode {
        AttributeMode::Xattr
    }

    fn load_content_type(&self, file: &Path) -> StoreResult<Option<String>> {
        match xattr::get(file, MIME_ATTRIBUTE) {
            Ok(value) => Ok(value.and_then(|v| String::from_utf8(v).ok())),
            Err(e) => {
                // Unreadable counts as nothing stored.
                debug!(file = %file.display(), error = %e, "unable to read mime type attribute");
                Ok(None)
            }
        }
    }

    fn store_content_type(&self, file: &Path, content_type: &str) -> StoreResult<()> {
        xattr::set(file, MIME_ATTRIBUTE, content_type.as_bytes())?;
        Ok(())
    }
}

/// No persistence; every file reads back as [`DEFAULT_CONTENT_TYPE`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainAttributes;

impl AttributeStore for PlainAttributes {
    fn mode(&self) -> AttributeMode {
        AttributeMode::Plain
    }

    fn load_content_type(&self, _file: &Path) -> StoreResult<Option<String>> {
        Ok(None)
    }

    fn store_content_type(&self, _file: &Path, _content_type: &str) -> StoreResult<()> {
        Ok(())
    }
}

/// Whether extended attributes can be written below `root`.
///
/// Writes a throwaway probe file into `root`. A root that does not exist yet
/// is not created and reports no support.
pub fn supports_xattr(root: &Path) -> bool {
    if !xattr::SUPPORTED_PLATFORM || !root.is_dir() {
        return false;
    }
    let Ok(probe) = tempfile::Builder::new().prefix(".rstore-probe-").tempfile_in(root) else {
        return false;
    };
    xattr::set(probe.path(), MIME_ATTRIBUTE, DEFAULT_CONTENT_TYPE.as_bytes()).is_ok()
}

/// Build the backend for `mode`, probing `root` when `mode` is `Auto`.
pub fn backend_for(mode: AttributeMode, root: &Path) -> Box<dyn AttributeStore> {
    let mode = match mode {
        AttributeMode::Auto if supports_xattr(root) => AttributeMode::Xattr,
        AttributeMode::Auto => AttributeMode::Plain,
        explicit => explicit,
    };
    info!(%mode, root = %root.display(), "content type attribute backend selected");
    match mode {
        AttributeMode::Xattr => Box::new(XattrAttributes),
        _ => Box::new(PlainAttributes),
    }
}
