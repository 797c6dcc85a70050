use std::fmt;
use std::fs::{self, Metadata};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::StoreResult;

/// Width the decimal modification time is padded to before hex conversion.
const MTIME_DIGITS: u32 = 16;

/// Opaque version identifier of a stored file.
///
/// Derived from the file's inode number, byte size and modification time:
///
/// ```text
/// "<ino-hex>-<size-hex>-<mtime-hex>"
/// ```
///
/// The surrounding double quotes are part of the tag, so it can be placed in
/// an `ETag` header and compared verbatim against `If-Match` values. The
/// mtime component is the decimal seconds value right-padded with zeros to
/// sixteen digits and then printed in hex. Two files sharing inode, size and
/// mtime are indistinguishable; the tag is not a content hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityTag(String);

impl EntityTag {
    /// Stat `file` and derive its tag. Fails if the file does not exist.
    pub fn compute(file: &Path) -> StoreResult<Self> {
        let metadata = fs::metadata(file)?;
        Ok(Self::from_metadata(&metadata))
    }

    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self::from_parts(metadata.ino(), metadata.size(), metadata.mtime())
    }

    pub fn from_parts(ino: u64, size: u64, mtime: i64) -> Self {
        Self(format!("\"{ino:x}-{size:x}-{:x}\"", padded_mtime(mtime)))
    }

    /// Wrap a tag string received from a client.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn padded_mtime(mtime: i64) -> u128 {
    // Pre-epoch timestamps have no meaningful padded form.
    let value = u128::from(u64::try_from(mtime).unwrap_or(0));
    let digits = value.checked_ilog10().map_or(1, |d| d + 1);
    if digits < MTIME_DIGITS {
        value * 10u128.pow(MTIME_DIGITS - digits)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches_known_value() {
        let tag = EntityTag::from_parts(0x1f, 11, 1_350_000_000);
        assert_eq!(tag.as_str(), "\"1f-b-4cbd15e726000\"");
    }

    #[test]
    fn mtime_is_right_padded() {
        assert_eq!(padded_mtime(1_700_000_000), 1_700_000_000_000_000);
        assert_eq!(padded_mtime(5), 5_000_000_000_000_000);
        assert_eq!(padded_mtime(0), 0);
        assert_eq!(padded_mtime(-10), 0);
        assert_eq!(padded_mtime(12_345_678_901_234_567), 12_345_678_901_234_567);
    }

    #[test]
    fn every_component_changes_the_tag() {
        let base = EntityTag::from_parts(1, 2, 1_700_000_000);
        assert_ne!(base, EntityTag::from_parts(9, 2, 1_700_000_000));
        assert_ne!(base, EntityTag::from_parts(1, 3, 1_700_000_000));
        assert_ne!(base, EntityTag::from_parts(1, 2, 1_700_000_001));
    }

    #[test]
    fn compute_reads_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"Hello World").unwrap();

        let md = fs::metadata(&file).unwrap();
        let tag = EntityTag::compute(&file).unwrap();
        assert_eq!(tag, EntityTag::from_parts(md.ino(), 11, md.mtime()));
        assert!(tag.as_str().starts_with('"') && tag.as_str().ends_with('"'));
        // Stable across repeated computation.
        assert_eq!(tag, EntityTag::compute(&file).unwrap());
    }

    #[test]
    fn compute_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EntityTag::compute(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn display_is_raw_string() {
        let tag = EntityTag::from_raw("\"abc\"");
        assert_eq!(tag.to_string(), "\"abc\"");
    }
}
