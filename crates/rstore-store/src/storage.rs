use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::attributes::{backend_for, AttributeMode, AttributeStore, DEFAULT_CONTENT_TYPE};
use crate::conditional::{evaluate, Decision, Precondition};
use crate::descriptor::{Method, StorageRequest, StorageResponse};
use crate::error::{StoreError, StoreResult};
use crate::etag::EntityTag;
use crate::listing::list;
use crate::lock::PathLocks;
use crate::path::{canonical_location, check_parent, ensure_parent, resolve, StoragePath};

/// Mode of newly written files.
const FILE_MODE: u32 = 0o644;

/// Filesystem-backed document storage rooted at one directory.
///
/// Every operation is an independent unit: resolve the path, compute the
/// current entity tag, gate on the request's preconditions, then perform
/// the side effect. Tag computation through the side effect runs under a
/// per-path lock.
///
/// Writes go to a temporary file in the target directory which is renamed
/// over the target once its content and content type are in place, so a
/// reader never observes a half-written file and every successful write
/// yields a new inode (and therefore a new tag).
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    attributes: Box<dyn AttributeStore>,
    locks: PathLocks,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, attributes: Box<dyn AttributeStore>) -> Self {
        Self { root: root.into(), attributes, locks: PathLocks::new() }
    }

    /// Open a storage root, selecting the content type backend for `mode`.
    ///
    /// `Auto` probes an existing root only; create the root first when
    /// content types should be kept from the first write on.
    pub fn open(root: impl Into<PathBuf>, mode: AttributeMode) -> Self {
        let root = root.into();
        let attributes = backend_for(mode, &root);
        Self::new(root, attributes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn attribute_mode(&self) -> AttributeMode {
        self.attributes.mode()
    }

    /// Dispatch a request to the operation its method and path select.
    pub fn handle(&self, request: &StorageRequest) -> StoreResult<StorageResponse> {
        let result = match request.method {
            Method::Get | Method::Head if request.is_directory_request() => {
                self.get_dir(&request.path, request.method)
            }
            Method::Get | Method::Head => {
                self.get_file(&request.path, request.method, &request.precondition)
            }
            Method::Put => self.put_file(
                &request.path,
                &request.precondition,
                request.content_type.as_deref(),
                &request.body,
            ),
            Method::Delete => self.delete_file(&request.path, &request.precondition),
        };
        match &result {
            Ok(response) => {
                debug!(method = %request.method, path = %request.path, status = response.status.code(), "storage operation")
            }
            Err(e @ (StoreError::Io(_) | StoreError::Internal(_))) => {
                error!(method = %request.method, path = %request.path, error = %e, "storage operation failed")
            }
            Err(e) => {
                debug!(method = %request.method, path = %request.path, error = %e, "storage operation rejected")
            }
        }
        result
    }

    /// GET/HEAD of a single file.
    ///
    /// The tag header is set whenever the file exists, short-circuited or
    /// not. HEAD never carries a body.
    pub fn get_file(
        &self,
        path: &StoragePath,
        method: Method,
        precondition: &Precondition,
    ) -> StoreResult<StorageResponse> {
        if path.is_directory() {
            return Err(StoreError::NotFound(format!("{path} is a directory")));
        }
        let _guard = self.locks.acquire(&self.lock_key(path));

        let file = resolve(&self.root, path)
            .filter(|r| r.is_file())
            .ok_or_else(|| StoreError::NotFound(format!("file not found: {path}")))?;
        let etag = EntityTag::compute(file.path()).map_err(|e| gone(e, path))?;
        let content_type = self
            .attributes
            .load_content_type(file.path())?
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let response = StorageResponse::ok().with_content_type(content_type).with_etag(etag.clone());
        if let Decision::ShortCircuit(status) = evaluate(Some(&etag), precondition, method) {
            return Ok(response.with_status(status));
        }
        if method == Method::Head {
            return Ok(response);
        }
        let body = fs::read(file.path()).map_err(|e| gone(e.into(), path))?;
        Ok(response.with_body(body))
    }

    /// GET/HEAD of a directory: the listing of its immediate children.
    ///
    /// A directory that does not exist lists as `{}`.
    pub fn get_dir(&self, path: &StoragePath, method: Method) -> StoreResult<StorageResponse> {
        let listing = list(&self.root, path)?;
        let response = StorageResponse::ok().with_content_type(DEFAULT_CONTENT_TYPE);
        if method == Method::Head {
            return Ok(response);
        }
        Ok(response.with_body(listing.to_json()?))
    }

    /// PUT: replace the file's content and content type, creating missing
    /// parent directories.
    pub fn put_file(
        &self,
        path: &StoragePath,
        precondition: &Precondition,
        content_type: Option<&str>,
        body: &[u8],
    ) -> StoreResult<StorageResponse> {
        let Some(name) = path.file_name() else {
            return Err(StoreError::InvalidRequest("cannot store a directory".into()));
        };
        let _guard = self.locks.acquire(&self.lock_key(path));

        let current = match resolve(&self.root, path) {
            Some(existing) if existing.is_file() => {
                Some(EntityTag::compute(existing.path()).map_err(|e| gone(e, path))?)
            }
            Some(_) => return Err(StoreError::InvalidRequest(format!("{path} is not a file"))),
            None => None,
        };
        check_parent(&self.root, path)?;
        if let Decision::ShortCircuit(status) = evaluate(current.as_ref(), precondition, Method::Put) {
            let response = StorageResponse::ok().with_status(status);
            return Ok(match current {
                Some(etag) => response.with_etag(etag),
                None => response,
            });
        }

        let parent = ensure_parent(&self.root, path)?;
        let file = parent.join(name);
        let content_type = content_type.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_CONTENT_TYPE);
        let mut staged = tempfile::Builder::new()
            .prefix(".rstore-")
            .suffix(".tmp")
            .permissions(Permissions::from_mode(FILE_MODE))
            .tempfile_in(&parent)?;
        staged.write_all(body)?;
        staged.as_file().sync_all()?;
        self.attributes.store_content_type(staged.path(), content_type)?;
        staged.persist(&file).map_err(|e| StoreError::Io(e.error))?;

        let etag = EntityTag::compute(&file)?;
        debug!(%path, %etag, bytes = body.len(), content_type, "stored file");
        Ok(StorageResponse::ok().with_etag(etag))
    }

    /// DELETE of a single file. Directories are never removed.
    pub fn delete_file(
        &self,
        path: &StoragePath,
        precondition: &Precondition,
    ) -> StoreResult<StorageResponse> {
        if path.is_directory() {
            return Err(StoreError::InvalidRequest("directories cannot be deleted".into()));
        }
        let _guard = self.locks.acquire(&self.lock_key(path));

        let file = resolve(&self.root, path)
            .filter(|r| r.is_file())
            .ok_or_else(|| StoreError::NotFound(format!("file not found: {path}")))?;
        let etag = EntityTag::compute(file.path()).map_err(|e| gone(e, path))?;
        if let Decision::ShortCircuit(status) = evaluate(Some(&etag), precondition, Method::Delete) {
            return Ok(StorageResponse::ok().with_status(status).with_etag(etag));
        }

        fs::remove_file(file.path()).map_err(|e| gone(e.into(), path))?;
        debug!(%path, "deleted file");
        Ok(StorageResponse::ok())
    }

    fn lock_key(&self, path: &StoragePath) -> PathBuf {
        canonical_location(&self.root, path)
    }
}

/// A file that disappeared between resolution and use is "not found"; any
/// other I/O failure stays internal.
fn gone(e: StoreError, path: &StoragePath) -> StoreError {
    match e {
        StoreError::Io(err) if err.kind() == io::ErrorKind::NotFound => {
            StoreError::NotFound(format!("file not found: {path}"))
        }
        other => other,
    }
}
