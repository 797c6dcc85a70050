use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::conditional::Precondition;
use crate::error::StoreError;
use crate::etag::EntityTag;
use crate::path::StoragePath;

/// Request methods the storage engine understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// GET and HEAD: never mutate, and answer a matching `If-None-Match`
    /// with 304 rather than 412.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(StoreError::InvalidRequest(format!("unsupported method: {other}"))),
        }
    }
}

/// Successful outcomes of a storage operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotModified,
    PreconditionFailed,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotModified => 304,
            Self::PreconditionFailed => 412,
        }
    }
}

/// A storage request as handed over by the transport boundary.
#[derive(Clone, Debug)]
pub struct StorageRequest {
    pub method: Method,
    pub path: StoragePath,
    pub precondition: Precondition,
    /// Declared `Content-Type` of the body, PUT only.
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl StorageRequest {
    pub fn new(method: Method, path: StoragePath) -> Self {
        Self {
            method,
            path,
            precondition: Precondition::default(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn with_body(mut self, content_type: Option<String>, body: impl Into<Bytes>) -> Self {
        self.content_type = content_type;
        self.body = body.into();
        self
    }

    /// Whether the path names a collection (trailing separator).
    pub fn is_directory_request(&self) -> bool {
        self.path.is_directory()
    }
}

/// Outcome of a storage operation: status, the headers the engine is
/// responsible for, and an optional body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageResponse {
    pub status: Status,
    pub content_type: Option<String>,
    pub etag: Option<EntityTag>,
    pub body: Option<Vec<u8>>,
}

impl StorageResponse {
    pub fn ok() -> Self {
        Self { status: Status::Ok, content_type: None, etag: None, body: None }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_etag(mut self, etag: EntityTag) -> Self {
        self.etag = Some(etag);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_roundtrip_and_safety() {
        for m in [Method::Get, Method::Head, Method::Put, Method::Delete] {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
        }
        assert!(Method::Get.is_read_only());
        assert!(Method::Head.is_read_only());
        assert!(!Method::Put.is_read_only());
        assert!(!Method::Delete.is_read_only());
    }

    #[test]
    fn unsupported_method() {
        let err = "POST".parse::<Method>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
        assert!("get".parse::<Method>().is_err());
    }

    #[test]
    fn status_codes() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::NotModified.code(), 304);
        assert_eq!(Status::PreconditionFailed.code(), 412);
    }

    #[test]
    fn request_builder() {
        let req = StorageRequest::new(Method::Put, StoragePath::parse("/a/b").unwrap())
            .with_body(Some("text/plain".into()), b"hi".to_vec());
        assert!(!req.is_directory_request());
        assert_eq!(req.content_type.as_deref(), Some("text/plain"));
        assert_eq!(&req.body[..], b"hi");
        assert_eq!(req.precondition, Precondition::default());
    }
}
