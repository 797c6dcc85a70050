use std::fmt;

/// Coarse classification of a storage failure, used by the HTTP boundary to
/// pick a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Internal => write!(f, "internal_server_error"),
        }
    }
}

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file does not exist, or a directory sits where a file was expected.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request targets a directory where a file is required, or the
    /// parent of a file to be written is not a directory.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure that is not the client's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
