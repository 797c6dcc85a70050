use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rstore_store::{ErrorKind, StoreError};
use serde_json::json;
use thiserror::Error;

const REALM: &str = "Resource Server";

#[derive(Debug, Error)]
pub enum ServerError {
    /// No credentials on a request that needs them.
    #[error("need authorization to access this service")]
    NotAuthorized,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("insufficient scope: {0}")]
    InsufficientScope(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAuthorized | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientScope(_) | Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for the `error` field of the response body.
    pub fn code(&self) -> String {
        match self {
            Self::NotAuthorized => "not_authorized".into(),
            Self::InvalidToken(_) => "invalid_token".into(),
            Self::InsufficientScope(_) => "insufficient_scope".into(),
            Self::AccessDenied(_) => "access_denied".into(),
            Self::InvalidRequest(_) => "invalid_request".into(),
            Self::Store(e) => e.kind().to_string(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "internal_server_error".into(),
        }
    }

    /// Human-readable text for `error_description`. Internal failures are
    /// not described to clients.
    pub fn description(&self) -> String {
        match self {
            Self::NotAuthorized => self.to_string(),
            Self::InvalidToken(d)
            | Self::InsufficientScope(d)
            | Self::AccessDenied(d)
            | Self::InvalidRequest(d) => d.clone(),
            Self::Store(StoreError::NotFound(d) | StoreError::InvalidRequest(d)) => d.clone(),
            _ => "internal server error".into(),
        }
    }

    fn challenge(&self) -> Option<String> {
        match self {
            Self::NotAuthorized => Some(format!("Bearer realm=\"{REALM}\"")),
            Self::InvalidToken(_) | Self::InsufficientScope(_) => Some(format!(
                "Bearer realm=\"{REALM}\",error=\"{}\",error_description=\"{}\"",
                self.code(),
                self.description().replace('"', "'"),
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.code(), "error_description": self.description() });
        let mut response = (self.status(), Json(body)).into_response();
        if let Some(value) = self.challenge().and_then(|c| HeaderValue::from_str(&c).ok()) {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}
