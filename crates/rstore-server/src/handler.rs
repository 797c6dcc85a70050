use std::borrow::Cow;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method as HttpMethod, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use rstore_store::{
    Method, Precondition, Status, StorageRequest, StorageResponse, DEFAULT_CONTENT_TYPE,
};
use tracing::{error, warn};

use crate::auth::bearer_token;
use crate::error::{ServerError, ServerResult};
use crate::request::{required_permission, RequestPath};
use crate::state::AppState;

pub const STORAGE_VERSION_HEADER: HeaderName = HeaderName::from_static("x-remotestorage-version");

const ALLOWED_HEADERS: &str = "Content-Type, Authorization, Origin, If-None-Match, If-Match";
const ALLOWED_METHODS: &str = "GET, PUT, DELETE, HEAD";

/// Handler for `/`.
pub async fn root_handler(
    State(state): State<AppState>,
    method: HttpMethod,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, method, "/", &headers, body).await
}

/// Handler for every path below `/`.
pub async fn storage_handler(
    State(state): State<AppState>,
    method: HttpMethod,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, method, &format!("/{path}"), &headers, body).await
}

async fn dispatch(
    state: &AppState,
    method: HttpMethod,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let mut response = match handle(state, &method, path, headers, body).await {
        Ok(response) => response,
        Err(e) => {
            if e.status().is_server_error() {
                error!(%method, path, error = %e, "request failed");
            } else {
                warn!(%method, path, error = %e, "request rejected");
            }
            e.into_response()
        }
    };

    let h = response.headers_mut();
    h.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    if let Ok(version) = HeaderValue::from_str(&state.storage_version) {
        h.insert(STORAGE_VERSION_HEADER, version);
    }
    if !h.contains_key(CONTENT_TYPE) {
        h.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }
    response
}

async fn handle(
    state: &AppState,
    method: &HttpMethod,
    raw_path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    if *method == HttpMethod::OPTIONS {
        return Ok(preflight());
    }
    let path = RequestPath::parse(raw_path)?;
    let method: Method = method.as_str().parse()?;

    match headers.get(AUTHORIZATION) {
        None if path.is_public() => {
            if path.is_directory() {
                return Err(ServerError::InvalidRequest(
                    "not allowed to list contents of public folder".into(),
                ));
            }
            if !method.is_read_only() {
                return Err(ServerError::InvalidRequest("only GET and HEAD allowed".into()));
            }
        }
        None => return Err(ServerError::NotAuthorized),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| ServerError::InvalidToken("malformed authorization header".into()))?;
            let token = state.verifier.verify(bearer_token(value)?).await?;
            if path.resource_owner() != Some(token.resource_owner_id.as_str()) {
                return Err(ServerError::AccessDenied("storage path belongs to other user".into()));
            }
            token.require(path.category(), required_permission(method))?;
        }
    }

    let if_match = tag_header(headers, &IF_MATCH);
    let if_none_match = tag_header(headers, &IF_NONE_MATCH);
    let precondition = Precondition::from_headers(if_match.as_deref(), if_none_match.as_deref());
    let content_type = match headers.get(CONTENT_TYPE) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ServerError::InvalidRequest("malformed content type".into()))?
                .to_string(),
        ),
        None => None,
    };
    let request = StorageRequest::new(method, path.into_storage_path())
        .with_precondition(precondition)
        .with_body(content_type, body);

    let storage = state.storage.clone();
    let response = tokio::task::spawn_blocking(move || storage.handle(&request))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(into_http(response))
}

/// A conditional header as text. Bytes outside visible ASCII are replaced,
/// so such a value never equals a computed tag but still takes part in the
/// precondition.
fn tag_header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<Cow<'a, str>> {
    headers.get(name).map(|v| String::from_utf8_lossy(v.as_bytes()))
}

fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    let h = response.headers_mut();
    h.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    h.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

fn into_http(response: StorageResponse) -> Response {
    let status = match response.status {
        Status::Ok => StatusCode::OK,
        Status::NotModified => StatusCode::NOT_MODIFIED,
        Status::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
    };
    let body = match response.body {
        Some(bytes) if status == StatusCode::OK => Body::from(bytes),
        _ => Body::empty(),
    };
    let mut http = (status, body).into_response();
    let h = http.headers_mut();
    if let Some(value) = response.content_type.and_then(|t| HeaderValue::from_str(&t).ok()) {
        h.insert(CONTENT_TYPE, value);
    }
    if let Some(value) = response.etag.and_then(|t| HeaderValue::from_str(t.as_str()).ok()) {
        h.insert(ETAG, value);
    }
    http
}
