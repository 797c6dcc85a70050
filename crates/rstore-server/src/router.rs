use axum::extract::DefaultBodyLimit;
use axum::{routing::any, Router};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router: every method on every path goes to the storage
/// handler.
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_size);
    Router::new()
        .route("/", any(handler::root_handler))
        .route("/*path", any(handler::storage_handler))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
