//! HTTP server for rstore.
//!
//! Serves per-user document storage over HTTP: `GET`/`HEAD` read files and
//! list directories, `PUT` stores files, `DELETE` removes them. Requests
//! carry a bearer token whose owner must match the first path segment and
//! whose scope must cover the path's category. Items below
//! `/<owner>/public/` can be read without a token.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod request;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Permission, Scope, StaticTokens, TokenInfo, TokenVerifier};
pub use config::{ServerConfig, TokenGrant};
pub use error::{ServerError, ServerResult};
pub use request::RequestPath;
pub use server::RstoreServer;
pub use state::AppState;
