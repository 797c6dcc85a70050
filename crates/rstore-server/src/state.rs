use std::sync::Arc;

use rstore_store::Storage;

use crate::auth::TokenVerifier;
use crate::config::ServerConfig;

/// Shared, immutable per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub storage_version: Arc<str>,
    pub max_body_size: usize,
}

impl AppState {
    pub fn new(config: &ServerConfig, storage: Storage, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            storage: Arc::new(storage),
            verifier,
            storage_version: config.storage_version.as_str().into(),
            max_body_size: config.max_body_size,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("storage", &self.storage)
            .field("storage_version", &self.storage_version)
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}
