use std::sync::Arc;

use rstore_store::Storage;
use tokio::net::TcpListener;

use crate::auth::{StaticTokens, TokenVerifier};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// rstore HTTP server.
pub struct RstoreServer {
    config: ServerConfig,
    verifier: Arc<dyn TokenVerifier>,
}

impl RstoreServer {
    /// Server using the token table from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let verifier = Arc::new(StaticTokens::from_grants(&config.tokens));
        Self { config, verifier }
    }

    /// Replace the authorization oracle.
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let storage = Storage::open(&self.config.files_directory, self.config.attributes);
        build_router(AppState::new(&self.config, storage, self.verifier.clone()))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        tokio::fs::create_dir_all(&self.config.files_directory).await?;
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            files = %self.config.files_directory.display(),
            "rstore server listening on {}",
            self.config.bind_addr
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
