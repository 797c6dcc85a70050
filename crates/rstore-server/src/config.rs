use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use rstore_store::AttributeMode;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Protocol version advertised in `X-RemoteStorage-Version`.
pub const DEFAULT_STORAGE_VERSION: &str = "remoteStorage.2012.10";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of all users' storage; user `u` lives below `<files_directory>/u`.
    pub files_directory: PathBuf,
    /// How per-file content types are persisted.
    pub attributes: AttributeMode,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
    pub storage_version: String,
    /// Bearer tokens accepted by the built-in verifier.
    pub tokens: Vec<TokenGrant>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            files_directory: PathBuf::from("files"),
            attributes: AttributeMode::Auto,
            max_body_size: 16 * 1024 * 1024,
            storage_version: DEFAULT_STORAGE_VERSION.into(),
            tokens: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load a TOML configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// A bearer token, the user it was issued to, and the space separated scope
/// it grants (e.g. `"contacts:rw calendar:r"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub resource_owner_id: String,
    pub scope: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.storage_version, "remoteStorage.2012.10");
        assert_eq!(c.attributes, AttributeMode::Auto);
        assert_eq!(c.max_body_size, 16 * 1024 * 1024);
        assert!(c.tokens.is_empty());
    }

    #[test]
    fn parse_toml() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            files_directory = "/srv/rstore"
            attributes = "plain"

            [[tokens]]
            token = "abc"
            resource_owner_id = "alice"
            scope = "contacts:rw :r"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.files_directory, PathBuf::from("/srv/rstore"));
        assert_eq!(c.attributes, AttributeMode::Plain);
        assert_eq!(c.tokens.len(), 1);
        assert_eq!(c.tokens[0].resource_owner_id, "alice");
        // Unspecified keys keep their defaults.
        assert_eq!(c.storage_version, DEFAULT_STORAGE_VERSION);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ServerConfig::from_toml_str("bind_addr = 12").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
