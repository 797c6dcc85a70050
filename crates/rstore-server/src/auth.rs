use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::config::TokenGrant;
use crate::error::{ServerError, ServerResult};

/// Access level a request needs on a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Read,
    ReadWrite,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "r"),
            Self::ReadWrite => write!(f, "rw"),
        }
    }
}

/// Space separated `category:permission` grants. An empty category
/// (`:r`, `:rw`) covers every category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn parse(raw: &str) -> Self {
        Self(raw.split_whitespace().map(str::to_string).collect())
    }

    fn has(&self, grant: &str) -> bool {
        self.0.iter().any(|g| g == grant)
    }

    /// Whether this scope grants `permission` on `category`; `rw` implies `r`.
    pub fn allows(&self, category: &str, permission: Permission) -> bool {
        let rw = self.has(&format!("{category}:rw")) || self.has(":rw");
        match permission {
            Permission::ReadWrite => rw,
            Permission::Read => rw || self.has(&format!("{category}:r")) || self.has(":r"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// What the authorization oracle knows about a valid token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub resource_owner_id: String,
    pub scope: Scope,
}

impl TokenInfo {
    pub fn require(&self, category: &str, permission: Permission) -> ServerResult<()> {
        if self.scope.allows(category, permission) {
            Ok(())
        } else {
            Err(ServerError::InsufficientScope(format!(
                "require {} permissions for this operation [{category},{permission},{}]",
                match permission {
                    Permission::Read => "read",
                    Permission::ReadWrite => "write",
                },
                self.scope,
            )))
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> ServerResult<&str> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| ServerError::InvalidToken("malformed authorization header".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ServerError::InvalidToken("expected a bearer token".into()));
    }
    Ok(token.trim())
}

/// Authorization oracle: maps a bearer token to its owner and scope.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> ServerResult<TokenInfo>;
}

/// Verifier backed by a fixed token table, typically from the config file.
#[derive(Clone, Debug, Default)]
pub struct StaticTokens {
    grants: HashMap<String, TokenInfo>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grants(grants: &[TokenGrant]) -> Self {
        let mut tokens = Self::new();
        for g in grants {
            tokens.insert(&g.token, &g.resource_owner_id, &g.scope);
        }
        tokens
    }

    pub fn insert(&mut self, token: &str, resource_owner_id: &str, scope: &str) {
        self.grants.insert(
            token.to_string(),
            TokenInfo { resource_owner_id: resource_owner_id.to_string(), scope: Scope::parse(scope) },
        );
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokens {
    async fn verify(&self, token: &str) -> ServerResult<TokenInfo> {
        self.grants
            .get(token)
            .cloned()
            .ok_or_else(|| ServerError::InvalidToken("the access token is not valid".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_implied_by_read_write() {
        let scope = Scope::parse("contacts:rw calendar:r");
        assert!(scope.allows("contacts", Permission::Read));
        assert!(scope.allows("contacts", Permission::ReadWrite));
        assert!(scope.allows("calendar", Permission::Read));
        assert!(!scope.allows("calendar", Permission::ReadWrite));
        assert!(!scope.allows("music", Permission::Read));
    }

    #[test]
    fn root_scope_covers_everything() {
        let scope = Scope::parse(":r");
        assert!(scope.allows("anything", Permission::Read));
        assert!(!scope.allows("anything", Permission::ReadWrite));
        assert!(Scope::parse(":rw").allows("anything", Permission::ReadWrite));
        assert!(Scope::parse(":rw").allows("", Permission::Read));
    }

    #[test]
    fn scope_display() {
        assert_eq!(Scope::parse("  a:r   b:rw ").to_string(), "a:r b:rw");
        assert_eq!(Permission::ReadWrite.to_string(), "rw");
    }

    #[test]
    fn require_reports_insufficient_scope() {
        let info = TokenInfo { resource_owner_id: "alice".into(), scope: Scope::parse("contacts:r") };
        assert!(info.require("contacts", Permission::Read).is_ok());
        let err = info.require("contacts", Permission::ReadWrite).unwrap_err();
        assert!(matches!(err, ServerError::InsufficientScope(_)));
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(bearer_token("bearer  abc ").unwrap(), "abc");
        assert!(bearer_token("Basic abc").is_err());
        assert!(bearer_token("Bearer").is_err());
        assert!(bearer_token("").is_err());
    }

    #[tokio::test]
    async fn static_tokens() {
        let tokens = StaticTokens::from_grants(&[TokenGrant {
            token: "t1".into(),
            resource_owner_id: "alice".into(),
            scope: "contacts:rw".into(),
        }]);
        assert_eq!(tokens.len(), 1);
        let info = tokens.verify("t1").await.unwrap();
        assert_eq!(info.resource_owner_id, "alice");
        assert!(matches!(tokens.verify("nope").await, Err(ServerError::InvalidToken(_))));
    }
}
