use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::error::TokenError;

/// Claim names reserved by the token format.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "iat", "exp", "jti"];

/// The content embedded in a token.
///
/// A claim set is created fresh for each successful authentication and is
/// never mutated after it has been signed. Timestamps are Unix seconds.
///
/// Custom fields live in `extra` and are flattened into the serialized
/// object next to the registered claims.
///
/// # Example
///
/// ```rust
/// use token_auth::Claims;
///
/// let claims = Claims::new("alice", 1_700_000_000, 1_700_003_600)
///     .with_claim("tenant", "acme");
///
/// assert_eq!(claims.subject(), "alice");
/// assert_eq!(claims.get("tenant").and_then(|v| v.as_str()), Some("acme"));
/// assert!(claims.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated credential identifier.
    pub sub: String,
    /// Issued-at time.
    pub iat: u64,
    /// Expiry time.
    pub exp: u64,
    /// Unique token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Custom fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Create a claim set with the registered claims only.
    pub fn new(subject: impl Into<String>, issued_at: u64, expires_at: u64) -> Self {
        Self {
            sub: subject.into(),
            iat: issued_at,
            exp: expires_at,
            jti: None,
            extra: Map::new(),
        }
    }

    /// Attach a unique token identifier.
    pub fn with_token_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Attach a custom claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn issued_at(&self) -> u64 {
        self.iat
    }

    pub fn expires_at(&self) -> u64 {
        self.exp
    }

    /// Look up a custom claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Check that the claim set can be signed.
    ///
    /// The subject must be non-empty, expiry may not precede issuance, and
    /// custom fields may not reuse a registered claim name.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.sub.is_empty() {
            return Err(TokenError::InvalidClaims("subject is empty".to_string()));
        }
        if self.exp < self.iat {
            return Err(TokenError::InvalidClaims(format!(
                "expiry {} precedes issued-at {}",
                self.exp, self.iat
            )));
        }
        if let Some(name) = self
            .extra
            .keys()
            .find(|name| RESERVED_CLAIMS.contains(&name.as_str()))
        {
            return Err(TokenError::InvalidClaims(format!(
                "custom claim '{name}' shadows a registered claim"
            )));
        }
        Ok(())
    }
}
