use thiserror::Error;

/// Error types that can occur while issuing or verifying tokens.
///
/// Each variant corresponds to a distinct failure mode so callers can
/// decide how to react without parsing messages.
///
/// # Error Categories
///
/// - **Client errors**: `InvalidCredentials`, `InvalidToken`, `TokenExpired`
/// - **Server errors**: `BackendUnavailable`, `TokenIssuance`, `Configuration`
///
/// # Example
///
/// ```rust
/// use token_auth::{AuthConfig, AuthError, AuthService};
/// use token_auth::driver::MemoryDriver;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), AuthError> {
/// let driver = Arc::new(MemoryDriver::new());
/// driver.insert("alice", "s3cret").await;
///
/// let config = AuthConfig {
///     shared_secret: "a-long-shared-secret-for-signing".to_string(),
///     ..AuthConfig::default()
/// };
/// let service = AuthService::builder(config)
///     .with_driver(driver)
///     .build_and_init()
///     .await?;
///
/// match service.authenticate("alice", "wrong").await {
///     Ok(token) => println!("issued {} byte token", token.len()),
///     Err(AuthError::InvalidCredentials) => println!("denied"),
///     Err(e) if e.is_retryable() => println!("try again later: {e}"),
///     Err(e) => println!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum AuthError {
    /// The credential store could not be reached or did not answer in time.
    ///
    /// This is an infrastructure failure, not an authentication decision.
    /// The same request may succeed once the backend recovers.
    #[error("Credential backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The identifier is unknown or the secret does not match.
    ///
    /// Both cases surface as this single variant so the caller cannot
    /// enumerate valid identifiers.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credentials were accepted but the token could not be signed.
    ///
    /// This points to a configuration defect on the server side.
    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    /// The token is malformed, tampered with, or signed with another method.
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// The token is authentic but its expiry time has passed.
    ///
    /// Callers should re-authenticate rather than treat this as an attack.
    #[error("Token expired")]
    TokenExpired,

    /// The service configuration is unusable.
    ///
    /// Raised while building the service. The only request-time source is a
    /// system clock reading before the Unix epoch, which verification
    /// cannot work around.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Create a backend error from any displayable storage failure.
    pub fn from_backend_error<E: std::fmt::Display>(error: E) -> Self {
        Self::BackendUnavailable(error.to_string())
    }

    /// Create a backend error from a message.
    pub fn from_backend_message<S: Into<String>>(message: S) -> Self {
        Self::BackendUnavailable(message.into())
    }

    /// Returns `true` when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }

    /// Returns a stable, machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::InvalidCredentials => "invalid_credentials",
            Self::TokenIssuance(_) => "token_issuance",
            Self::InvalidToken(_) => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::Configuration(_) => "configuration",
        }
    }
}

/// Failures of the token codec.
///
/// The codec reports *why* a token was rejected; the verifier folds all of
/// these into [`AuthError::InvalidToken`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token does not have the expected compact structure or encoding.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token header names a different signing method than configured.
    #[error("algorithm mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch {
        /// The configured method.
        expected: String,
        /// The method named in the token header.
        found: String,
    },

    /// The signature does not match the header and claims.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The claim set is structurally invalid.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// The signing primitive failed.
    #[error("signing failed: {0}")]
    Signing(String),
}
