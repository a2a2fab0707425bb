//! # Token Auth
//!
//! A Rust library that exchanges credentials for signed, time-limited tokens
//! and verifies those tokens on later requests.
//!
//! A client presents an identifier and secret once. The service checks them
//! against a pluggable credential store and returns a compact signed token
//! (JWS compact form, HMAC-SHA-2) carrying the identifier and an expiry.
//! Later requests present only the token, which is verified without touching
//! the store.
//!
//! ## Features
//!
//! - **Pluggable credential drivers**: in-memory, SQLite (`sqlite-driver`) and
//!   Redis (`redis-driver`) behind one async trait, selected by name at startup
//! - **HMAC signing**: HS256, HS384 and HS512 with constant-time verification
//! - **Algorithm pinning**: tokens naming any other algorithm are rejected
//! - **Uniform rejection**: unknown identifiers and wrong secrets look the same
//! - **Unique token ids**: every token carries a random `jti` (`token-ids`)
//! - **Metrics**: optional counters and timings (`metrics`)
//!
//! ## Quick Start
//!
//! ```rust
//! use token_auth::{AuthConfig, AuthError, AuthService};
//!
//! # async fn example() -> Result<(), AuthError> {
//! let config = AuthConfig {
//!     driver: "memory".to_string(),
//!     dsn: "alice=s3cret".to_string(),
//!     sign_method: "HS256".to_string(),
//!     shared_secret: "a-long-shared-secret-for-signing".to_string(),
//!     ..AuthConfig::default()
//! };
//! let service = AuthService::builder(config).build_and_init().await?;
//!
//! // Client side: exchange credentials for a token
//! let token = service.authenticate("alice", "s3cret").await?;
//!
//! // Server side: verify the token on a later request
//! let subject = service.verify(&token).await?;
//! assert_eq!(subject, "alice");
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`AuthConfig`] is a plain value handed to the builder. For process
//! bootstrap, [`AuthConfig::from_env`] reads `TOKEN_AUTH_DBDRIVER`,
//! `TOKEN_AUTH_DBDSN`, `TOKEN_AUTH_SIGNMETHOD`, `TOKEN_AUTH_SHAREDSECRET`,
//! `TOKEN_AUTH_TOKEN_LIFETIME` and `TOKEN_AUTH_DRIVER_TIMEOUT`.
//!
//! ## Logging
//!
//! The library emits [`tracing`](https://docs.rs/tracing) events and spans
//! but never installs a subscriber; the embedding application decides where
//! they go. Secrets and tokens are never recorded.
//!
//! ## Architecture
//!
//! - **[`AuthService`]**: facade combining issuance and verification
//! - **[`Authenticator`]**: credentials in, token out
//! - **[`Verifier`]**: token in, claims out
//! - **[`TokenCodec`]**: the wire format
//! - **[`driver::CredentialDriver`]**: the credential store seam
//! - **[`AuthError`]**: one variant per failure mode

pub mod auth;

pub use auth::{driver, signing};

#[cfg(feature = "metrics")]
pub use auth::metrics;

// Re-export commonly used types
pub use auth::{
    AuthConfig, AuthError, AuthService, AuthServiceBuilder, Authenticator, Claims, ConfigPreset,
    SigningKey, SigningMethod, TokenCodec, TokenError, Verifier,
};
