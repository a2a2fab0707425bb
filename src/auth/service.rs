#[cfg(feature = "metrics")]
use std::sync::Arc;

use crate::auth::authenticator::Authenticator;
use crate::auth::claims::Claims;
use crate::auth::config::AuthConfig;
use crate::auth::error::AuthError;
use crate::auth::service_builder::AuthServiceBuilder;
use crate::auth::verifier::Verifier;

#[cfg(feature = "metrics")]
use crate::auth::metrics::MetricsCollector;

/// Token authentication service.
///
/// Combines an [`Authenticator`] and a [`Verifier`] that share one signing
/// key, so every token it issues is accepted by its own `verify` until the
/// token expires. The service is `Send + Sync` and cheap to clone; share it
/// across request handlers.
///
/// To create an instance, use [`AuthService::builder`].
///
/// # Example
///
/// ```rust
/// use token_auth::{AuthConfig, AuthError, AuthService};
///
/// # async fn example() -> Result<(), AuthError> {
/// let service = AuthService::builder(AuthConfig {
///     dsn: "alice=s3cret".to_string(),
///     shared_secret: "a-long-shared-secret-for-signing".to_string(),
///     ..AuthConfig::default()
/// })
/// .build_and_init()
/// .await?;
///
/// let token = service.authenticate("alice", "s3cret").await?;
/// assert_eq!(service.verify(&token).await?, "alice");
///
/// assert!(matches!(
///     service.authenticate("alice", "guess").await,
///     Err(AuthError::InvalidCredentials)
/// ));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthService {
    pub(crate) config: AuthConfig,
    pub(crate) authenticator: Authenticator,
    pub(crate) verifier: Verifier,
    #[cfg(feature = "metrics")]
    pub(crate) metrics_collector: Arc<dyn MetricsCollector>,
}

impl AuthService {
    /// Creates a new [`AuthServiceBuilder`] for `config`.
    pub fn builder(config: AuthConfig) -> AuthServiceBuilder {
        AuthServiceBuilder::new(config)
    }

    /// Exchange an identifier and secret for a signed token.
    ///
    /// # Errors
    ///
    /// * [`AuthError::InvalidCredentials`] - unknown identifier or wrong secret
    /// * [`AuthError::BackendUnavailable`] - the credential store failed or timed out
    /// * [`AuthError::TokenIssuance`] - the token could not be signed
    pub async fn authenticate(&self, identifier: &str, secret: &str) -> Result<String, AuthError> {
        self.authenticator.authenticate(identifier, secret).await
    }

    /// Verify a token and return the identifier it was issued to.
    ///
    /// # Errors
    ///
    /// * [`AuthError::InvalidToken`] - malformed, tampered, or wrong signing method
    /// * [`AuthError::TokenExpired`] - authentic but expired
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.verify_claims(token).await?;
        Ok(claims.sub)
    }

    /// Verify a token and return its full claim set.
    pub async fn verify_claims(&self, token: &str) -> Result<Claims, AuthError> {
        self.verifier.verify_recorded(token).await
    }

    /// The authenticator, e.g. for issuing tokens with custom claims.
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// The configuration the service was built from.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The metrics collector events are recorded to.
    #[cfg(feature = "metrics")]
    pub fn metrics_collector(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics_collector
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .finish()
    }
}
