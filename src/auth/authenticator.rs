use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "metrics")]
use std::time::Instant;

use serde_json::{Map, Value};

use crate::auth::claims::Claims;
use crate::auth::codec::TokenCodec;
use crate::auth::driver::CredentialDriver;
use crate::auth::error::AuthError;
use crate::auth::time_utils::{self, TimeProviderFn};

#[cfg(feature = "metrics")]
use crate::auth::metrics::{MetricEvent, MetricsCollector, NoOpMetricsCollector};

/// Exchanges an identifier/secret pair for a signed token.
///
/// Holds only shared, immutable state, so one instance can serve many tasks
/// concurrently. Usually obtained through
/// [`AuthService::authenticator`](crate::AuthService::authenticator).
#[derive(Clone)]
pub struct Authenticator {
    driver: Arc<dyn CredentialDriver>,
    codec: Arc<TokenCodec>,
    lifetime: Duration,
    driver_timeout: Option<Duration>,
    time_provider: TimeProviderFn,
    #[cfg(feature = "metrics")]
    metrics_collector: Arc<dyn MetricsCollector>,
}

impl Authenticator {
    /// Creates an authenticator using the system clock and no driver timeout.
    pub fn new(driver: Arc<dyn CredentialDriver>, codec: Arc<TokenCodec>, lifetime: Duration) -> Self {
        Self {
            driver,
            codec,
            lifetime,
            driver_timeout: None,
            time_provider: time_utils::system_time_provider(),
            #[cfg(feature = "metrics")]
            metrics_collector: Arc::new(NoOpMetricsCollector::new()),
        }
    }

    /// Bound every driver call by `timeout`.
    pub fn with_driver_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.driver_timeout = timeout;
        self
    }

    /// Sets a custom time provider for `iat`/`exp`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use token_auth::{Authenticator, SigningKey, TokenCodec};
    /// use token_auth::driver::MemoryDriver;
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let codec = Arc::new(TokenCodec::new(SigningKey::from_config("HS256", "key").unwrap()));
    /// let authenticator = Authenticator::new(
    ///     Arc::new(MemoryDriver::new()),
    ///     codec,
    ///     Duration::from_secs(60),
    /// )
    /// .with_time_provider(Arc::new(|| Ok(1_700_000_000)));
    /// ```
    pub fn with_time_provider(mut self, provider: TimeProviderFn) -> Self {
        self.time_provider = provider;
        self
    }

    /// Record events to `collector`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics_collector = collector;
        self
    }

    /// The lifetime given to issued tokens.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// The credential driver in use.
    pub fn driver(&self) -> &Arc<dyn CredentialDriver> {
        &self.driver
    }

    /// Verify credentials and issue a token for `identifier`.
    ///
    /// # Errors
    ///
    /// * [`AuthError::BackendUnavailable`] - the driver failed or timed out
    /// * [`AuthError::InvalidCredentials`] - unknown identifier or wrong secret
    /// * [`AuthError::TokenIssuance`] - the clock failed or the token could not be signed
    pub async fn authenticate(&self, identifier: &str, secret: &str) -> Result<String, AuthError> {
        self.authenticate_with_claims(identifier, secret, Map::new())
            .await
    }

    /// Like [`authenticate`](Self::authenticate), adding `extra` claims to the token.
    ///
    /// `extra` must not use the reserved names `sub`, `iat`, `exp` or `jti`;
    /// doing so fails with [`AuthError::TokenIssuance`].
    #[tracing::instrument(
        name = "authenticate",
        skip(self, secret, extra),
        fields(driver = self.driver.name())
    )]
    pub async fn authenticate_with_claims(
        &self,
        identifier: &str,
        secret: &str,
        extra: Map<String, Value>,
    ) -> Result<String, AuthError> {
        #[cfg(feature = "metrics")]
        let start_time = Instant::now();

        let result = self.issue(identifier, secret, extra).await;

        match &result {
            Ok(_) => tracing::debug!("token issued"),
            Err(AuthError::InvalidCredentials) => tracing::debug!("credentials rejected"),
            Err(e) => tracing::warn!(error_code = e.code(), "authentication failed: {}", e),
        }

        #[cfg(feature = "metrics")]
        {
            self.metrics_collector
                .record_event(MetricEvent::AuthenticationAttempt {
                    duration: start_time.elapsed(),
                    success: result.is_ok(),
                })
                .await;
            if let Err(e) = &result {
                self.metrics_collector
                    .record_event(MetricEvent::error(e))
                    .await;
            }
        }

        result
    }

    async fn issue(
        &self,
        identifier: &str,
        secret: &str,
        extra: Map<String, Value>,
    ) -> Result<String, AuthError> {
        if !self.check_credentials(identifier, secret).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let issued_at = (self.time_provider)()
            .map_err(|e| AuthError::TokenIssuance(format!("clock unavailable: {e}")))?;
        let expires_at = issued_at.saturating_add(self.lifetime.as_secs());

        let mut claims = Claims::new(identifier, issued_at, expires_at);
        #[cfg(feature = "token-ids")]
        {
            claims = claims.with_token_id(uuid::Uuid::new_v4().to_string());
        }
        for (name, value) in extra {
            claims = claims.with_claim(name, value);
        }

        self.codec
            .encode(&claims)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))
    }

    /// Ask the driver, bounded by the configured timeout.
    async fn check_credentials(&self, identifier: &str, secret: &str) -> Result<bool, AuthError> {
        #[cfg(feature = "metrics")]
        let start_time = Instant::now();

        let verification = self.driver.verify(identifier, secret);
        let result = match self.driver_timeout {
            Some(limit) => match tokio::time::timeout(limit, verification).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::from_backend_message(format!(
                    "{} driver did not answer within {}ms",
                    self.driver.name(),
                    limit.as_millis()
                ))),
            },
            None => verification.await,
        };

        #[cfg(feature = "metrics")]
        self.metrics_collector
            .record_event(MetricEvent::DriverOperation {
                driver: self.driver.name(),
                duration: start_time.elapsed(),
                success: result.is_ok(),
            })
            .await;

        // Drivers must only report infrastructure failures as errors.
        result.map_err(|e| match e {
            AuthError::BackendUnavailable(_) => e,
            other => AuthError::BackendUnavailable(other.to_string()),
        })
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("driver", &self.driver.name())
            .field("method", &self.codec.method())
            .field("lifetime", &self.lifetime)
            .field("driver_timeout", &self.driver_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::driver::{Credential, MemoryDriver};
    use crate::auth::signing::SigningKey;
    use async_trait::async_trait;

    const NOW: u64 = 1_700_000_000;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            SigningKey::from_config("HS256", "unit-test-signing-key").unwrap(),
        ))
    }

    fn authenticator(driver: Arc<dyn CredentialDriver>) -> Authenticator {
        Authenticator::new(driver, codec(), Duration::from_secs(3600))
            .with_time_provider(Arc::new(|| Ok(NOW)))
    }

    struct SlowDriver;

    #[async_trait]
    impl CredentialDriver for SlowDriver {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(Credential::new(identifier, "s3cret")))
        }
    }

    struct FailingDriver;

    #[async_trait]
    impl CredentialDriver for FailingDriver {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn lookup(&self, _identifier: &str) -> Result<Option<Credential>, AuthError> {
            Err(AuthError::from_backend_message("connection refused"))
        }
    }

    /// A misbehaving driver that reports a non-backend error.
    struct ConfusedDriver;

    #[async_trait]
    impl CredentialDriver for ConfusedDriver {
        fn name(&self) -> &'static str {
            "confused"
        }

        async fn lookup(&self, _identifier: &str) -> Result<Option<Credential>, AuthError> {
            Err(AuthError::Configuration("missing table".to_string()))
        }
    }

    #[tokio::test]
    async fn test_authenticate_issues_token_with_claims() -> Result<(), AuthError> {
        let driver = Arc::new(MemoryDriver::with_credentials([("alice", "s3cret")]));
        let authenticator = authenticator(driver);

        let token = authenticator.authenticate("alice", "s3cret").await?;
        let claims = codec().decode(&token)?;

        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.issued_at(), NOW);
        assert_eq!(claims.expires_at(), NOW + 3600);
        assert_eq!(claims.jti.is_some(), cfg!(feature = "token-ids"));
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_credentials() {
        let driver = Arc::new(MemoryDriver::with_credentials([("alice", "s3cret")]));
        let authenticator = authenticator(driver);

        for (identifier, secret) in [("alice", "wrong"), ("bob", "s3cret"), ("", ""), ("alice", "")]
        {
            let result = authenticator.authenticate(identifier, secret).await;
            assert!(
                matches!(result, Err(AuthError::InvalidCredentials)),
                "{identifier}/{secret} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_authenticate_with_extra_claims() -> Result<(), AuthError> {
        let driver = Arc::new(MemoryDriver::with_credentials([("alice", "s3cret")]));
        let authenticator = authenticator(driver);

        let mut extra = Map::new();
        extra.insert("role".to_string(), Value::from("admin"));
        let token = authenticator
            .authenticate_with_claims("alice", "s3cret", extra)
            .await?;

        let claims = codec().decode(&token)?;
        assert_eq!(claims.get("role"), Some(&Value::from("admin")));
        Ok(())
    }

    #[tokio::test]
    async fn test_reserved_extra_claim_fails_issuance() {
        let driver = Arc::new(MemoryDriver::with_credentials([("alice", "s3cret")]));
        let authenticator = authenticator(driver);

        let mut extra = Map::new();
        extra.insert("sub".to_string(), Value::from("root"));
        let result = authenticator
            .authenticate_with_claims("alice", "s3cret", extra)
            .await;
        assert!(matches!(result, Err(AuthError::TokenIssuance(_))));
    }

    #[tokio::test]
    async fn test_driver_failure_is_backend_unavailable() {
        let result = authenticator(Arc::new(FailingDriver))
            .authenticate("alice", "s3cret")
            .await;
        assert!(matches!(result, Err(AuthError::BackendUnavailable(_))));

        let result = authenticator(Arc::new(ConfusedDriver))
            .authenticate("alice", "s3cret")
            .await;
        assert!(matches!(result, Err(AuthError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_slow_driver_times_out() {
        let authenticator = authenticator(Arc::new(SlowDriver))
            .with_driver_timeout(Some(Duration::from_millis(100)));

        let result = authenticator.authenticate("alice", "s3cret").await;
        match result {
            Err(AuthError::BackendUnavailable(message)) => assert!(message.contains("slow")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clock_failure_is_issuance_error() {
        let driver = Arc::new(MemoryDriver::with_credentials([("alice", "s3cret")]));
        let authenticator = Authenticator::new(driver, codec(), Duration::from_secs(60))
            .with_time_provider(Arc::new(|| {
                Err(AuthError::Configuration("clock".to_string()))
            }));

        match authenticator.authenticate("alice", "s3cret").await {
            Err(AuthError::TokenIssuance(message)) => assert!(message.contains("clock")),
            other => panic!("expected issuance error, got {other:?}"),
        }

        // Rejected credentials are reported before the clock is read
        let result = authenticator.authenticate("alice", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_authentication_metrics() -> Result<(), AuthError> {
        use crate::auth::metrics::InMemoryMetricsCollector;

        let collector = Arc::new(InMemoryMetricsCollector::new());
        let driver = Arc::new(MemoryDriver::with_credentials([("alice", "s3cret")]));
        let authenticator = authenticator(driver)
            .with_metrics_collector(Arc::clone(&collector) as Arc<dyn MetricsCollector>);

        authenticator.authenticate("alice", "s3cret").await?;
        let _ = authenticator.authenticate("alice", "wrong").await;

        let metrics = collector.get_metrics().await?;
        assert_eq!(metrics.authentication_attempts, 2);
        assert_eq!(metrics.authentication_successes, 1);
        assert_eq!(metrics.driver_operations, 2);
        assert_eq!(metrics.driver_failures, 0);
        assert_eq!(metrics.error_counts.invalid_credentials, 1);
        Ok(())
    }
}
