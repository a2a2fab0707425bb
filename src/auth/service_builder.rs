use std::sync::Arc;

use crate::auth::authenticator::Authenticator;
use crate::auth::codec::TokenCodec;
use crate::auth::config::AuthConfig;
use crate::auth::driver::{CredentialDriver, DriverRegistry};
use crate::auth::error::AuthError;
use crate::auth::service::AuthService;
use crate::auth::signing::SigningKey;
use crate::auth::time_utils::{self, TimeProviderFn};
use crate::auth::verifier::Verifier;

#[cfg(feature = "metrics")]
use crate::auth::metrics::{MetricsCollector, NoOpMetricsCollector};

/// A builder for creating an [`AuthService`].
///
/// Configuration problems (unknown driver, unsupported signing method, empty
/// shared secret) are all reported by [`build_and_init`](Self::build_and_init),
/// so a misconfigured process fails at startup rather than on its first
/// request.
///
/// # Example
///
/// ```rust
/// use token_auth::{AuthConfig, AuthService};
///
/// # async fn example() -> Result<(), token_auth::AuthError> {
/// let config = AuthConfig {
///     dsn: "alice=s3cret".to_string(),
///     shared_secret: "a-long-shared-secret-for-signing".to_string(),
///     ..AuthConfig::default()
/// };
///
/// let service = AuthService::builder(config).build_and_init().await?;
/// let token = service.authenticate("alice", "s3cret").await?;
/// assert_eq!(service.verify(&token).await?, "alice");
/// # Ok(())
/// # }
/// ```
#[must_use = "The builder does nothing unless `.build_and_init()` is called."]
pub struct AuthServiceBuilder {
    config: AuthConfig,
    registry: Option<DriverRegistry>,
    driver: Option<Arc<dyn CredentialDriver>>,
    time_provider: Option<TimeProviderFn>,
    #[cfg(feature = "metrics")]
    metrics_collector: Option<Arc<dyn MetricsCollector>>,
}

impl AuthServiceBuilder {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            registry: None,
            driver: None,
            time_provider: None,
            #[cfg(feature = "metrics")]
            metrics_collector: None,
        }
    }

    /// Resolve `config.driver` against `registry` instead of the built-in drivers.
    pub fn with_registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use `driver` directly; `config.driver` and `config.dsn` are ignored.
    pub fn with_driver(mut self, driver: Arc<dyn CredentialDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Sets the clock used for issuing and expiring tokens.
    ///
    /// Mostly useful in tests.
    pub fn with_time_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Result<u64, AuthError> + Send + Sync + 'static,
    {
        self.time_provider = Some(Arc::new(provider));
        self
    }

    /// Sets a metrics collector for the service.
    ///
    /// When not set, a no-op collector is used.
    #[cfg(feature = "metrics")]
    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics_collector = Some(collector);
        self
    }

    /// Builds the service and initializes the credential driver.
    ///
    /// # Errors
    ///
    /// * [`AuthError::Configuration`] - invalid settings, unknown driver,
    ///   unsupported signing method, or empty shared secret
    /// * [`AuthError::BackendUnavailable`] - the driver failed to initialize
    pub async fn build_and_init(self) -> Result<AuthService, AuthError> {
        let config = self.config;
        config.check()?;
        for warning in config.validate() {
            tracing::warn!("{}", warning);
        }

        let key = SigningKey::from_config(&config.sign_method, &config.shared_secret)?;
        let codec = Arc::new(TokenCodec::new(key));

        let driver = match self.driver {
            Some(driver) => driver,
            None => self
                .registry
                .unwrap_or_else(DriverRegistry::with_defaults)
                .create(&config.driver, &config.dsn)?,
        };
        driver.init().await?;

        let time_provider = self
            .time_provider
            .unwrap_or_else(time_utils::system_time_provider);

        let authenticator =
            Authenticator::new(Arc::clone(&driver), Arc::clone(&codec), config.token_lifetime)
                .with_driver_timeout(config.driver_timeout)
                .with_time_provider(Arc::clone(&time_provider));
        let verifier = Verifier::new(codec).with_time_provider(time_provider);

        #[cfg(feature = "metrics")]
        let (authenticator, verifier, metrics_collector) = {
            let collector = self
                .metrics_collector
                .unwrap_or_else(|| Arc::new(NoOpMetricsCollector::new()));
            (
                authenticator.with_metrics_collector(Arc::clone(&collector)),
                verifier.with_metrics_collector(Arc::clone(&collector)),
                collector,
            )
        };

        tracing::info!(driver = driver.name(), "{}", config.summary());

        Ok(AuthService {
            config,
            authenticator,
            verifier,
            #[cfg(feature = "metrics")]
            metrics_collector,
        })
    }
}
