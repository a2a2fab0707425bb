use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::auth::claims::Claims;
use crate::auth::codec::TokenCodec;
use crate::auth::error::AuthError;
use crate::auth::time_utils::{self, TimeProviderFn};

#[cfg(feature = "metrics")]
use crate::auth::metrics::{MetricEvent, MetricsCollector, NoOpMetricsCollector};

/// Checks a presented token and recovers its claims.
///
/// Verification is stateless: no credential store is consulted, so a token
/// stays valid until it expires even if the account is removed meanwhile.
///
/// # Example
///
/// ```rust
/// use token_auth::{AuthError, Claims, SigningKey, TokenCodec, Verifier};
/// use std::sync::Arc;
///
/// let codec = Arc::new(TokenCodec::new(SigningKey::from_config("HS256", "key")?));
/// let verifier = Verifier::new(Arc::clone(&codec)).with_time_provider(Arc::new(|| Ok(150)));
///
/// let live = codec.encode(&Claims::new("alice", 100, 200))?;
/// assert_eq!(verifier.verify(&live)?.subject(), "alice");
///
/// let stale = codec.encode(&Claims::new("alice", 100, 120))?;
/// assert!(matches!(verifier.verify(&stale), Err(AuthError::TokenExpired)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct Verifier {
    codec: Arc<TokenCodec>,
    time_provider: TimeProviderFn,
    #[cfg(feature = "metrics")]
    metrics_collector: Arc<dyn MetricsCollector>,
}

impl Verifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            time_provider: time_utils::system_time_provider(),
            #[cfg(feature = "metrics")]
            metrics_collector: Arc::new(NoOpMetricsCollector::new()),
        }
    }

    /// Sets a custom time provider for the expiry check.
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

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    ///
    /// * [`AuthError::InvalidToken`] - malformed, tampered, or signed with another method
    /// * [`AuthError::TokenExpired`] - authentic but past its expiry
    ///
    /// A failing time provider's error is returned unchanged. The system
    /// clock reports [`AuthError::Configuration`] when it reads before the
    /// Unix epoch.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.codec.decode(token)?;

        let now = (self.time_provider)()?;
        if time_utils::is_expired(claims.expires_at(), now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// [`verify`](Self::verify) with logging and metrics.
    #[tracing::instrument(name = "verify", skip_all)]
    pub(crate) async fn verify_recorded(&self, token: &str) -> Result<Claims, AuthError> {
        #[cfg(feature = "metrics")]
        let start_time = Instant::now();

        let result = self.verify(token);

        match &result {
            Ok(claims) => tracing::debug!(subject = %claims.subject(), "token accepted"),
            Err(e) => tracing::debug!(error_code = e.code(), "token rejected: {}", e),
        }

        #[cfg(feature = "metrics")]
        {
            self.metrics_collector
                .record_event(MetricEvent::VerificationAttempt {
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
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("method", &self.codec.method())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::TokenError;
    use crate::auth::signing::{SigningKey, SigningMethod};

    const NOW: u64 = 1_700_000_000;

    fn codec(method: SigningMethod, key: &str) -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            SigningKey::new(method, key.as_bytes()).unwrap(),
        ))
    }

    fn verifier_at(codec: &Arc<TokenCodec>, now: u64) -> Verifier {
        Verifier::new(Arc::clone(codec)).with_time_provider(Arc::new(move || Ok(now)))
    }

    #[test]
    fn test_verify_valid_token() -> Result<(), AuthError> {
        let codec = codec(SigningMethod::Hs256, "verifier-key");
        let token = codec.encode(&Claims::new("alice", NOW, NOW + 60))?;

        let claims = verifier_at(&codec, NOW).verify(&token)?;
        assert_eq!(claims.subject(), "alice");
        Ok(())
    }

    #[test]
    fn test_expiry_boundary() -> Result<(), AuthError> {
        let codec = codec(SigningMethod::Hs256, "verifier-key");
        let token = codec.encode(&Claims::new("alice", NOW, NOW + 60))?;

        assert!(verifier_at(&codec, NOW + 59).verify(&token).is_ok());
        assert!(matches!(
            verifier_at(&codec, NOW + 60).verify(&token),
            Err(AuthError::TokenExpired)
        ));
        assert!(matches!(
            verifier_at(&codec, NOW + 3600).verify(&token),
            Err(AuthError::TokenExpired)
        ));
        Ok(())
    }

    #[test]
    fn test_signature_checked_before_expiry() -> Result<(), AuthError> {
        let codec = codec(SigningMethod::Hs256, "verifier-key");
        let other = self::codec(SigningMethod::Hs256, "another-key");
        let token = other.encode(&Claims::new("alice", NOW - 120, NOW - 60))?;

        // Expired and forged: the forgery is what gets reported
        assert!(matches!(
            verifier_at(&codec, NOW).verify(&token),
            Err(AuthError::InvalidToken(TokenError::SignatureMismatch))
        ));
        Ok(())
    }

    #[test]
    fn test_method_change_invalidates_tokens() -> Result<(), AuthError> {
        let old = codec(SigningMethod::Hs256, "verifier-key");
        let new = codec(SigningMethod::Hs512, "verifier-key");
        let token = old.encode(&Claims::new("alice", NOW, NOW + 60))?;

        assert!(matches!(
            verifier_at(&new, NOW).verify(&token),
            Err(AuthError::InvalidToken(TokenError::AlgorithmMismatch { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_garbage_is_invalid_token() {
        let codec = codec(SigningMethod::Hs256, "verifier-key");
        let verifier = verifier_at(&codec, NOW);

        for token in ["", "abc", "a.b.c", "...", "not a token at all"] {
            assert!(
                matches!(verifier.verify(token), Err(AuthError::InvalidToken(_))),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_clock_failure_passes_through() -> Result<(), AuthError> {
        let codec = codec(SigningMethod::Hs256, "verifier-key");
        let token = codec.encode(&Claims::new("alice", NOW, NOW + 60))?;
        let verifier = Verifier::new(Arc::clone(&codec)).with_time_provider(Arc::new(|| {
            Err(AuthError::Configuration("System time is before Unix epoch".to_string()))
        }));

        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::Configuration(_))
        ));
        // Forgeries are still reported as such when the clock is broken
        assert!(matches!(
            verifier.verify("a.b.c"),
            Err(AuthError::InvalidToken(_))
        ));
        Ok(())
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_verification_metrics() -> Result<(), AuthError> {
        use crate::auth::metrics::InMemoryMetricsCollector;

        let collector = Arc::new(InMemoryMetricsCollector::new());
        let codec = codec(SigningMethod::Hs256, "verifier-key");
        let verifier = verifier_at(&codec, NOW)
            .with_metrics_collector(Arc::clone(&collector) as Arc<dyn MetricsCollector>);

        let token = codec.encode(&Claims::new("alice", NOW, NOW + 60))?;
        verifier.verify_recorded(&token).await?;
        let _ = verifier.verify_recorded("garbage").await;

        let metrics = collector.get_metrics().await?;
        assert_eq!(metrics.verification_attempts, 2);
        assert_eq!(metrics.verification_successes, 1);
        assert_eq!(metrics.error_counts.invalid_token, 1);
        Ok(())
    }
}
