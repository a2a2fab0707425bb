//! Metrics collection for authentication and verification.
//!
//! Collection is optional and enabled via the `metrics` feature. The service
//! records events through a [`MetricsCollector`]; the default
//! [`InMemoryMetricsCollector`] keeps atomic counters.

use crate::AuthError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters tracked by the authentication service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMetrics {
    /// Total number of authentication attempts
    pub authentication_attempts: u64,
    /// Attempts that issued a token
    pub authentication_successes: u64,
    /// Attempts that were rejected or failed
    pub authentication_failures: u64,
    /// Total number of token verification attempts
    pub verification_attempts: u64,
    /// Verifications that accepted the token
    pub verification_successes: u64,
    /// Verifications that rejected the token
    pub verification_failures: u64,
    /// Credential driver calls, successful or not
    pub driver_operations: u64,
    /// Driver calls that errored or timed out
    pub driver_failures: u64,
    /// Errors by category
    pub error_counts: ErrorMetrics,
    /// Average timings
    pub performance: PerformanceMetrics,
}

/// Error counts keyed by [`AuthError::code`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMetrics {
    pub backend_unavailable: u64,
    pub invalid_credentials: u64,
    pub token_issuance: u64,
    pub invalid_token: u64,
    pub token_expired: u64,
    pub configuration: u64,
}

/// Average durations in microseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceMetrics {
    pub avg_authentication_time_us: u64,
    pub avg_verification_time_us: u64,
    pub avg_driver_time_us: u64,
}

/// Events recorded by the service.
#[derive(Debug, Clone)]
pub enum MetricEvent {
    /// An authentication attempt finished
    AuthenticationAttempt {
        /// Time taken, including the driver call
        duration: Duration,
        /// Whether a token was issued
        success: bool,
    },
    /// A token verification finished
    VerificationAttempt {
        /// Time taken to verify
        duration: Duration,
        /// Whether the token was accepted
        success: bool,
    },
    /// A credential driver call finished
    DriverOperation {
        /// Driver name, e.g. "memory"
        driver: &'static str,
        /// Time taken
        duration: Duration,
        /// Whether the driver answered (a `false` answer still counts as success)
        success: bool,
    },
    /// An operation failed
    Error {
        /// The [`AuthError::code`] of the failure
        error_code: &'static str,
    },
}

impl MetricEvent {
    /// Error event for `error`.
    pub fn error(error: &AuthError) -> Self {
        Self::Error {
            error_code: error.code(),
        }
    }
}

/// Trait for metrics collection backends.
///
/// All methods may be called concurrently from many tasks.
///
/// # Example Implementation
///
/// ```rust
/// use token_auth::metrics::{AuthMetrics, MetricEvent, MetricsCollector};
/// use async_trait::async_trait;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// #[derive(Default)]
/// pub struct ErrorCounter {
///     errors: AtomicU64,
/// }
///
/// #[async_trait]
/// impl MetricsCollector for ErrorCounter {
///     async fn record_event(&self, event: MetricEvent) {
///         if let MetricEvent::Error { .. } = event {
///             self.errors.fetch_add(1, Ordering::Relaxed);
///         }
///     }
///
///     async fn get_metrics(&self) -> Result<AuthMetrics, token_auth::AuthError> {
///         Ok(AuthMetrics::default())
///     }
///
///     async fn reset_metrics(&self) -> Result<(), token_auth::AuthError> {
///         self.errors.store(0, Ordering::Relaxed);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Record a metric event.
    ///
    /// Called on every request, so implementations should not block.
    async fn record_event(&self, event: MetricEvent);

    /// Get a point-in-time snapshot of the collected metrics.
    async fn get_metrics(&self) -> Result<AuthMetrics, AuthError>;

    /// Reset all metrics to zero.
    async fn reset_metrics(&self) -> Result<(), AuthError>;

    /// Flush any buffered metrics.
    async fn flush(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Simple in-memory metrics collector using atomic counters.
///
/// # Example
///
/// ```rust
/// use token_auth::metrics::{InMemoryMetricsCollector, MetricEvent, MetricsCollector};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), token_auth::AuthError> {
/// let collector = InMemoryMetricsCollector::new();
///
/// collector.record_event(MetricEvent::AuthenticationAttempt {
///     duration: Duration::from_micros(250),
///     success: true,
/// }).await;
///
/// let metrics = collector.get_metrics().await?;
/// assert_eq!(metrics.authentication_successes, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMetricsCollector {
    authentication_attempts: AtomicU64,
    authentication_successes: AtomicU64,
    verification_attempts: AtomicU64,
    verification_successes: AtomicU64,
    driver_operations: AtomicU64,
    driver_failures: AtomicU64,

    // Error counts
    backend_unavailable_errors: AtomicU64,
    invalid_credentials_errors: AtomicU64,
    token_issuance_errors: AtomicU64,
    invalid_token_errors: AtomicU64,
    token_expired_errors: AtomicU64,
    configuration_errors: AtomicU64,

    // Timing totals in microseconds
    authentication_time_total: AtomicU64,
    verification_time_total: AtomicU64,
    driver_time_total: AtomicU64,
}

impl InMemoryMetricsCollector {
    /// Create a new in-memory metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> [&AtomicU64; 15] {
        [
            &self.authentication_attempts,
            &self.authentication_successes,
            &self.verification_attempts,
            &self.verification_successes,
            &self.driver_operations,
            &self.driver_failures,
            &self.backend_unavailable_errors,
            &self.invalid_credentials_errors,
            &self.token_issuance_errors,
            &self.invalid_token_errors,
            &self.token_expired_errors,
            &self.configuration_errors,
            &self.authentication_time_total,
            &self.verification_time_total,
            &self.driver_time_total,
        ]
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn average(total: &AtomicU64, samples: u64) -> u64 {
    if samples > 0 {
        total.load(Ordering::Relaxed) / samples
    } else {
        0
    }
}

#[async_trait]
impl MetricsCollector for InMemoryMetricsCollector {
    async fn record_event(&self, event: MetricEvent) {
        match event {
            MetricEvent::AuthenticationAttempt { duration, success } => {
                self.authentication_attempts.fetch_add(1, Ordering::Relaxed);
                if success {
                    self.authentication_successes
                        .fetch_add(1, Ordering::Relaxed);
                }
                self.authentication_time_total
                    .fetch_add(micros(duration), Ordering::Relaxed);
            }
            MetricEvent::VerificationAttempt { duration, success } => {
                self.verification_attempts.fetch_add(1, Ordering::Relaxed);
                if success {
                    self.verification_successes.fetch_add(1, Ordering::Relaxed);
                }
                self.verification_time_total
                    .fetch_add(micros(duration), Ordering::Relaxed);
            }
            MetricEvent::DriverOperation {
                duration, success, ..
            } => {
                self.driver_operations.fetch_add(1, Ordering::Relaxed);
                if !success {
                    self.driver_failures.fetch_add(1, Ordering::Relaxed);
                }
                self.driver_time_total
                    .fetch_add(micros(duration), Ordering::Relaxed);
            }
            MetricEvent::Error { error_code } => {
                let counter = match error_code {
                    "backend_unavailable" => &self.backend_unavailable_errors,
                    "invalid_credentials" => &self.invalid_credentials_errors,
                    "token_issuance" => &self.token_issuance_errors,
                    "invalid_token" => &self.invalid_token_errors,
                    "token_expired" => &self.token_expired_errors,
                    _ => &self.configuration_errors,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn get_metrics(&self) -> Result<AuthMetrics, AuthError> {
        let authentication_attempts = self.authentication_attempts.load(Ordering::Relaxed);
        let authentication_successes = self.authentication_successes.load(Ordering::Relaxed);
        let verification_attempts = self.verification_attempts.load(Ordering::Relaxed);
        let verification_successes = self.verification_successes.load(Ordering::Relaxed);
        let driver_operations = self.driver_operations.load(Ordering::Relaxed);

        Ok(AuthMetrics {
            authentication_attempts,
            authentication_successes,
            authentication_failures: authentication_attempts
                .saturating_sub(authentication_successes),
            verification_attempts,
            verification_successes,
            verification_failures: verification_attempts.saturating_sub(verification_successes),
            driver_operations,
            driver_failures: self.driver_failures.load(Ordering::Relaxed),
            error_counts: ErrorMetrics {
                backend_unavailable: self.backend_unavailable_errors.load(Ordering::Relaxed),
                invalid_credentials: self.invalid_credentials_errors.load(Ordering::Relaxed),
                token_issuance: self.token_issuance_errors.load(Ordering::Relaxed),
                invalid_token: self.invalid_token_errors.load(Ordering::Relaxed),
                token_expired: self.token_expired_errors.load(Ordering::Relaxed),
                configuration: self.configuration_errors.load(Ordering::Relaxed),
            },
            performance: PerformanceMetrics {
                avg_authentication_time_us: average(
                    &self.authentication_time_total,
                    authentication_attempts,
                ),
                avg_verification_time_us: average(
                    &self.verification_time_total,
                    verification_attempts,
                ),
                avg_driver_time_us: average(&self.driver_time_total, driver_operations),
            },
        })
    }

    async fn reset_metrics(&self) -> Result<(), AuthError> {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Metrics collector that discards every event.
#[derive(Debug, Default)]
pub struct NoOpMetricsCollector;

impl NoOpMetricsCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsCollector for NoOpMetricsCollector {
    async fn record_event(&self, _event: MetricEvent) {}

    async fn get_metrics(&self) -> Result<AuthMetrics, AuthError> {
        Ok(AuthMetrics::default())
    }

    async fn reset_metrics(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
