// Core architecture components
mod authenticator;
mod claims;
mod codec;
mod config;
mod error;
mod service;
mod service_builder;
mod time_utils;
mod verifier;

// Credential drivers
pub mod driver;

// Signing methods and keys
pub mod signing;

// Metrics (optional feature)
#[cfg(feature = "metrics")]
pub mod metrics;

// Core components exports
pub use authenticator::Authenticator;
pub use claims::{Claims, RESERVED_CLAIMS};
pub use codec::TokenCodec;
pub use config::{AuthConfig, ConfigPreset, ENV_PREFIX};
pub use error::{AuthError, TokenError};
pub use service::AuthService;
pub use service_builder::AuthServiceBuilder;
pub use time_utils::{TimeProviderFn, current_timestamp};
pub use verifier::Verifier;

// Driver exports
pub use driver::{Credential, CredentialDriver, DriverFactory, DriverRegistry, MemoryDriver};
#[cfg(feature = "redis-driver")]
pub use driver::RedisDriver;
#[cfg(feature = "sqlite-driver")]
pub use driver::SqliteDriver;

// Signing exports
pub use signing::{SigningKey, SigningMethod};

// Metrics exports (optional feature)
#[cfg(feature = "metrics")]
pub use metrics::{
    AuthMetrics, ErrorMetrics, InMemoryMetricsCollector, MetricEvent, MetricsCollector,
    NoOpMetricsCollector, PerformanceMetrics,
};
