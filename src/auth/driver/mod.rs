//! Pluggable credential drivers.
//!
//! This module provides a trait-based driver system that lets different
//! backing stores answer "does this identifier/secret pair exist". The
//! available backends depend on the enabled features.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::AuthError;

// Always available
mod memory;
pub use memory::MemoryDriver;

// Feature-gated drivers
#[cfg(feature = "sqlite-driver")]
mod sqlite;
#[cfg(feature = "sqlite-driver")]
pub use sqlite::SqliteDriver;

#[cfg(feature = "redis-driver")]
mod redis;
#[cfg(feature = "redis-driver")]
pub use redis::RedisDriver;

/// A stored identifier/secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Unique account identifier
    pub identifier: String,
    /// Stored secret
    pub secret: String,
}

impl Credential {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"******")
            .finish()
    }
}

/// Abstract credential store.
///
/// Backends implement [`lookup`](CredentialDriver::lookup); the provided
/// [`verify`](CredentialDriver::verify) performs the secret comparison so
/// every backend gets the same timing behaviour.
///
/// # Available Implementations
///
/// - [`MemoryDriver`] - Always available, in-memory HashMap-based store
/// - `SqliteDriver` - Available with `sqlite-driver` feature
/// - `RedisDriver` - Available with `redis-driver` feature
///
/// # Error Handling
///
/// A missing record is `Ok(None)` from `lookup` and `Ok(false)` from
/// `verify`. Only infrastructure failures are errors, and they must be
/// reported as [`AuthError::BackendUnavailable`].
///
/// # Example Implementation
///
/// ```rust
/// use token_auth::driver::{Credential, CredentialDriver};
/// use token_auth::AuthError;
/// use async_trait::async_trait;
///
/// struct SingleUser;
///
/// #[async_trait]
/// impl CredentialDriver for SingleUser {
///     fn name(&self) -> &'static str {
///         "single-user"
///     }
///
///     async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
///         Ok((identifier == "admin").then(|| Credential::new("admin", "changeme")))
///     }
/// }
/// ```
#[async_trait]
pub trait CredentialDriver: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Optional method for backend initialization.
    ///
    /// Called once while the service is built. Implementations can use this
    /// for schema creation or connection checks.
    async fn init(&self) -> Result<(), AuthError> {
        Ok(())
    }

    /// Fetch the stored credential for `identifier`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Credential))` - If a record exists
    /// * `Ok(None)` - If no record exists
    /// * `Err(AuthError::BackendUnavailable)` - If the store could not be read
    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, AuthError>;

    /// Check `supplied` against the stored secret for `identifier`.
    ///
    /// Returns `Ok(true)` only when a record exists and the secrets match.
    /// Unknown identifiers and mismatched secrets both yield `Ok(false)`.
    async fn verify(&self, identifier: &str, supplied: &str) -> Result<bool, AuthError> {
        if identifier.is_empty() {
            secrets_match(None, supplied);
            return Ok(false);
        }

        let credential = self.lookup(identifier).await?;
        Ok(secrets_match(
            credential.as_ref().map(|c| c.secret.as_str()),
            supplied,
        ))
    }
}

/// Compare secrets in constant time.
///
/// Both sides are hashed first so the comparison does not depend on secret
/// length. A missing record is compared against a fixed digest so the
/// unknown-identifier path costs the same as a mismatch. An empty supplied
/// secret never matches.
pub fn secrets_match(stored: Option<&str>, supplied: &str) -> bool {
    let supplied_digest = Sha256::digest(supplied.as_bytes());

    let (stored_digest, exists) = match stored {
        Some(secret) => (Sha256::digest(secret.as_bytes()), true),
        None => (Sha256::digest(b"\0no-such-credential\0"), false),
    };

    let equal: bool = stored_digest
        .as_slice()
        .ct_eq(supplied_digest.as_slice())
        .into();
    equal & exists & !supplied.is_empty()
}

/// A function that creates a driver from a connection string.
pub type DriverFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn CredentialDriver>, AuthError> + Send + Sync>;

/// Maps driver names to factories.
///
/// The driver is chosen once at startup from configuration; request
/// handling only ever sees the resulting `Arc<dyn CredentialDriver>`.
///
/// # Example
///
/// ```rust
/// use token_auth::driver::{CredentialDriver, DriverRegistry, MemoryDriver};
/// use std::sync::Arc;
///
/// let mut registry = DriverRegistry::with_defaults();
/// registry.register("fixture", |_dsn| {
///     Ok(Arc::new(MemoryDriver::new()) as Arc<dyn CredentialDriver>)
/// });
///
/// assert!(registry.create("memory", "alice=s3cret").is_ok());
/// assert!(registry.create("fixture", "").is_ok());
/// assert!(registry.create("oracle", "").is_err());
/// ```
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every driver compiled into this build.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("memory", |dsn| {
            Ok(Arc::new(MemoryDriver::from_dsn(dsn)?) as Arc<dyn CredentialDriver>)
        });

        #[cfg(feature = "sqlite-driver")]
        registry.register("sqlite", |dsn| {
            Ok(Arc::new(SqliteDriver::new(dsn)?) as Arc<dyn CredentialDriver>)
        });

        #[cfg(feature = "redis-driver")]
        registry.register("redis", |dsn| {
            Ok(Arc::new(RedisDriver::from_dsn(dsn)?) as Arc<dyn CredentialDriver>)
        });

        registry
    }

    /// Register (or replace) a factory under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Arc<dyn CredentialDriver>, AuthError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Whether a driver is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the driver registered under `name`.
    pub fn create(&self, name: &str, dsn: &str) -> Result<Arc<dyn CredentialDriver>, AuthError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            AuthError::Configuration(format!(
                "Unknown credential driver '{name}', available: {}",
                self.names().join(", ")
            ))
        })?;
        factory(dsn)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
