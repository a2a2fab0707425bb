//! In-memory credential driver.
//!
//! Keeps credentials in a HashMap. Suited to tests, development, and
//! deployments whose credential set is supplied at startup.

use super::{Credential, CredentialDriver};
use crate::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A simple in-memory credential store.
///
/// Uses a `HashMap` wrapped in `Arc<RwLock<>>` for thread-safe access.
/// Nothing is persisted across restarts.
///
/// # Example
///
/// ```rust
/// use token_auth::driver::{CredentialDriver, MemoryDriver};
///
/// # async fn example() -> Result<(), token_auth::AuthError> {
/// let driver = MemoryDriver::new();
/// driver.insert("alice", "s3cret").await;
///
/// assert!(driver.verify("alice", "s3cret").await?);
/// assert!(!driver.verify("alice", "wrong").await?);
/// assert!(!driver.verify("mallory", "s3cret").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryDriver {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryDriver {
    /// Creates an empty in-memory driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver pre-populated with the given credentials.
    pub fn with_credentials<I, K, V>(credentials: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = credentials
            .into_iter()
            .map(|(identifier, secret)| (identifier.into(), secret.into()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Parses a connection string of the form `alice=s3cret;bob=hunter2`.
    ///
    /// An empty string yields an empty driver. Whitespace around entries is
    /// ignored; secrets may contain `=` but not `;`.
    pub fn from_dsn(dsn: &str) -> Result<Self, AuthError> {
        let mut credentials = HashMap::new();
        for entry in dsn.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (identifier, secret) = entry.split_once('=').ok_or_else(|| {
                AuthError::Configuration(
                    "Invalid memory driver entry, expected identifier=secret".to_string(),
                )
            })?;
            let identifier = identifier.trim();
            if identifier.is_empty() {
                return Err(AuthError::Configuration(
                    "Memory driver entry has an empty identifier".to_string(),
                ));
            }
            credentials.insert(identifier.to_string(), secret.to_string());
        }
        Ok(Self::with_credentials(credentials))
    }

    /// Adds or replaces a credential.
    pub async fn insert(&self, identifier: impl Into<String>, secret: impl Into<String>) {
        self.data
            .write()
            .await
            .insert(identifier.into(), secret.into());
    }

    /// Removes a credential, returning whether it existed.
    pub async fn remove(&self, identifier: &str) -> bool {
        self.data.write().await.remove(identifier).is_some()
    }

    /// Number of stored credentials.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
        let data = self.data.read().await;
        Ok(data
            .get(identifier)
            .map(|secret| Credential::new(identifier, secret.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_driver_basic_operations() -> Result<(), AuthError> {
        let driver = MemoryDriver::new();
        assert!(driver.is_empty().await);

        driver.insert("alice", "s3cret").await;
        assert_eq!(driver.len().await, 1);

        let credential = driver.lookup("alice").await?.unwrap();
        assert_eq!(credential, Credential::new("alice", "s3cret"));
        assert!(driver.lookup("bob").await?.is_none());

        assert!(driver.verify("alice", "s3cret").await?);
        assert!(!driver.verify("alice", "wrong").await?);
        assert!(!driver.verify("alice", "").await?);
        assert!(!driver.verify("bob", "s3cret").await?);
        assert!(!driver.verify("", "s3cret").await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_memory_driver_replace_and_remove() -> Result<(), AuthError> {
        let driver = MemoryDriver::new();
        driver.insert("alice", "old").await;
        driver.insert("alice", "new").await;

        assert!(!driver.verify("alice", "old").await?);
        assert!(driver.verify("alice", "new").await?);

        assert!(driver.remove("alice").await);
        assert!(!driver.remove("alice").await);
        assert!(!driver.verify("alice", "new").await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_memory_driver_from_dsn() -> Result<(), AuthError> {
        let driver = MemoryDriver::from_dsn(" alice=s3cret ; bob=a=b;")?;
        assert_eq!(driver.len().await, 2);
        assert!(driver.verify("alice", "s3cret").await?);
        assert!(driver.verify("bob", "a=b").await?);

        assert!(MemoryDriver::from_dsn("")?.is_empty().await);
        Ok(())
    }

    #[test]
    fn test_memory_driver_from_dsn_rejects_bad_entries() {
        assert!(matches!(
            MemoryDriver::from_dsn("alice"),
            Err(AuthError::Configuration(_))
        ));
        assert!(matches!(
            MemoryDriver::from_dsn("=s3cret"),
            Err(AuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_driver_clones_share_state() -> Result<(), AuthError> {
        let driver = MemoryDriver::with_credentials([("alice", "s3cret")]);
        let clone = driver.clone();
        clone.insert("bob", "hunter2").await;

        assert!(driver.verify("bob", "hunter2").await?);
        Ok(())
    }
}
