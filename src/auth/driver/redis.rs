//! Redis credential driver.
//!
//! This module provides a Redis-backed credential store. It suits
//! deployments where several service instances share one account store.

use super::{Credential, CredentialDriver};
use crate::AuthError;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, RedisResult, aio::MultiplexedConnection};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Key prefix used when none is given.
pub const DEFAULT_KEY_PREFIX: &str = "token_auth:credential";

/// Redis-based credential store.
///
/// Each credential is a plain string key `{prefix}:{identifier}` holding the
/// secret. Every Redis failure is reported as
/// [`AuthError::BackendUnavailable`].
///
/// # Example
///
/// ```rust
/// use token_auth::driver::{CredentialDriver, RedisDriver};
///
/// # async fn example() -> Result<(), token_auth::AuthError> {
/// let driver = RedisDriver::new("redis://localhost:6379", "myapp:credential")?;
/// driver.init().await?;
/// driver.put_credential("alice", "s3cret").await?;
///
/// assert!(driver.verify("alice", "s3cret").await?);
/// # Ok(())
/// # }
/// ```
pub struct RedisDriver {
    client: Client,
    key_prefix: String,
    /// Shared persistent connection
    conn: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisDriver {
    /// Create a new Redis credential driver.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `key_prefix` - Prefix for all credential keys
    pub fn new(redis_url: &str, key_prefix: &str) -> Result<Self, AuthError> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::Configuration(format!("Invalid Redis URL: {e}")))?;

        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            conn: Arc::new(Mutex::new(None)),
        })
    }

    /// Create a driver from a connection URL using [`DEFAULT_KEY_PREFIX`].
    pub fn from_dsn(dsn: &str) -> Result<Self, AuthError> {
        Self::new(dsn, DEFAULT_KEY_PREFIX)
    }

    /// Add or replace a credential.
    pub async fn put_credential(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        let mut conn = self.get_connection().await?;
        let result = conn.set::<_, _, ()>(self.make_key(identifier), secret).await;
        self.settle(result).await
    }

    /// Remove a credential, returning whether it existed.
    pub async fn delete_credential(&self, identifier: &str) -> Result<bool, AuthError> {
        let mut conn = self.get_connection().await?;
        let result: RedisResult<usize> = conn.del(self.make_key(identifier)).await;
        Ok(self.settle(result).await? > 0)
    }

    /// Get or create the shared connection.
    ///
    /// The lock is only held across a connect, never across a command.
    async fn get_connection(&self) -> Result<MultiplexedConnection, AuthError> {
        let mut conn_guard = self.conn.lock().await;

        if let Some(conn) = conn_guard.as_ref() {
            return Ok(conn.clone());
        }

        let new_conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| AuthError::from_backend_message(format!("Redis connection failed: {e}")))?;

        *conn_guard = Some(new_conn.clone());
        Ok(new_conn)
    }

    /// Map a command result, dropping the shared connection if it broke so
    /// the next call reconnects.
    async fn settle<T>(&self, result: RedisResult<T>) -> Result<T, AuthError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_error(&e) {
                    tracing::debug!("discarding broken Redis connection: {}", e);
                    *self.conn.lock().await = None;
                }
                Err(AuthError::from_backend_error(e))
            }
        }
    }

    fn make_key(&self, identifier: &str) -> String {
        let mut key = String::with_capacity(self.key_prefix.len() + identifier.len() + 1);
        key.push_str(&self.key_prefix);
        key.push(':');
        key.push_str(identifier);
        key
    }
}

#[async_trait]
impl CredentialDriver for RedisDriver {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn init(&self) -> Result<(), AuthError> {
        let mut conn = self.get_connection().await?;

        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        self.settle(result)
            .await
            .map_err(|e| AuthError::from_backend_message(format!("Redis ping failed: {e}")))?;

        Ok(())
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
        let mut conn = self.get_connection().await?;

        let result: RedisResult<Option<String>> = conn.get(self.make_key(identifier)).await;
        let secret = self.settle(result).await?;

        Ok(secret.map(|secret| Credential::new(identifier, secret)))
    }
}

fn is_connection_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal()
}
