//! SQLite credential driver.
//!
//! This module provides a persistent credential store backed by SQLite. It
//! suits single-instance deployments that keep accounts on local disk.

use super::{Credential, CredentialDriver};
use crate::AuthError;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Arc, Mutex};

/// SQLite-based credential store.
///
/// Credentials live in a `credentials` table keyed by identifier. Queries
/// run on tokio's blocking pool so a slow disk never stalls async workers.
///
/// # Example
///
/// ```rust
/// use token_auth::driver::{CredentialDriver, SqliteDriver};
///
/// # async fn example() -> Result<(), token_auth::AuthError> {
/// let driver = SqliteDriver::new(":memory:")?;
/// driver.init().await?;
/// driver.put_credential("alice", "s3cret").await?;
///
/// assert!(driver.verify("alice", "s3cret").await?);
/// # Ok(())
/// # }
/// ```
pub struct SqliteDriver {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDriver {
    /// Open a SQLite credential store.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file, or ":memory:" for in-memory database
    pub fn new(db_path: &str) -> Result<Self, AuthError> {
        let connection = if db_path.is_empty() || db_path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(db_path)
        };

        let connection = connection.map_err(AuthError::from_backend_error)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Add or replace a credential.
    pub async fn put_credential(&self, identifier: &str, secret: &str) -> Result<(), AuthError> {
        let identifier = identifier.to_string();
        let secret = secret.to_string();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO credentials (identifier, secret) VALUES (?1, ?2)
                 ON CONFLICT(identifier) DO UPDATE SET secret = excluded.secret",
                params![identifier, secret],
            )?;
            Ok(())
        })
        .await
    }

    /// Remove a credential, returning whether it existed.
    pub async fn delete_credential(&self, identifier: &str) -> Result<bool, AuthError> {
        let identifier = identifier.to_string();
        self.with_connection(move |conn| {
            let changes = conn.execute(
                "DELETE FROM credentials WHERE identifier = ?1",
                params![identifier],
            )?;
            Ok(changes > 0)
        })
        .await
    }

    /// Number of stored credentials.
    pub async fn count(&self) -> Result<usize, AuthError> {
        self.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))
        })
        .await
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|_| AuthError::from_backend_message("SQLite connection lock poisoned"))?;
            op(&*conn).map_err(AuthError::from_backend_error)
        })
        .await
        .map_err(|e| AuthError::from_backend_message(format!("SQLite task failed: {e}")))?
    }
}

#[async_trait]
impl CredentialDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self) -> Result<(), AuthError> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                CREATE TABLE IF NOT EXISTS credentials (
                    identifier TEXT PRIMARY KEY NOT NULL,
                    secret TEXT NOT NULL
                )
                "#,
                [],
            )?;
            Ok(())
        })
        .await
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
        let identifier = identifier.to_string();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT identifier, secret FROM credentials WHERE identifier = ?1",
                params![identifier],
                |row| Ok(Credential::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
        })
        .await
    }
}
