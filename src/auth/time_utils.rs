//! Time utilities for safe timestamp handling.
//!
//! This module provides safe alternatives to direct SystemTime operations
//! that could potentially panic.

use crate::auth::error::AuthError;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A function that provides the current Unix timestamp in seconds.
pub type TimeProviderFn = Arc<dyn Fn() -> Result<u64, AuthError> + Send + Sync>;

/// Get current timestamp in seconds since Unix epoch.
///
/// In the extremely rare case where system time is before Unix epoch,
/// it returns an error instead of panicking.
pub fn current_timestamp() -> Result<u64, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| AuthError::Configuration("System time is before Unix epoch".to_string()))
}

/// The default time provider, backed by the system clock.
pub(crate) fn system_time_provider() -> TimeProviderFn {
    Arc::new(current_timestamp)
}

/// A token expires at the first second on or after `expires_at`.
pub(crate) fn is_expired(expires_at: u64, now: u64) -> bool {
    now >= expires_at
}
