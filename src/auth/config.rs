use std::fmt;
use std::time::Duration;

use crate::auth::error::AuthError;

/// Environment variable prefix read by [`AuthConfig::from_env`].
pub const ENV_PREFIX: &str = "TOKEN_AUTH_";

/// Predefined configuration presets for common use cases.
///
/// Presets only set the token lifetime and driver timeout; the driver and
/// signing material still come from deployment configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Production-ready configuration.
    ///
    /// - Token lifetime: 1 hour
    /// - Driver timeout: 5 seconds
    Production,

    /// Development-friendly configuration.
    ///
    /// - Token lifetime: 24 hours
    /// - Driver timeout: 30 seconds (tolerates debuggers and slow local stores)
    Development,

    /// High-security configuration.
    ///
    /// - Token lifetime: 15 minutes
    /// - Driver timeout: 2 seconds
    HighSecurity,

    /// Load configuration from environment variables.
    ///
    /// See [`AuthConfig::from_env`].
    FromEnv,
}

/// Configuration for the authentication service.
///
/// Built once at startup and handed to
/// [`AuthService::builder`](crate::AuthService::builder). Nothing in the
/// request path reads the environment.
///
/// # Environment Variables
///
/// [`AuthConfig::from_env`] reads:
/// - `TOKEN_AUTH_DBDRIVER`: credential driver name (default: `memory`)
/// - `TOKEN_AUTH_DBDSN`: driver connection string (default: empty)
/// - `TOKEN_AUTH_SIGNMETHOD`: signing method (default: `HS256`)
/// - `TOKEN_AUTH_SHAREDSECRET`: signing secret (default: empty, rejected at build)
/// - `TOKEN_AUTH_TOKEN_LIFETIME`: token lifetime in seconds (default: 3600)
/// - `TOKEN_AUTH_DRIVER_TIMEOUT`: driver timeout in milliseconds, `0` disables (default: 5000)
///
/// # Example
///
/// ```rust
/// use token_auth::{AuthConfig, ConfigPreset};
/// use std::time::Duration;
///
/// let config = AuthConfig {
///     driver: "memory".to_string(),
///     dsn: "alice=s3cret".to_string(),
///     shared_secret: "a-long-shared-secret-for-signing".to_string(),
///     ..AuthConfig::from(ConfigPreset::HighSecurity)
/// };
/// assert_eq!(config.token_lifetime, Duration::from_secs(900));
/// assert!(!config.summary().contains("a-long-shared-secret"));
/// ```
#[derive(Clone)]
pub struct AuthConfig {
    /// Registered credential driver name
    pub driver: String,
    /// Connection string handed to the driver factory
    pub dsn: String,
    /// Signing method name, e.g. `HS256`
    pub sign_method: String,
    /// Shared signing secret
    pub shared_secret: String,
    /// How long issued tokens stay valid
    pub token_lifetime: Duration,
    /// Upper bound on a single credential driver call
    pub driver_timeout: Option<Duration>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from(ConfigPreset::Production)
    }
}

impl AuthConfig {
    /// Load configuration from `TOKEN_AUTH_*` environment variables.
    ///
    /// Intended for the process bootstrap only. Values that fail to parse
    /// are reported as [`AuthError::Configuration`].
    pub fn from_env() -> Result<Self, AuthError> {
        let defaults = Self::from(ConfigPreset::Production);

        let token_lifetime = match env_var("TOKEN_LIFETIME") {
            Some(value) => Duration::from_secs(parse_number("TOKEN_LIFETIME", &value)?),
            None => defaults.token_lifetime,
        };
        let driver_timeout = match env_var("DRIVER_TIMEOUT") {
            Some(value) => match parse_number("DRIVER_TIMEOUT", &value)? {
                0 => None,
                millis => Some(Duration::from_millis(millis)),
            },
            None => defaults.driver_timeout,
        };

        Ok(Self {
            driver: env_var("DBDRIVER").unwrap_or(defaults.driver),
            dsn: env_var("DBDSN").unwrap_or(defaults.dsn),
            sign_method: env_var("SIGNMETHOD").unwrap_or(defaults.sign_method),
            shared_secret: env_var("SHAREDSECRET").unwrap_or(defaults.shared_secret),
            token_lifetime,
            driver_timeout,
        })
    }

    /// Check the values that make the service unusable.
    ///
    /// The signing method and key are checked again when the signing key is
    /// built; this catches the remaining startup-fatal settings.
    pub fn check(&self) -> Result<(), AuthError> {
        if self.driver.trim().is_empty() {
            return Err(AuthError::Configuration(
                "Credential driver name must not be empty".to_string(),
            ));
        }
        // Claims carry whole seconds, so a sub-second lifetime would yield exp == iat.
        if self.token_lifetime.as_secs() == 0 {
            return Err(AuthError::Configuration(
                "Token lifetime must be at least one second".to_string(),
            ));
        }
        if self.driver_timeout.is_some_and(|t| t.is_zero()) {
            return Err(AuthError::Configuration(
                "Driver timeout must be greater than zero; use None to disable it".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the configuration and returns any warnings.
    ///
    /// # Returns
    ///
    /// A vector of warning messages for potentially problematic settings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.token_lifetime.as_secs() < 60 {
            warnings.push(
                "Very short token lifetime (< 1 minute) forces frequent re-authentication"
                    .to_string(),
            );
        }
        if self.token_lifetime.as_secs() > 86_400 {
            warnings.push(
                "Long token lifetime (> 24 hours) widens the window for stolen tokens".to_string(),
            );
        }

        if !self.shared_secret.is_empty() && self.shared_secret.len() < 32 {
            warnings.push(
                "Shared secret shorter than 32 bytes weakens HMAC signatures".to_string(),
            );
        }

        if self.driver_timeout.is_none() {
            warnings.push(
                "No driver timeout: a stalled credential store will stall authentication"
                    .to_string(),
            );
        }

        warnings
    }

    /// Returns a summary of the current configuration with the secret masked.
    pub fn summary(&self) -> String {
        format!(
            "AuthConfig {{ driver: {}, sign_method: {}, shared_secret: ******, token_lifetime: {}s, driver_timeout: {} }}",
            self.driver,
            self.sign_method,
            self.token_lifetime.as_secs(),
            self.driver_timeout
                .map(|t| format!("{}ms", t.as_millis()))
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("driver", &self.driver)
            .field("dsn", &"******")
            .field("sign_method", &self.sign_method)
            .field("shared_secret", &"******")
            .field("token_lifetime", &self.token_lifetime)
            .field("driver_timeout", &self.driver_timeout)
            .finish()
    }
}

impl From<ConfigPreset> for AuthConfig {
    fn from(preset: ConfigPreset) -> Self {
        let (token_lifetime, driver_timeout) = match preset {
            ConfigPreset::Production => (Duration::from_secs(3600), Duration::from_secs(5)),
            ConfigPreset::Development => (Duration::from_secs(86_400), Duration::from_secs(30)),
            ConfigPreset::HighSecurity => (Duration::from_secs(900), Duration::from_secs(2)),
            // Unparseable values fall back to production defaults here;
            // call from_env directly to surface them.
            ConfigPreset::FromEnv => {
                return Self::from_env().unwrap_or_else(|e| {
                    tracing::warn!("Falling back to production defaults: {}", e);
                    Self::from(ConfigPreset::Production)
                });
            }
        };

        Self {
            driver: "memory".to_string(),
            dsn: String::new(),
            sign_method: "HS256".to_string(),
            shared_secret: String::new(),
            token_lifetime,
            driver_timeout: Some(driver_timeout),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn parse_number(name: &str, value: &str) -> Result<u64, AuthError> {
    value.trim().parse().map_err(|_| {
        AuthError::Configuration(format!("{ENV_PREFIX}{name} must be a number, got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_NAMES: [&str; 6] = [
        "DBDRIVER",
        "DBDSN",
        "SIGNMETHOD",
        "SHAREDSECRET",
        "TOKEN_LIFETIME",
        "DRIVER_TIMEOUT",
    ];

    fn clear_env_vars() {
        for name in ENV_NAMES {
            unsafe {
                std::env::remove_var(format!("{ENV_PREFIX}{name}"));
            }
        }
    }

    fn set_env_var(name: &str, value: &str) {
        unsafe {
            std::env::set_var(format!("{ENV_PREFIX}{name}"), value);
        }
    }

    #[test]
    fn test_default_configuration() {
        let config = AuthConfig::default();
        assert_eq!(config.driver, "memory");
        assert_eq!(config.sign_method, "HS256");
        assert_eq!(config.token_lifetime.as_secs(), 3600);
        assert_eq!(config.driver_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_presets() {
        let config = AuthConfig::from(ConfigPreset::Development);
        assert_eq!(config.token_lifetime.as_secs(), 86_400);
        assert_eq!(config.driver_timeout, Some(Duration::from_secs(30)));

        let config = AuthConfig::from(ConfigPreset::HighSecurity);
        assert_eq!(config.token_lifetime.as_secs(), 900);
        assert_eq!(config.driver_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env_vars();

        set_env_var("DBDRIVER", "sqlite");
        set_env_var("DBDSN", "/var/lib/auth/credentials.db");
        set_env_var("SIGNMETHOD", "HS512");
        set_env_var("SHAREDSECRET", "from-the-environment");
        set_env_var("TOKEN_LIFETIME", "120");
        set_env_var("DRIVER_TIMEOUT", "250");

        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.dsn, "/var/lib/auth/credentials.db");
        assert_eq!(config.sign_method, "HS512");
        assert_eq!(config.shared_secret, "from-the-environment");
        assert_eq!(config.token_lifetime, Duration::from_secs(120));
        assert_eq!(config.driver_timeout, Some(Duration::from_millis(250)));

        let preset = AuthConfig::from(ConfigPreset::FromEnv);
        assert_eq!(preset.driver, "sqlite");

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_and_disabled_timeout() {
        clear_env_vars();
        set_env_var("DRIVER_TIMEOUT", "0");

        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.driver, "memory");
        assert_eq!(config.token_lifetime.as_secs(), 3600);
        assert_eq!(config.driver_timeout, None);

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_numbers() {
        clear_env_vars();
        set_env_var("TOKEN_LIFETIME", "one hour");

        assert!(matches!(
            AuthConfig::from_env(),
            Err(AuthError::Configuration(_))
        ));

        clear_env_vars();
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    #[serial]
    fn test_from_env_preset_warns_and_falls_back() {
        clear_env_vars();
        set_env_var("DBDRIVER", "sqlite");
        set_env_var("DRIVER_TIMEOUT", "soon");

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let config = tracing::subscriber::with_default(subscriber, || {
            AuthConfig::from(ConfigPreset::FromEnv)
        });

        // Nothing from the environment survives a parse failure
        assert_eq!(config.driver, "memory");
        assert_eq!(config.driver_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.token_lifetime.as_secs(), 3600);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "no warning logged: {output}");
        assert!(output.contains("DRIVER_TIMEOUT"), "warning lacks the cause: {output}");

        clear_env_vars();
    }

    #[test]
    fn test_check() {
        let config = AuthConfig::default();
        assert!(config.check().is_ok());

        for token_lifetime in [
            Duration::ZERO,
            Duration::from_millis(500),
            Duration::from_millis(999),
        ] {
            let config = AuthConfig {
                token_lifetime,
                ..AuthConfig::default()
            };
            assert!(matches!(config.check(), Err(AuthError::Configuration(_))));
        }

        let config = AuthConfig {
            token_lifetime: Duration::from_millis(1500),
            ..AuthConfig::default()
        };
        assert!(config.check().is_ok());

        let config = AuthConfig {
            driver: " ".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(config.check(), Err(AuthError::Configuration(_))));

        let config = AuthConfig {
            driver_timeout: Some(Duration::ZERO),
            ..AuthConfig::default()
        };
        assert!(matches!(config.check(), Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_validation_valid_config() {
        let config = AuthConfig {
            shared_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validation_warnings() {
        let config = AuthConfig {
            shared_secret: "short".to_string(),
            token_lifetime: Duration::from_secs(30),
            driver_timeout: None,
            ..AuthConfig::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("Very short token lifetime")));
        assert!(warnings.iter().any(|w| w.contains("Shared secret shorter")));
        assert!(warnings.iter().any(|w| w.contains("No driver timeout")));

        let config = AuthConfig {
            token_lifetime: Duration::from_secs(7 * 86_400),
            ..AuthConfig::default()
        };
        assert!(
            config
                .validate()
                .iter()
                .any(|w| w.contains("Long token lifetime"))
        );
    }

    #[test]
    fn test_summary_and_debug_mask_secrets() {
        let config = AuthConfig {
            dsn: "postgres://user:pw@db/auth".to_string(),
            shared_secret: "super-secret-value".to_string(),
            ..AuthConfig::default()
        };

        let summary = config.summary();
        assert!(summary.contains("shared_secret: ******"));
        assert!(summary.contains("token_lifetime: 3600s"));
        assert!(summary.contains("driver_timeout: 5000ms"));
        assert!(!summary.contains("super-secret-value"));

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(!debug.contains("user:pw"));
    }
}
