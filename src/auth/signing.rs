//! Signing methods and key material.
//!
//! A [`SigningKey`] pairs a [`SigningMethod`] with the shared secret used to
//! produce and check token signatures. It is built once at startup from
//! trusted configuration and is read-only afterwards.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::auth::error::{AuthError, TokenError};

/// Supported token signing algorithms.
///
/// Names follow the JOSE registry so tokens interoperate with standard JWT
/// tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningMethod {
    /// HMAC using SHA-256.
    Hs256,
    /// HMAC using SHA-384.
    Hs384,
    /// HMAC using SHA-512.
    Hs512,
}

impl SigningMethod {
    /// All supported methods.
    pub const ALL: [SigningMethod; 3] = [Self::Hs256, Self::Hs384, Self::Hs512];

    /// Returns the JOSE identifier of this method, e.g. `"HS256"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    /// Length in bytes of a signature produced by this method.
    pub fn signature_len(&self) -> usize {
        match self {
            Self::Hs256 => 32,
            Self::Hs384 => 48,
            Self::Hs512 => 64,
        }
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningMethod {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "Unsupported signing method '{s}', expected one of HS256, HS384, HS512"
                ))
            })
    }
}

/// Signing method plus shared secret.
///
/// The key is never printed; `Debug` shows a short fingerprint instead so
/// operators can tell whether two instances share a key.
///
/// # Example
///
/// ```rust
/// use token_auth::signing::{SigningKey, SigningMethod};
///
/// let key = SigningKey::from_config("HS256", "shared-secret")?;
/// assert_eq!(key.method(), SigningMethod::Hs256);
///
/// let signature = key.sign(b"header.claims")?;
/// key.verify(b"header.claims", &signature)?;
///
/// // Unsupported methods and empty keys are rejected up front
/// assert!(SigningKey::from_config("none", "shared-secret").is_err());
/// assert!(SigningKey::from_config("HS256", "").is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct SigningKey {
    method: SigningMethod,
    key: Vec<u8>,
}

impl SigningKey {
    /// Create a signing key, rejecting empty key material.
    pub fn new(method: SigningMethod, key: &[u8]) -> Result<Self, AuthError> {
        if key.is_empty() {
            return Err(AuthError::Configuration(
                "Signing key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            method,
            key: key.to_vec(),
        })
    }

    /// Create a signing key from a method name and a shared secret.
    pub fn from_config(method: &str, secret: &str) -> Result<Self, AuthError> {
        Self::new(method.parse()?, secret.as_bytes())
    }

    /// The configured signing method.
    pub fn method(&self) -> SigningMethod {
        self.method
    }

    /// The raw key material.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Hex of the first four bytes of SHA-256 over the key.
    pub fn fingerprint(&self) -> String {
        hex::encode(&Sha256::digest(&self.key)[..4])
    }

    /// Compute the signature of `input`.
    pub fn sign(&self, input: &[u8]) -> Result<Vec<u8>, TokenError> {
        match self.method {
            SigningMethod::Hs256 => mac_sign::<Hmac<Sha256>>(&self.key, input),
            SigningMethod::Hs384 => mac_sign::<Hmac<Sha384>>(&self.key, input),
            SigningMethod::Hs512 => mac_sign::<Hmac<Sha512>>(&self.key, input),
        }
    }

    /// Check `signature` against `input` in constant time.
    pub fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), TokenError> {
        match self.method {
            SigningMethod::Hs256 => mac_verify::<Hmac<Sha256>>(&self.key, input, signature),
            SigningMethod::Hs384 => mac_verify::<Hmac<Sha384>>(&self.key, input, signature),
            SigningMethod::Hs512 => mac_verify::<Hmac<Sha512>>(&self.key, input, signature),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("method", &self.method)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

fn mac_sign<M>(key: &[u8], input: &[u8]) -> Result<Vec<u8>, TokenError>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| TokenError::Signing(format!("Invalid HMAC key: {e}")))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_verify<M>(key: &[u8], input: &[u8], signature: &[u8]) -> Result<(), TokenError>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| TokenError::Signing(format!("Invalid HMAC key: {e}")))?;
    mac.update(input);

    // verify_slice compares in constant time
    mac.verify_slice(signature)
        .map_err(|_| TokenError::SignatureMismatch)
}
