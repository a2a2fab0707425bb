//! Compact signed token encoding.
//!
//! Tokens use the JWS compact serialization:
//!
//! ```text
//! base64url(header) "." base64url(claims) "." base64url(signature)
//! ```
//!
//! where `header` is `{"alg":"<method>","typ":"JWT"}`, `claims` is the JSON
//! form of [`Claims`], and the signature covers the first two segments
//! exactly as they appear in the token. Base64url is unpadded.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::auth::claims::Claims;
use crate::auth::error::TokenError;
use crate::auth::signing::{SigningKey, SigningMethod};

const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Encodes claim sets into signed tokens and decodes them back.
///
/// The codec only checks structure and signature. Expiry is left to the
/// [`Verifier`](crate::Verifier) so signature validity and temporal
/// validity can be tested separately.
///
/// # Example
///
/// ```rust
/// use token_auth::{Claims, SigningKey, TokenCodec};
///
/// let codec = TokenCodec::new(SigningKey::from_config("HS256", "secret")?);
/// let claims = Claims::new("alice", 1_700_000_000, 1_700_003_600);
///
/// let token = codec.encode(&claims)?;
/// assert_eq!(codec.decode(&token)?, claims);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: SigningKey,
}

impl TokenCodec {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// The configured signing method.
    pub fn method(&self) -> SigningMethod {
        self.key.method()
    }

    /// Serialize and sign a claim set.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        claims.validate()?;

        let header = Header {
            alg: self.method().as_str().to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
        };
        let header_json = serde_json::to_vec(&header)
            .map_err(|e| TokenError::InvalidClaims(format!("header serialization: {e}")))?;
        let claims_json = serde_json::to_vec(claims)
            .map_err(|e| TokenError::InvalidClaims(format!("claims serialization: {e}")))?;

        let mut token = String::with_capacity(
            (header_json.len() + claims_json.len() + self.method().signature_len()) * 4 / 3 + 4,
        );
        token.push_str(&URL_SAFE_NO_PAD.encode(header_json));
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(claims_json));

        let signature = self.key.sign(token.as_bytes())?;
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(signature));

        Ok(token)
    }

    /// Check a token's structure, method and signature, then return its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let (signing_input, encoded_signature) = token
            .rsplit_once('.')
            .ok_or_else(|| TokenError::Malformed("expected three segments".to_string()))?;
        let (encoded_header, encoded_claims) = signing_input
            .split_once('.')
            .ok_or_else(|| TokenError::Malformed("expected three segments".to_string()))?;

        if encoded_header.is_empty() || encoded_claims.is_empty() || encoded_signature.is_empty()
        {
            return Err(TokenError::Malformed("empty segment".to_string()));
        }
        if encoded_claims.contains('.') {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        }

        let header: Header = serde_json::from_slice(&decode_segment(encoded_header, "header")?)
            .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
        self.check_header(&header)?;

        let signature = decode_segment(encoded_signature, "signature")?;
        self.key.verify(signing_input.as_bytes(), &signature)?;

        let claims_json = decode_segment(encoded_claims, "claims")?;
        serde_json::from_slice(&claims_json).map_err(|e| TokenError::InvalidClaims(e.to_string()))
    }

    /// Reject tokens that name any method other than the configured one.
    fn check_header(&self, header: &Header) -> Result<(), TokenError> {
        if header.alg != self.method().as_str() {
            return Err(TokenError::AlgorithmMismatch {
                expected: self.method().as_str().to_string(),
                found: header.alg.clone(),
            });
        }
        match header.typ.as_deref() {
            None | Some(TOKEN_TYPE) => Ok(()),
            Some(other) => Err(TokenError::Malformed(format!(
                "unsupported token type '{other}'"
            ))),
        }
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{name} encoding: {e}")))
}
