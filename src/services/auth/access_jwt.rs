use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::Deserialize;
use std::{borrow::Cow, str::FromStr, sync::Arc};
use thiserror::Error;

use crate::services::auth::jwks::{JwksKeyStore, KeyLookupError};

/// Reasons a bearer token is rejected.
///
/// Messages are safe for a 401 `error_description`: they name the failed check and
/// never include token material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTokenError {
    #[error("missing bearer token")]
    MissingBearer,
    #[error("malformed token")]
    Malformed,
    #[error("the token signature is invalid")]
    Signature,
    #[error("the token algorithm is not accepted")]
    Algorithm,
    #[error("the token signing key is not recognised")]
    UnknownKey,
    #[error("the token signing keys could not be retrieved")]
    KeysUnavailable,
    #[error("the token issuer does not match the expected issuer")]
    Issuer,
    #[error("the token has expired")]
    Expired,
    #[error("the token is not yet valid")]
    NotYetValid,
    #[error("the token audience does not match the expected audience")]
    Audience,
    #[error("missing required claim '{0}'")]
    MissingClaim(String),
}

impl From<jsonwebtoken::errors::Error> for InvalidTokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::Signature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => Self::Algorithm,
            ErrorKind::InvalidIssuer => Self::Issuer,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAudience => Self::Audience,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Malformed,
        }
    }
}

impl From<KeyLookupError> for InvalidTokenError {
    fn from(e: KeyLookupError) -> Self {
        match e {
            KeyLookupError::MissingKeyId
            | KeyLookupError::UnknownKey(_)
            | KeyLookupError::InvalidKey { .. } => Self::UnknownKey,
            KeyLookupError::Fetch { .. } | KeyLookupError::InvalidUrl(_) => Self::KeysUnavailable,
        }
    }
}

/// Signing algorithm accepted from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAlgorithm {
    EdDsa,
    Rs256,
}

impl TokenAlgorithm {
    fn algorithm(self) -> Algorithm {
        match self {
            Self::EdDsa => Algorithm::EdDSA,
            Self::Rs256 => Algorithm::RS256,
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EDDSA" => Ok(Self::EdDsa),
            "RS256" => Ok(Self::Rs256),
            _ => Err(()),
        }
    }
}

/// Access token claims after signature/issuer/expiry/audience checks passed.
///
/// NOTE:
/// - `aud` can be a string or an array, so it stays a `Value`.
/// - `roles` is read by the role mapper; absent means `Null`.
/// - `iss`/`sub`/`exp` default so a missing one is reported as that claim, not as a
///   malformed token.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatedClaims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub aud: serde_json::Value,
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub exp: u64,
    #[serde(default)]
    pub nbf: Option<u64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub roles: serde_json::Value,
}

fn audience_contains(aud: &serde_json::Value, expected: &str) -> bool {
    match aud {
        serde_json::Value::String(s) => s == expected,
        serde_json::Value::Array(arr) => arr.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    }
}

#[derive(Clone)]
enum KeySource {
    /// A pinned public key; the token `kid` is ignored.
    Static(DecodingKey),
    Jwks(Arc<JwksKeyStore>),
}

/// Bearer token validator.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenValidator {
    keys: KeySource,
    algorithm: Algorithm,
    validation: Validation,
    expected_audience: String,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = match &self.keys {
            KeySource::Static(_) => "static",
            KeySource::Jwks(_) => "jwks",
        };
        f.debug_struct("TokenValidator")
            .field("keys", &keys)
            .field("validation", &self.validation)
            .field("expected_audience", &self.expected_audience)
            .finish()
    }
}

impl TokenValidator {
    /// Validator pinned to one PEM public key.
    pub fn from_pem(
        public_key_pem: &str,
        algorithm: TokenAlgorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = match algorithm {
            TokenAlgorithm::EdDsa => DecodingKey::from_ed_pem(public_key_pem.as_bytes())?,
            TokenAlgorithm::Rs256 => DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?,
        };
        Ok(Self::with_keys(
            KeySource::Static(key),
            algorithm,
            issuer,
            audience,
            leeway_seconds,
        ))
    }

    /// Validator resolving keys by `kid` from the issuer's JWKS.
    pub fn from_jwks(
        store: JwksKeyStore,
        algorithm: TokenAlgorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Self {
        Self::with_keys(
            KeySource::Jwks(Arc::new(store)),
            algorithm,
            issuer,
            audience,
            leeway_seconds,
        )
    }

    fn with_keys(
        keys: KeySource,
        algorithm: TokenAlgorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Self {
        let algorithm = algorithm.algorithm();
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;
        // Audience is checked separately so a mismatch always reports `Audience`.
        validation.validate_aud = false;

        Self {
            keys,
            algorithm,
            validation,
            expected_audience: audience.to_string(),
        }
    }

    /// Verify signature, issuer, expiry and audience. Any single failure rejects.
    pub async fn validate(&self, token: &str) -> Result<ValidatedClaims, InvalidTokenError> {
        let header = jsonwebtoken::decode_header(token)?;
        // Before any key lookup, so foreign algorithms never cause a JWKS fetch.
        if header.alg != self.algorithm {
            return Err(InvalidTokenError::Algorithm);
        }

        let key = match &self.keys {
            KeySource::Static(key) => Cow::Borrowed(key),
            KeySource::Jwks(store) => match store.decoding_key(header.kid.as_deref()).await {
                Ok(key) => Cow::Owned(key),
                Err(e) => {
                    tracing::warn!(error = %e, "signing key lookup failed");
                    return Err(e.into());
                }
            },
        };

        let data = jsonwebtoken::decode::<ValidatedClaims>(token, &key, &self.validation)?;
        let claims = data.claims;

        if claims.sub.trim().is_empty() {
            return Err(InvalidTokenError::MissingClaim("sub".to_string()));
        }
        if !audience_contains(&claims.aud, &self.expected_audience) {
            return Err(InvalidTokenError::Audience);
        }

        Ok(claims)
    }
}
