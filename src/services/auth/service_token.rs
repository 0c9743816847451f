//! Cached client-credentials token for calling ControllerApp.
//!
//! Policy:
//! - cached + not expired → reuse
//! - absent or expired → acquire synchronously, replace wholesale, return the new value
//!
//! Concurrent callers that all see an expired credential may each acquire; the cache
//! keeps whichever credential expires last, so a fresher token is never displaced.
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub const REGISTRATION_ID: &str = "controller-app";
pub const PRINCIPAL_NAME: &str = "admin-app-backend";

#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    token_value: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the token
        f.debug_struct("ServiceCredential")
            .field("token", &fingerprint(&self.token_value))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl ServiceCredential {
    pub fn new(token_value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_value: token_value.into(),
            expires_at,
        }
    }

    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now + skew >= self.expires_at
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no service credential returned for registration '{0}'")]
    NoCredential(String),
    #[error("service credential for registration '{0}' has no token value")]
    EmptyToken(String),
    #[error("service credential for registration '{0}' was already expired when acquired")]
    ExpiredOnArrival(String),
    #[error("client credentials exchange failed: {0}")]
    Exchange(String),
}

/// Cache key: which registration, on behalf of which (synthetic) principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizeRequest {
    pub registration_id: String,
    pub principal: String,
}

impl AuthorizeRequest {
    pub fn controller_app() -> Self {
        Self {
            registration_id: REGISTRATION_ID.to_string(),
            principal: PRINCIPAL_NAME.to_string(),
        }
    }
}

/// The external identity-provider exchange.
///
/// Returns:
/// - `Ok(Some(_))` a credential was issued
/// - `Ok(None)`    the provider answered without a credential
/// - `Err(_)`      transport / protocol failure
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn acquire(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<Option<ServiceCredential>, CredentialError>;
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ServiceTokenProvider {
    exchange: Arc<dyn CredentialExchange>,
    cached: RwLock<HashMap<AuthorizeRequest, Arc<ServiceCredential>>>,
    clock_skew: Duration,
    clock: Clock,
}

impl std::fmt::Debug for ServiceTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTokenProvider")
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl ServiceTokenProvider {
    pub fn new(exchange: Arc<dyn CredentialExchange>, clock_skew: Duration) -> Self {
        Self::with_clock(exchange, clock_skew, Arc::new(Utc::now))
    }

    pub fn with_clock(
        exchange: Arc<dyn CredentialExchange>,
        clock_skew: Duration,
        clock: Clock,
    ) -> Self {
        Self {
            exchange,
            cached: RwLock::new(HashMap::new()),
            clock_skew,
            clock,
        }
    }

    /// Token for the ControllerApp registration.
    pub async fn get_token(&self) -> Result<String, CredentialError> {
        self.get_token_for(&AuthorizeRequest::controller_app()).await
    }

    pub async fn get_token_for(&self, request: &AuthorizeRequest) -> Result<String, CredentialError> {
        let now = (self.clock)();

        if let Some(cached) = self.cached.read().await.get(request)
            && !cached.is_expired_at(now, self.clock_skew)
        {
            return Ok(cached.token_value().to_string());
        }

        let fresh = self.acquire(request).await?;
        let token = fresh.token_value().to_string();

        let mut cached = self.cached.write().await;
        match cached.get(request) {
            Some(existing) if existing.expires_at() > fresh.expires_at() => {}
            _ => {
                cached.insert(request.clone(), fresh);
            }
        }

        Ok(token)
    }

    async fn acquire(&self, request: &AuthorizeRequest) -> Result<Arc<ServiceCredential>, CredentialError> {
        let credential = self
            .exchange
            .acquire(request)
            .await?
            .ok_or_else(|| CredentialError::NoCredential(request.registration_id.clone()))?;

        if credential.token_value().trim().is_empty() {
            return Err(CredentialError::EmptyToken(request.registration_id.clone()));
        }
        if credential.expires_at() <= (self.clock)() {
            return Err(CredentialError::ExpiredOnArrival(
                request.registration_id.clone(),
            ));
        }

        debug!(
            registration_id = %request.registration_id,
            expires_at = %credential.expires_at(),
            token_fp = %fingerprint(credential.token_value()),
            "service token obtained"
        );

        Ok(Arc::new(credential))
    }
}

/// Short, non-reversible token fingerprint for logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..8])
}
