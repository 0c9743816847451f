//! Signing keys published by the identity provider (JWKS).
//!
//! The key set location is either configured directly or found through OIDC discovery
//! on the issuer (`{issuer}/.well-known/openid-configuration`). Keys are cached for a
//! TTL. A token naming a `kid` missing from the cache triggers an early refetch, so key
//! rotation at the IdP needs no restart.
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

pub const DISCOVERY_PATH: &str = ".well-known/openid-configuration";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Unknown `kid`s refetch the key set at most once per interval.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum KeyLookupError {
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("no signing key with id '{0}'")]
    UnknownKey(String),
    #[error("signing key '{kid}' is unusable: {source}")]
    InvalidKey {
        kid: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid {0} url")]
    InvalidUrl(&'static str),
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

pub struct JwksKeyStore {
    http: reqwest::Client,
    discovery_url: Url,
    jwks_uri: RwLock<Option<Url>>,
    cached: RwLock<Option<CachedKeys>>,
    // Serializes refetches; waiters re-check the cache after acquiring it.
    refresh: Mutex<()>,
    ttl: Duration,
    min_refresh_interval: Duration,
}

impl std::fmt::Debug for JwksKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeyStore")
            .field("discovery_url", &self.discovery_url.as_str())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwksKeyStore {
    /// `jwks_uri` skips discovery when set.
    pub fn new(
        http: reqwest::Client,
        issuer: &Url,
        jwks_uri: Option<Url>,
    ) -> Result<Self, KeyLookupError> {
        let discovery_url = Url::parse(&format!(
            "{}/{DISCOVERY_PATH}",
            issuer.as_str().trim_end_matches('/')
        ))
        .map_err(|_| KeyLookupError::InvalidUrl("discovery"))?;

        Ok(Self {
            http,
            discovery_url,
            jwks_uri: RwLock::new(jwks_uri),
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
            ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, KeyLookupError> {
        let kid = kid.ok_or(KeyLookupError::MissingKeyId)?;

        if let Some(jwk) = self.cached_key(kid, true).await {
            return to_decoding_key(kid, &jwk);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(jwk) = self.cached_key(kid, true).await {
            return to_decoding_key(kid, &jwk);
        }

        if self.may_refetch().await {
            if let Err(e) = self.refetch().await {
                if self.cached.read().await.is_none() {
                    return Err(e);
                }
                warn!(error = %e, "JWKS refetch failed, keeping previously fetched keys");
            }
        }

        match self.cached_key(kid, false).await {
            Some(jwk) => to_decoding_key(kid, &jwk),
            None => Err(KeyLookupError::UnknownKey(kid.to_string())),
        }
    }

    async fn cached_key(&self, kid: &str, fresh_only: bool) -> Option<Jwk> {
        let cached = self.cached.read().await;
        let entry = cached.as_ref()?;
        if fresh_only && entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        entry.keys.find(kid).cloned()
    }

    // Stale sets always refetch; fresh ones only after the minimum interval.
    async fn may_refetch(&self) -> bool {
        match self.cached.read().await.as_ref() {
            None => true,
            Some(entry) => {
                let age = entry.fetched_at.elapsed();
                age >= self.ttl || age >= self.min_refresh_interval
            }
        }
    }

    async fn refetch(&self) -> Result<(), KeyLookupError> {
        let jwks_uri = self.jwks_uri().await?;
        let keys: JwkSet = self.fetch_json(jwks_uri, "JWKS").await?;
        debug!(keys = keys.keys.len(), "JWKS fetched");

        *self.cached.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    async fn jwks_uri(&self) -> Result<Url, KeyLookupError> {
        if let Some(uri) = self.jwks_uri.read().await.clone() {
            return Ok(uri);
        }

        let doc: DiscoveryDocument = self
            .fetch_json(self.discovery_url.clone(), "discovery document")
            .await?;
        let uri = Url::parse(&doc.jwks_uri).map_err(|_| KeyLookupError::InvalidUrl("jwks_uri"))?;
        *self.jwks_uri.write().await = Some(uri.clone());
        Ok(uri)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &'static str,
    ) -> Result<T, KeyLookupError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| KeyLookupError::Fetch { what, source })?;
        res.json::<T>()
            .await
            .map_err(|source| KeyLookupError::Fetch { what, source })
    }
}

fn to_decoding_key(kid: &str, jwk: &Jwk) -> Result<DecodingKey, KeyLookupError> {
    DecodingKey::from_jwk(jwk).map_err(|source| KeyLookupError::InvalidKey {
        kid: kid.to_string(),
        source,
    })
}
