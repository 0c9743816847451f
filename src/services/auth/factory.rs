//! Factory: build auth services from application `Config`.
use std::sync::Arc;

use url::Url;

use crate::config::{Config, ConfigError};
use crate::services::auth::{
    JwksKeyStore, ServiceTokenProvider, TokenValidator, exchange::ClientCredentialsExchange,
};

/// A configured PEM pins one key; otherwise keys come from the issuer's JWKS.
pub fn build_token_validator(
    config: &Config,
    http: reqwest::Client,
) -> Result<Arc<TokenValidator>, ConfigError> {
    let validator = match &config.auth_jwt_public_key_pem {
        Some(pem) => TokenValidator::from_pem(
            pem,
            config.auth_jwt_algorithm,
            &config.auth_issuer,
            &config.auth_audience,
            config.access_token_leeway_seconds,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "failed to parse access token public key PEM");
            ConfigError::Invalid("AUTH_JWT_PUBLIC_KEY_PEM")
        })?,
        None => {
            let issuer =
                Url::parse(&config.auth_issuer).map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?;
            let store = JwksKeyStore::new(http, &issuer, config.auth_jwks_uri.clone())
                .map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?
                .with_cache_ttl(config.auth_jwks_cache_ttl);
            tracing::info!(issuer = %issuer, "access token keys resolved from JWKS");

            TokenValidator::from_jwks(
                store,
                config.auth_jwt_algorithm,
                &config.auth_issuer,
                &config.auth_audience,
                config.access_token_leeway_seconds,
            )
        }
    };

    Ok(Arc::new(validator))
}

pub fn build_service_token_provider(
    config: &Config,
    http: reqwest::Client,
) -> Arc<ServiceTokenProvider> {
    let exchange = ClientCredentialsExchange::new(
        http,
        config.service_token_endpoint.clone(),
        config.service_client_id.clone(),
        config.service_client_secret.clone(),
        config.service_token_scope.clone(),
    );

    Arc::new(ServiceTokenProvider::new(
        Arc::new(exchange),
        config.service_token_clock_skew,
    ))
}
