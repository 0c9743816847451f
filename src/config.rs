/*
 * Responsibility
 * - 環境変数や設定の読み込み (issuer / audience / 下流 URL / サービストークン設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::auth::access_jwt::TokenAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub request_timeout: Duration,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_jwt_algorithm: TokenAlgorithm,
    /// Pins a single key and disables JWKS lookup when set.
    pub auth_jwt_public_key_pem: Option<String>,
    /// Skips OIDC discovery when set.
    pub auth_jwks_uri: Option<Url>,
    pub auth_jwks_cache_ttl: Duration,
    pub access_token_leeway_seconds: u64,

    pub controller_app_base_url: Url,
    pub controller_app_timeout: Duration,

    pub service_token_endpoint: Url,
    pub service_client_id: String,
    pub service_client_secret: String,
    pub service_token_scope: Option<String>,
    pub service_token_clock_skew: chrono::Duration,

    pub audit_log_path: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the client secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("auth_issuer", &self.auth_issuer)
            .field("auth_audience", &self.auth_audience)
            .field("auth_jwks_uri", &self.auth_jwks_uri.as_ref().map(Url::as_str))
            .field("controller_app_base_url", &self.controller_app_base_url.as_str())
            .field("service_token_endpoint", &self.service_token_endpoint.as_str())
            .field("service_client_id", &self.service_client_id)
            .field("audit_log_path", &self.audit_log_path)
            .finish_non_exhaustive()
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional(key: &'static str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Unset → default, set but unparsable → Invalid
fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn url(key: &'static str) -> Result<Url, ConfigError> {
    Url::parse(&required(key)?).map_err(|_| ConfigError::Invalid(key))
}

fn optional_url(key: &'static str) -> Result<Option<Url>, ConfigError> {
    optional(key)
        .map(|v| Url::parse(&v).map_err(|_| ConfigError::Invalid(key)))
        .transpose()
}

fn clock_skew(seconds: i64) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::try_seconds(seconds)
        .ok_or(ConfigError::Invalid("SERVICE_TOKEN_CLOCK_SKEW_SECONDS"))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = parsed_or("PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();
        let request_timeout = Duration::from_secs(parsed_or("REQUEST_TIMEOUT_SECONDS", 30)?);

        let auth_issuer = required("AUTH_ISSUER")?;
        let auth_audience = required("AUTH_AUDIENCE")?;
        let auth_jwt_algorithm = parsed_or("AUTH_JWT_ALGORITHM", TokenAlgorithm::EdDsa)?;
        let auth_jwt_public_key_pem =
            optional("AUTH_JWT_PUBLIC_KEY_PEM").map(|pem| pem.replace("\\n", "\n"));
        let auth_jwks_uri = optional_url("AUTH_JWKS_URI")?;
        let auth_jwks_cache_ttl =
            Duration::from_secs(parsed_or("AUTH_JWKS_CACHE_TTL_SECONDS", 300)?);
        let access_token_leeway_seconds = parsed_or("ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        let controller_app_base_url = url("CONTROLLER_APP_BASE_URL")?;
        let controller_app_timeout =
            Duration::from_secs(parsed_or("CONTROLLER_APP_TIMEOUT_SECONDS", 10)?);

        let service_token_endpoint = url("SERVICE_TOKEN_ENDPOINT")?;
        let service_client_id = required("SERVICE_CLIENT_ID")?;
        let service_client_secret = required("SERVICE_CLIENT_SECRET")?;
        let service_token_scope = optional("SERVICE_TOKEN_SCOPE");
        let service_token_clock_skew = clock_skew(parsed_or("SERVICE_TOKEN_CLOCK_SKEW_SECONDS", 60)?)?;

        let audit_log_path = optional("AUDIT_LOG_PATH").map(PathBuf::from);

        Ok(Self {
            addr,
            app_env,
            request_timeout,
            auth_issuer,
            auth_audience,
            auth_jwt_algorithm,
            auth_jwt_public_key_pem,
            auth_jwks_uri,
            auth_jwks_cache_ttl,
            access_token_leeway_seconds,
            controller_app_base_url,
            controller_app_timeout,
            service_token_endpoint,
            service_client_id,
            service_client_secret,
            service_token_scope,
            service_token_clock_skew,
            audit_log_path,
        })
    }
}
