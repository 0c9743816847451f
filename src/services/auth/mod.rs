pub mod access_jwt;
pub mod authorize;
pub mod exchange;
pub mod factory;
pub mod identity;
pub mod jwks;
pub mod roles;
pub mod service_token;

pub use access_jwt::{InvalidTokenError, TokenValidator, ValidatedClaims};
pub use authorize::{AuthorizationDeniedError, Role, require_role};
pub use factory::{build_service_token_provider, build_token_validator};
pub use identity::ValidatedIdentity;
pub use jwks::JwksKeyStore;
pub use service_token::{CredentialError, ServiceTokenProvider};
