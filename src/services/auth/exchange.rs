//! Client-credentials exchange against the identity provider's token endpoint.
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::services::auth::service_token::{
    AuthorizeRequest, CredentialError, CredentialExchange, ServiceCredential,
};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECONDS: i64 = 300;

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// `grant_type=client_credentials` over a form POST.
#[derive(Clone)]
pub struct ClientCredentialsExchange {
    http: reqwest::Client,
    token_endpoint: Url,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
}

impl std::fmt::Debug for ClientCredentialsExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the client secret
        f.debug_struct("ClientCredentialsExchange")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish()
    }
}

impl ClientCredentialsExchange {
    pub fn new(
        http: reqwest::Client,
        token_endpoint: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: Option<String>,
    ) -> Self {
        Self {
            http,
            token_endpoint,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope,
        }
    }
}

#[async_trait]
impl CredentialExchange for ClientCredentialsExchange {
    async fn acquire(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<Option<ServiceCredential>, CredentialError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = self.scope.as_deref() {
            form.push(("scope", scope));
        }

        let issued_at = Utc::now();
        let res = self
            .http
            .post(self.token_endpoint.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| CredentialError::Exchange(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            warn!(
                registration_id = %request.registration_id,
                status = status.as_u16(),
                "token endpoint rejected client credentials"
            );
            return Err(CredentialError::Exchange(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: TokenEndpointResponse = res
            .json()
            .await
            .map_err(|e| CredentialError::Exchange(e.to_string()))?;

        let Some(access_token) = body.access_token else {
            return Ok(None);
        };
        let expires_in = body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS);
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                CredentialError::Exchange(format!(
                    "token endpoint returned an out-of-range expires_in ({expires_in})"
                ))
            })?;

        Ok(Some(ServiceCredential::new(access_token, expires_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn exchange(server: &Server) -> ClientCredentialsExchange {
        let endpoint = Url::parse(&format!("{}/oauth2/v2.0/token", server.url())).unwrap();
        ClientCredentialsExchange::new(
            reqwest::Client::new(),
            endpoint,
            "admin-backend-client",
            "s3cr3t",
            Some("api://controller-app/.default".into()),
        )
    }

    #[tokio::test]
    async fn test_posts_client_credentials_form() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "admin-backend-client".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cr3t".into()),
                Matcher::UrlEncoded("scope".into(), "api://controller-app/.default".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"svc-token","token_type":"Bearer","expires_in":3599}"#)
            .create_async()
            .await;

        let before = Utc::now();
        let cred = exchange(&server)
            .acquire(&AuthorizeRequest::controller_app())
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(cred.token_value(), "svc-token");
        assert!(cred.expires_at() >= before + Duration::seconds(3599));
        assert!(cred.expires_at() <= Utc::now() + Duration::seconds(3599));
    }

    #[tokio::test]
    async fn test_missing_access_token_is_no_credential() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/oauth2/v2.0/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let cred = exchange(&server)
            .acquire(&AuthorizeRequest::controller_app())
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_exchange_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let err = exchange(&server)
            .acquire(&AuthorizeRequest::controller_app())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Exchange(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_out_of_range_expires_in_is_exchange_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/oauth2/v2.0/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access_token":"svc-token","expires_in":{}}}"#,
                i64::MAX
            ))
            .create_async()
            .await;

        let err = exchange(&server)
            .acquire(&AuthorizeRequest::controller_app())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Exchange(msg) if msg.contains("expires_in")));
    }
}
