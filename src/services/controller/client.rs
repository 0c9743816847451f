use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::services::auth::ServiceTokenProvider;
use crate::services::controller::{
    error::DownstreamError,
    model::{ScanResponse, is_valid_scan_id},
};

#[async_trait]
pub trait ScanController: Send + Sync {
    async fn force_close_scan(&self, scan_id: &str) -> Result<ScanResponse, DownstreamError>;

    async fn get_scan(&self, scan_id: &str) -> Result<ScanResponse, DownstreamError>;
}

/// HTTP client for ControllerApp.
///
/// - Each call asks the token provider for the service token (cached until expiry).
/// - Error statuses become `DownstreamError::Status` with the body preserved.
#[derive(Clone, Debug)]
pub struct HttpControllerClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<ServiceTokenProvider>,
}

impl HttpControllerClient {
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        tokens: Arc<ServiceTokenProvider>,
    ) -> Result<Self, DownstreamError> {
        if base_url.cannot_be_a_base() {
            return Err(DownstreamError::InvalidUrl);
        }
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    // {base}/api/scan/{scanId}[/{suffix}], scan id encoded as one segment
    fn scan_url(&self, scan_id: &str, suffix: Option<&str>) -> Result<Url, DownstreamError> {
        if !is_valid_scan_id(scan_id) {
            return Err(DownstreamError::InvalidScanId);
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DownstreamError::InvalidUrl)?;
            segments.pop_if_empty().extend(["api", "scan", scan_id]);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<ScanResponse, DownstreamError> {
        let token = self.tokens.get_token().await?;

        let res = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(DownstreamError::from_transport)?;

        let status = res.status();
        if status.is_client_error() || status.is_server_error() {
            let body = match res.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "failed to read ControllerApp error body");
                    String::new()
                }
            };
            return Err(DownstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        res.json::<ScanResponse>().await.map_err(|e| {
            if e.is_timeout() {
                DownstreamError::Timeout
            } else {
                DownstreamError::Decode(e.to_string())
            }
        })
    }
}

#[async_trait]
impl ScanController for HttpControllerClient {
    async fn force_close_scan(&self, scan_id: &str) -> Result<ScanResponse, DownstreamError> {
        debug!(scan_id, "calling ControllerApp to force-close scan");
        let url = self.scan_url(scan_id, Some("force-close"))?;
        self.send(self.http.post(url)).await
    }

    async fn get_scan(&self, scan_id: &str) -> Result<ScanResponse, DownstreamError> {
        debug!(scan_id, "calling ControllerApp to get scan");
        let url = self.scan_url(scan_id, None)?;
        self.send(self.http.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::service_token::{
        AuthorizeRequest, CredentialError, CredentialExchange, ServiceCredential,
    };

    struct NoExchange;

    #[async_trait]
    impl CredentialExchange for NoExchange {
        async fn acquire(
            &self,
            _: &AuthorizeRequest,
        ) -> Result<Option<ServiceCredential>, CredentialError> {
            Ok(None)
        }
    }

    fn client(base: &str) -> HttpControllerClient {
        let tokens = Arc::new(ServiceTokenProvider::new(
            Arc::new(NoExchange),
            chrono::Duration::seconds(60),
        ));
        HttpControllerClient::new(reqwest::Client::new(), Url::parse(base).unwrap(), tokens)
            .unwrap()
    }

    #[test]
    fn builds_scan_urls_under_base_path() {
        let c = client("https://controller.internal/base/");
        assert_eq!(
            c.scan_url("scan-42", Some("force-close")).unwrap().as_str(),
            "https://controller.internal/base/api/scan/scan-42/force-close"
        );
        assert_eq!(
            c.scan_url("scan-42", None).unwrap().as_str(),
            "https://controller.internal/base/api/scan/scan-42"
        );
    }

    #[test]
    fn scan_id_is_a_single_encoded_segment() {
        let c = client("https://controller.internal");
        let url = c.scan_url("../admin?x=1", None).unwrap();
        assert_eq!(url.path(), "/api/scan/..%2Fadmin%3Fx=1");
        assert!(url.query().is_none());
    }

    #[test]
    fn dot_segment_scan_ids_are_refused() {
        let c = client("https://controller.internal");
        for id in [".", ".."] {
            assert!(matches!(
                c.scan_url(id, None),
                Err(DownstreamError::InvalidScanId)
            ));
            assert!(matches!(
                c.scan_url(id, Some("force-close")),
                Err(DownstreamError::InvalidScanId)
            ));
        }
        assert_eq!(
            c.scan_url("...", None).unwrap().path(),
            "/api/scan/..."
        );
    }

    #[tokio::test]
    async fn credential_failure_surfaces_before_any_request() {
        let c = client("http://127.0.0.1:9");
        let err = c.get_scan("scan-1").await.unwrap_err();
        assert!(matches!(
            err,
            DownstreamError::Credential(CredentialError::NoCredential(_))
        ));
    }
}
