//! Signing service HTTP client

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::{check_response, json_with_limit, DeliveryClientError};
use crate::http::shared_client;

use super::types::{SignedUrl, SignedUrlResponse};

/// Client for the signing service.
///
/// Performs exactly one network call per `issue`; retry policy belongs to
/// the caller so the client can be tested in isolation.
#[derive(Debug, Clone)]
pub struct SigningClient {
    base_url: Url,
    request_timeout: Duration,
    client: Client,
}

impl SigningClient {
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a new signing client (reuses the shared connection pool).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, DeliveryClientError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| DeliveryClientError::InvalidConfig(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DeliveryClientError::InvalidConfig(
                "base URL cannot be a base".to_string(),
            ));
        }
        Ok(Self {
            base_url,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            client: shared_client(),
        })
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Mint a signed URL for `content_id`.
    ///
    /// `ttl_secs` is a hint only; the response's `expiresAt` is
    /// authoritative. Non-2xx responses and malformed payloads both fail.
    pub async fn issue(
        &self,
        content_id: &str,
        ttl_secs: u64,
    ) -> Result<SignedUrl, DeliveryClientError> {
        let url = self.issue_url(content_id, ttl_secs)?;

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = check_response(response).await?;
        let body: SignedUrlResponse = json_with_limit(response).await?;
        let signed = SignedUrl::try_from(body)?;

        tracing::debug!(
            content_id = %content_id,
            expires_at = %signed.expires_at,
            "Signed URL issued"
        );

        Ok(signed)
    }

    fn issue_url(&self, content_id: &str, ttl_secs: u64) -> Result<Url, DeliveryClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DeliveryClientError::InvalidConfig("base URL cannot be a base".to_string())
            })?
            .pop_if_empty()
            .extend(["signed-url", content_id]);
        url.query_pairs_mut()
            .append_pair("ttlSeconds", &ttl_secs.to_string());
        Ok(url)
    }
}
