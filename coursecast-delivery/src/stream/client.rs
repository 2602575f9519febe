//! Stream-source service HTTP client

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::{check_response, json_with_limit, DeliveryClientError};
use crate::http::shared_client;

use super::types::{StreamSource, StreamSourcesResponse};

/// Client for the stream-source service.
///
/// Returns the service's ranked source list as-is; candidate selection and
/// fallback ordering happen in the session core.
#[derive(Debug, Clone)]
pub struct StreamSourceClient {
    base_url: Url,
    request_timeout: Duration,
    client: Client,
}

impl StreamSourceClient {
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a new stream-source client (reuses the shared connection pool).
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

    /// Fetch the ranked playable sources for `stream_id`.
    ///
    /// An empty list is treated as a service fault: the caller asked for a
    /// stream the service claims to know nothing playable about.
    pub async fn sources(
        &self,
        stream_id: &str,
    ) -> Result<Vec<StreamSource>, DeliveryClientError> {
        let url = self.sources_url(stream_id)?;

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = check_response(response).await?;
        let body: StreamSourcesResponse = json_with_limit(response).await?;

        if body.sources.is_empty() {
            return Err(DeliveryClientError::Api {
                status: 200,
                message: format!("no playable sources for stream {stream_id}"),
            });
        }

        let sources = body
            .sources
            .into_iter()
            .map(StreamSource::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            stream_id = %stream_id,
            count = sources.len(),
            "Stream sources fetched"
        );

        Ok(sources)
    }

    fn sources_url(&self, stream_id: &str) -> Result<Url, DeliveryClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DeliveryClientError::InvalidConfig("base URL cannot be a base".to_string())
            })?
            .pop_if_empty()
            .extend(["stream-source", stream_id]);
        Ok(url)
    }
}
