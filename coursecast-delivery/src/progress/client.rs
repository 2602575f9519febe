//! Progress collaborator HTTP client

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{check_response, DeliveryClientError};
use crate::http::shared_client;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PositionReport {
    position_seconds: f64,
}

/// Client for the progress-tracking collaborator.
#[derive(Debug, Clone)]
pub struct ProgressClient {
    base_url: Url,
    request_timeout: Duration,
    client: Client,
}

impl ProgressClient {
    /// Progress reports are fire-and-forget; keep the timeout short so a
    /// slow collaborator never delays session teardown.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a new progress client (reuses the shared connection pool).
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

    /// Report the current watch position for `content_id`.
    pub async fn report_position(
        &self,
        content_id: &str,
        position_seconds: f64,
    ) -> Result<(), DeliveryClientError> {
        let url = self.progress_url(content_id, None)?;
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(&PositionReport { position_seconds })
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    /// Report that playback of `content_id` reached end-of-media.
    pub async fn report_completion(&self, content_id: &str) -> Result<(), DeliveryClientError> {
        let url = self.progress_url(content_id, Some("complete"))?;
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    fn progress_url(
        &self,
        content_id: &str,
        action: Option<&str>,
    ) -> Result<Url, DeliveryClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                DeliveryClientError::InvalidConfig("base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty().extend(["progress", content_id]);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }
}
