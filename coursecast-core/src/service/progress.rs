//! Progress reporting
//!
//! Watch position and completion reports to the progress-tracking
//! collaborator. Strictly best-effort: failures are logged and never
//! propagate into playback state.

use async_trait::async_trait;

use coursecast_delivery::ProgressClient;

use crate::config::DeliveryConfig;
use crate::{Error, Result};

/// Sink for playback telemetry.
///
/// Methods are infallible on purpose: implementations absorb and log their
/// own failures, so callers cannot accidentally couple playback to them.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report_position(&self, content_id: &str, position_secs: f64);
    async fn report_completion(&self, content_id: &str);
}

/// HTTP sink over the progress collaborator.
#[derive(Debug, Clone)]
pub struct HttpProgressSink {
    client: ProgressClient,
}

impl HttpProgressSink {
    #[must_use]
    pub const fn new(client: ProgressClient) -> Self {
        Self { client }
    }

    /// Build from configuration. `Ok(None)` when no collaborator endpoint
    /// is configured.
    pub fn from_config(config: &DeliveryConfig) -> Result<Option<Self>> {
        let Some(url) = &config.progress_url else {
            return Ok(None);
        };
        let client = ProgressClient::new(url)
            .map_err(Error::from)?
            .with_request_timeout(config.progress_timeout());
        Ok(Some(Self::new(client)))
    }
}

#[async_trait]
impl ProgressSink for HttpProgressSink {
    async fn report_position(&self, content_id: &str, position_secs: f64) {
        if let Err(e) = self.client.report_position(content_id, position_secs).await {
            tracing::warn!(
                content_id = %content_id,
                position_secs,
                error = %e,
                "Failed to report watch position"
            );
        }
    }

    async fn report_completion(&self, content_id: &str) {
        if let Err(e) = self.client.report_completion(content_id).await {
            tracing::warn!(
                content_id = %content_id,
                error = %e,
                "Failed to report completion"
            );
        }
    }
}

/// Sink for embedders that do not track progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn report_position(&self, _content_id: &str, _position_secs: f64) {}
    async fn report_completion(&self, _content_id: &str) {}
}
