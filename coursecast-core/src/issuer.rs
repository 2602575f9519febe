//! Credential issuing seam
//!
//! The session core never talks to the delivery services directly; it goes
//! through [`CredentialIssuer`] so the renewal scheduler and session setup
//! can be tested against a mock. The production implementation routes each
//! candidate to the matching delivery client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use coursecast_delivery::{SigningClient, StreamSourceClient};

use crate::config::DeliveryConfig;
use crate::models::{CandidateSource, Credential, SourceKind};
use crate::resilience::retry::BackoffPolicy;
use crate::{Error, Result};

/// Mint a credential for one candidate delivery path.
///
/// Implementations perform exactly one round of network calls per
/// invocation; retry policy belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue_for(&self, candidate: &CandidateSource, ttl_secs: u64) -> Result<Credential>;
}

/// Production issuer over the delivery clients.
#[derive(Debug, Clone)]
pub struct DeliveryIssuer {
    signing: SigningClient,
    stream: StreamSourceClient,
}

impl DeliveryIssuer {
    #[must_use]
    pub const fn new(signing: SigningClient, stream: StreamSourceClient) -> Self {
        Self { signing, stream }
    }

    /// Build both clients from configuration.
    pub fn from_config(config: &DeliveryConfig) -> Result<Self> {
        let signing = SigningClient::new(&config.signing_url)
            .map_err(Error::from)?
            .with_request_timeout(config.request_timeout());
        let stream = StreamSourceClient::new(&config.stream_source_url)
            .map_err(Error::from)?
            .with_request_timeout(config.request_timeout());
        Ok(Self::new(signing, stream))
    }
}

#[async_trait]
impl CredentialIssuer for DeliveryIssuer {
    async fn issue_for(&self, candidate: &CandidateSource, ttl_secs: u64) -> Result<Credential> {
        match candidate.source_kind {
            SourceKind::Gateway => {
                let signed = self.signing.issue(&candidate.resolver_hint, ttl_secs).await?;
                Credential::new(
                    signed.url,
                    Utc::now(),
                    Some(signed.expires_at),
                    SourceKind::Gateway,
                )
            }
            SourceKind::Stream => {
                let sources = self.stream.sources(&candidate.resolver_hint).await?;
                // The service ranks its own sources; the head is the one to play.
                let source = sources.into_iter().next().ok_or_else(|| Error::Signing {
                    status: 200,
                    message: "stream source service returned no sources".to_string(),
                })?;
                Credential::new(source.url, Utc::now(), source.expires_at, SourceKind::Stream)
            }
        }
    }
}

/// Issue a credential with setup semantics: transient network failures are
/// retried under the bounded backoff, service rejections fail immediately
/// (there is no prior credential covering playback yet).
pub(crate) async fn issue_with_backoff(
    issuer: &dyn CredentialIssuer,
    candidate: &CandidateSource,
    ttl_secs: u64,
    policy: BackoffPolicy,
    cancel: &CancellationToken,
) -> Result<Credential> {
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Internal(
                "session torn down during credential issue".to_string(),
            ));
        }

        let result = tokio::select! {
            () = cancel.cancelled() => {
                return Err(Error::Internal(
                    "session torn down during credential issue".to_string(),
                ));
            }
            result = issuer.issue_for(candidate, ttl_secs) => result,
        };

        match result {
            Ok(credential) => return Ok(credential),
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    source_kind = %candidate.source_kind,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Credential issue failed, retrying"
                );
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(Error::Internal(
                            "session torn down during credential issue".to_string(),
                        ));
                    }
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
