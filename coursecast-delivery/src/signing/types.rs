//! Wire types for the signing service.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::DeliveryClientError;

/// Raw signing service response.
///
/// `expiresAt` is unix epoch seconds; it is authoritative over whatever
/// `ttlSeconds` hint was sent with the request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignedUrlResponse {
    pub signed_url: String,
    pub expires_at: i64,
}

/// A minted signed URL together with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<SignedUrlResponse> for SignedUrl {
    type Error = DeliveryClientError;

    fn try_from(resp: SignedUrlResponse) -> Result<Self, Self::Error> {
        if resp.signed_url.is_empty() {
            return Err(DeliveryClientError::Parse("empty signedUrl".to_string()));
        }

        let parsed = Url::parse(&resp.signed_url)
            .map_err(|e| DeliveryClientError::Parse(format!("invalid signedUrl: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DeliveryClientError::Parse(format!(
                "signedUrl must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let expires_at = DateTime::from_timestamp(resp.expires_at, 0).ok_or_else(|| {
            DeliveryClientError::Parse(format!("expiresAt out of range: {}", resp.expires_at))
        })?;

        Ok(Self {
            url: resp.signed_url,
            expires_at,
        })
    }
}
