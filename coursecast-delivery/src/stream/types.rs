//! Wire types for the stream-source service.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::DeliveryClientError;

/// Raw stream-source service response.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamSourcesResponse {
    pub sources: Vec<StreamSourceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamSourceEntry {
    pub url: String,
    pub mime_type: String,
    /// Unix epoch seconds. Absent for long-lived playback tokens.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// One playable stream source, in service-ranked order.
#[derive(Debug, Clone)]
pub struct StreamSource {
    pub url: String,
    pub mime_type: String,
    /// `None` means the playback token does not expire.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<StreamSourceEntry> for StreamSource {
    type Error = DeliveryClientError;

    fn try_from(entry: StreamSourceEntry) -> Result<Self, Self::Error> {
        if entry.url.is_empty() {
            return Err(DeliveryClientError::Parse(
                "empty stream source url".to_string(),
            ));
        }
        let expires_at = match entry.expires_at {
            Some(ts) => Some(DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                DeliveryClientError::Parse(format!("expiresAt out of range: {ts}"))
            })?),
            None => None,
        };
        Ok(Self {
            url: entry.url,
            mime_type: entry.mime_type,
            expires_at,
        })
    }
}
