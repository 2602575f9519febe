//! Shared delivery client error types
//!
//! Common error enum and response utilities used by all delivery clients
//! (signing, stream-source, progress).

use serde::Deserialize;
use thiserror::Error;

/// Maximum response body size for delivery HTTP calls (1 MB).
/// The services return small JSON payloads; anything larger indicates a
/// misconfigured or hostile upstream.
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Common error type for all delivery HTTP clients.
#[derive(Debug, Error)]
pub enum DeliveryClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Response too large ({size} bytes, max {MAX_RESPONSE_SIZE})")]
    ResponseTooLarge { size: u64 },
}

/// Error body returned by the delivery services on 4xx/5xx.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: String,
}

/// Read a response body with size limit and deserialize as JSON.
///
/// Checks the `Content-Length` hint first (if available), then enforces the
/// limit on the actual body bytes before deserializing.
pub async fn json_with_limit<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, DeliveryClientError> {
    if let Some(cl) = response.content_length() {
        if cl as usize > MAX_RESPONSE_SIZE {
            return Err(DeliveryClientError::ResponseTooLarge { size: cl });
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(DeliveryClientError::ResponseTooLarge {
            size: bytes.len() as u64,
        });
    }
    serde_json::from_slice(&bytes).map_err(Into::into)
}

/// Check HTTP response status before processing the body.
///
/// On 4xx/5xx, attempts to parse the service's `{"error": ...}` body and
/// falls back to the status line when the body is not usable.
pub async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, DeliveryClientError> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        let message = match json_with_limit::<ApiErrorBody>(resp).await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        return Err(DeliveryClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

impl From<reqwest::Error> for DeliveryClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DeliveryClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
