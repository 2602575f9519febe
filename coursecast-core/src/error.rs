use coursecast_delivery::DeliveryClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Content reference carries neither a stream nor a gateway identifier.
    /// Fatal and non-retryable; surfaced to the UI immediately.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The signing or stream-source service rejected the request, or
    /// returned a payload the client could not use.
    #[error("Signing error (status {status}): {message}")]
    Signing { status: u16, message: String },

    /// Timeout or connection failure. Always retried under bounded backoff.
    #[error("Network error: {0}")]
    Network(String),

    /// The media surface cannot decode or play the resolved URL.
    /// Triggers candidate fallback rather than a retry of the same URL.
    #[error("Playback error: {0}")]
    Playback(String),

    /// Renewal exhausted its attempts, or the hard expiry passed first.
    #[error("Credential expired: {0}")]
    CredentialExpired(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Transient failures are retried under the bounded backoff; everything
    /// else either falls back to another candidate or is fatal.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the renewal loop may retry this error while a still-valid
    /// credential covers playback. Signing rejections qualify only in that
    /// covered window; network errors always do.
    #[must_use]
    pub const fn is_retryable_while_covered(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Signing { .. })
    }
}

impl From<DeliveryClientError> for Error {
    fn from(err: DeliveryClientError) -> Self {
        match err {
            DeliveryClientError::Api { status, message } => Self::Signing { status, message },
            // A 2xx with an unusable body is a service-side fault, not a
            // transient condition: retrying the same call replays it.
            DeliveryClientError::Parse(msg) => Self::Signing {
                status: 200,
                message: format!("malformed payload: {msg}"),
            },
            DeliveryClientError::ResponseTooLarge { size } => Self::Signing {
                status: 200,
                message: format!("response too large ({size} bytes)"),
            },
            DeliveryClientError::Timeout => Self::Network("request timed out".to_string()),
            DeliveryClientError::Network(msg) => Self::Network(msg),
            DeliveryClientError::InvalidConfig(msg) => Self::Configuration(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
