//! Content references
//!
//! The logical identity of a piece of course content, independent of the
//! storage backend it is delivered from.

use serde::{Deserialize, Serialize};

/// Which delivery path the caller would prefer, when a choice exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredPath {
    /// Prefer the managed adaptive stream.
    Stream,
    /// Prefer the private-object gateway.
    Gateway,
    /// Let the resolver decide (gateway-first when both exist).
    #[default]
    Auto,
}

/// Immutable input to a playback session.
///
/// Carries every identifier the resolver may consult: the platform-level
/// content id (used for progress reporting), an optional managed-stream id,
/// and an optional private-object CID. The resolver is pure and
/// synchronous, so everything it needs must live on the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReference {
    pub content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_cid: Option<String>,
    #[serde(default)]
    pub preferred_path: PreferredPath,
}

impl ContentReference {
    #[must_use]
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            stream_id: None,
            object_cid: None,
            preferred_path: PreferredPath::Auto,
        }
    }

    #[must_use]
    pub fn with_stream_id(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = Some(stream_id.into());
        self
    }

    #[must_use]
    pub fn with_object_cid(mut self, object_cid: impl Into<String>) -> Self {
        self.object_cid = Some(object_cid.into());
        self
    }

    #[must_use]
    pub const fn with_preferred_path(mut self, preferred_path: PreferredPath) -> Self {
        self.preferred_path = preferred_path;
        self
    }

    #[must_use]
    pub const fn has_stream_source(&self) -> bool {
        self.stream_id.is_some()
    }

    #[must_use]
    pub const fn has_gateway_source(&self) -> bool {
        self.object_cid.is_some()
    }
}
