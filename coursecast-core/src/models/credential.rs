//! Access credentials
//!
//! A credential is a signed URL or playback-session token plus its absolute
//! expiry instant. Credentials are replaced on renewal, never mutated.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Delivery path a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Managed adaptive stream (playback-session token).
    Stream,
    /// Private-object gateway (signed URL).
    Gateway,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Gateway => write!(f, "gateway"),
        }
    }
}

/// A short-lived access credential for one delivery path.
///
/// `expires_at == None` models long-lived stream tokens; such credentials
/// never go stale and the renewal scheduler skips polling for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub url: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub source_kind: SourceKind,
}

impl Credential {
    /// Build a credential, enforcing `expires_at > issued_at` when an
    /// expiry is present.
    pub fn new(
        url: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        source_kind: SourceKind,
    ) -> Result<Self> {
        if let Some(expires_at) = expires_at {
            if expires_at <= issued_at {
                return Err(Error::Internal(format!(
                    "credential expiry {expires_at} is not after issuance {issued_at}"
                )));
            }
        }
        Ok(Self {
            url: url.into(),
            issued_at,
            expires_at,
            source_kind,
        })
    }

    /// Validity at an explicit instant: `now + safety_margin < expires_at`.
    /// Credentials without an expiry are always valid.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, safety_margin: ChronoDuration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + safety_margin < expires_at,
            None => true,
        }
    }

    /// Validity against the wall clock.
    #[must_use]
    pub fn is_valid(&self, safety_margin: ChronoDuration) -> bool {
        self.is_valid_at(Utc::now(), safety_margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn test_rejects_expiry_not_after_issuance() {
        assert!(Credential::new(
            "https://g.example.com/x",
            at(1_000),
            Some(at(1_000)),
            SourceKind::Gateway
        )
        .is_err());
        assert!(Credential::new(
            "https://g.example.com/x",
            at(1_000),
            Some(at(999)),
            SourceKind::Gateway
        )
        .is_err());
    }

    #[test]
    fn test_validity_boundaries() {
        let cred = Credential::new(
            "https://g.example.com/x",
            at(1_000),
            Some(at(1_120)),
            SourceKind::Gateway,
        )
        .unwrap();

        // 60s margin: stale from t=1060 onward.
        let margin = ChronoDuration::seconds(60);
        assert!(cred.is_valid_at(at(1_059), margin));
        assert!(!cred.is_valid_at(at(1_060), margin));
        // Zero margin: hard expiry at t=1120.
        assert!(cred.is_valid_at(at(1_119), ChronoDuration::zero()));
        assert!(!cred.is_valid_at(at(1_120), ChronoDuration::zero()));
    }

    #[test]
    fn test_no_expiry_is_always_valid() {
        let cred = Credential::new(
            "https://hls.example.com/m.m3u8",
            at(1_000),
            None,
            SourceKind::Stream,
        )
        .unwrap();
        assert!(cred.is_valid_at(at(i32::MAX as i64), ChronoDuration::days(365)));
    }
}
