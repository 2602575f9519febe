//! Per-session credential store
//!
//! Holds the current access credential for one playback session. Pure data
//! plus validity checks; no timers, no network. Single-writer: only the
//! session's own scheduler/controller coordination point calls [`set`].
//!
//! [`set`]: CredentialStore::set

use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::models::Credential;

#[derive(Default)]
struct Inner {
    credential: Option<Credential>,
    /// Monotonic deadline derived from the server-supplied expiry at the
    /// moment the credential was stored. The server instant is
    /// authoritative; converting once at set time makes every later
    /// validity check immune to wall-clock adjustments (and exercisable
    /// under tokio's virtual clock).
    deadline: Option<Instant>,
}

/// Holds the current credential and answers validity questions about it.
#[derive(Default)]
pub struct CredentialStore {
    inner: RwLock<Inner>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored credential. Renewal swaps the whole value;
    /// credentials are never mutated in place.
    pub fn set(&self, credential: Credential) {
        let deadline = credential.expires_at.map(|expires_at| {
            let remaining = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            Instant::now() + remaining
        });
        let mut inner = self.inner.write();
        inner.credential = Some(credential);
        inner.deadline = deadline;
    }

    #[must_use]
    pub fn current(&self) -> Option<Credential> {
        self.inner.read().credential.clone()
    }

    /// True iff a credential is present and `now + safety_margin` is still
    /// before its expiry. Credentials without an expiry are always valid.
    #[must_use]
    pub fn is_valid(&self, safety_margin: Duration) -> bool {
        let inner = self.inner.read();
        match (&inner.credential, inner.deadline) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(deadline)) => Instant::now() + safety_margin < deadline,
        }
    }

    /// Remaining validity. `None` when the store is empty or the credential
    /// never expires.
    #[must_use]
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.inner
            .read()
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the stored credential has an expiry to track at all.
    #[must_use]
    pub fn expires(&self) -> bool {
        self.inner.read().deadline.is_some()
    }
}
