//! Session state primitives
//!
//! Shared cells for the per-session status and watch position. Each playback
//! session owns exactly one of each; the controller and scheduler hold
//! clones, which keeps sessions fully isolated from one another.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::SourceKind;
use crate::Error;

/// Lifecycle status of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Resolving,
    Ready,
    Playing,
    Paused,
    Refreshing,
    Expired,
    Failed,
    Destroyed,
}

impl SessionStatus {
    /// Only teardown is irreversible; `Expired` and `Failed` accept a
    /// manual retry.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Destroyed)
    }

    #[must_use]
    pub const fn can_retry(&self) -> bool {
        matches!(self, Self::Expired | Self::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Refreshing => "refreshing",
            Self::Expired => "expired",
            Self::Failed => "failed",
            Self::Destroyed => "destroyed",
        };
        write!(f, "{name}")
    }
}

/// Lifecycle events surfaced to the UI.
#[derive(Debug)]
pub enum SessionEvent {
    /// First credential bound to the media surface.
    Ready { source_kind: SourceKind },
    /// A renewal replaced the credential without interrupting playback.
    CredentialRenewed {
        source_kind: SourceKind,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Playback failed on one delivery path and moved to the next.
    FallbackSwitched { from: SourceKind, to: SourceKind },
    /// Playback reached end-of-media.
    Completed,
    /// All internal recovery is exhausted; the session needs a manual retry.
    Fatal { error: Error },
}

/// Observable session status backed by a watch channel.
///
/// `Destroyed` is absorbing: once set, no further transition is applied,
/// which is what guarantees that late async results cannot resurrect a
/// torn-down session's state.
#[derive(Clone)]
pub struct StatusCell {
    tx: Arc<watch::Sender<SessionStatus>>,
}

impl StatusCell {
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<SessionStatus>) {
        let (tx, rx) = watch::channel(SessionStatus::Idle);
        (Self { tx: Arc::new(tx) }, rx)
    }

    #[must_use]
    pub fn get(&self) -> SessionStatus {
        *self.tx.borrow()
    }

    /// Apply a transition. Returns false when refused (already `Destroyed`)
    /// or when the status is unchanged.
    pub fn set(&self, next: SessionStatus) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.tx.subscribe()
    }
}

/// Furthest-watched position in seconds.
///
/// Monotonically increasing: a backwards seek never lowers it, so a
/// credential swap always resumes at the furthest point reached and the
/// progress collaborator sees course progress, not scrubbing.
#[derive(Clone, Default)]
pub struct PositionCell {
    secs: Arc<Mutex<f64>>,
}

impl PositionCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, position_secs: f64) {
        let mut secs = self.secs.lock();
        if position_secs > *secs {
            *secs = position_secs;
        }
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        *self.secs.lock()
    }
}
