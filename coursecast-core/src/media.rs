//! Media surface seam
//!
//! The playback controller drives whatever actually renders video through
//! this trait, and learns what the surface is doing through a channel of
//! [`MediaEvent`]s. UI layers implement `MediaSurface` over their player
//! binding; tests implement it over a recording fake.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Commands the controller issues to the bound media surface.
#[async_trait]
pub trait MediaSurface: Send + 'static {
    /// Point the surface at a new source URL.
    async fn load(&mut self, url: &str) -> Result<()>;

    /// Seek to an absolute position in seconds.
    async fn seek(&mut self, position_secs: f64) -> Result<()>;
}

/// Events the media surface reports back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Periodic playback position update.
    Position(f64),
    Playing,
    Paused,
    /// Buffering/stall notification; expected briefly around credential
    /// swaps, suspicious otherwise.
    Stalled,
    /// Playback reached end-of-media.
    Ended,
    /// The surface cannot decode or fetch the current source.
    Error(String),
}

/// Channel capacity for media events. Position updates are coarse (about
/// one per second from real surfaces), so a small buffer suffices.
const MEDIA_EVENT_BUFFER: usize = 64;

pub type MediaEventSender = mpsc::Sender<MediaEvent>;
pub type MediaEventReceiver = mpsc::Receiver<MediaEvent>;

/// Create the event channel pair a surface implementation reports through.
#[must_use]
pub fn media_event_channel() -> (MediaEventSender, MediaEventReceiver) {
    mpsc::channel(MEDIA_EVENT_BUFFER)
}
