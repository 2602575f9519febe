//! Session services
//!
//! Everything that runs per playback session: the credential store, the
//! renewal scheduler, the playback controller, progress reporting, and the
//! session wiring that owns them all.

mod credential_store;
mod playback;
mod progress;
mod renewal;
mod session;

pub use credential_store::CredentialStore;
pub use playback::PlaybackController;
pub use progress::{HttpProgressSink, NoopProgressSink, ProgressSink};
pub use renewal::{RenewalScheduler, SchedulerState};
pub use session::{PlaybackSession, SessionHandles};
