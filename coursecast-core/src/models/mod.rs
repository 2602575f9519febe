//! Core domain models for playback sessions.

mod candidate;
mod credential;
mod reference;
mod session;

pub use candidate::{CandidateSource, CandidateSourceList};
pub use credential::{Credential, SourceKind};
pub use reference::{ContentReference, PreferredPath};
pub use session::{PositionCell, SessionEvent, SessionStatus, StatusCell};
