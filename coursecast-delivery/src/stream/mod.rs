//! Stream-source service client
//!
//! Fetches the ranked list of playable sources for a managed adaptive
//! stream, each with an optional expiry (some playback tokens are
//! effectively long-lived).

pub mod client;
pub mod types;

pub use client::StreamSourceClient;
pub use types::StreamSource;
