//! Progress-tracking collaborator client
//!
//! Best-effort reporting of watch position and completion. Callers treat
//! every failure here as non-fatal; playback never depends on it.

pub mod client;

pub use client::ProgressClient;
