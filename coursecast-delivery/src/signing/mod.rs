//! Signing service client
//!
//! Mints short-lived signed URLs for private content-addressed objects.

pub mod client;
pub mod types;

pub use client::SigningClient;
pub use types::SignedUrl;
