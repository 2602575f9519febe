pub mod config;
pub mod error;
pub mod issuer;
pub mod logging;
pub mod media;
pub mod models;
pub mod resilience;
pub mod resolver;
pub mod service;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
