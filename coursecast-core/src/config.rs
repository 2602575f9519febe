use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::resilience::retry::BackoffPolicy;
use crate::resilience::timeout;
use crate::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub delivery: DeliveryConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

/// Endpoints and timeouts for the external delivery services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub signing_url: String,
    pub stream_source_url: String,
    /// Progress collaborator endpoint; reporting is disabled when absent.
    pub progress_url: Option<String>,
    pub request_timeout_secs: u64,
    pub progress_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            signing_url: "http://localhost:8090".to_string(),
            stream_source_url: "http://localhost:8091".to_string(),
            progress_url: None,
            request_timeout_secs: timeout::HTTP_REQUEST_TIMEOUT.as_secs(),
            progress_timeout_secs: timeout::PROGRESS_REPORT_TIMEOUT.as_secs(),
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn progress_timeout(&self) -> Duration {
        Duration::from_secs(self.progress_timeout_secs)
    }
}

/// Credential lifecycle and playback policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Fixed renewal poll interval, independent of credential TTL.
    pub poll_interval_secs: u64,
    /// Renewal triggers once remaining validity drops below this margin.
    pub safety_margin_secs: u64,
    /// TTL hint sent with signing requests; the service's answer wins.
    pub ttl_hint_secs: u64,
    /// Window after (re)attach in which a media error means "this delivery
    /// path does not work", triggering fallback instead of a fatal error.
    pub grace_window_secs: u64,
    pub retry_base_secs: u64,
    pub retry_cap_secs: u64,
    pub retry_max_attempts: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            safety_margin_secs: 60,
            ttl_hint_secs: 300,
            grace_window_secs: 5,
            retry_base_secs: 2,
            retry_cap_secs: 30,
            retry_max_attempts: 5,
        }
    }
}

impl PlaybackConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub const fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }

    #[must_use]
    pub const fn grace_window(&self) -> Duration {
        Duration::from_secs(self.grace_window_secs)
    }

    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.retry_base_secs),
            Duration::from_secs(self.retry_cap_secs),
            self.retry_max_attempts,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "json" for production, "pretty" for development.
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then an optional file, then
    /// `COURSECAST_*` environment variables (e.g.
    /// `COURSECAST_PLAYBACK__POLL_INTERVAL_SECS=15`).
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix("COURSECAST").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Reject configurations the session core cannot honor.
    pub fn validate(&self) -> Result<()> {
        let p = &self.playback;
        if p.poll_interval_secs == 0 {
            return Err(Error::Configuration(
                "playback.poll_interval_secs must be positive".to_string(),
            ));
        }
        // Renewal is only guaranteed to beat expiry when at least one poll
        // tick lands inside the safety margin.
        if p.safety_margin_secs < p.poll_interval_secs {
            return Err(Error::Configuration(format!(
                "playback.safety_margin_secs ({}) must be >= poll_interval_secs ({})",
                p.safety_margin_secs, p.poll_interval_secs
            )));
        }
        if p.ttl_hint_secs == 0 {
            return Err(Error::Configuration(
                "playback.ttl_hint_secs must be positive".to_string(),
            ));
        }
        if p.retry_max_attempts == 0 {
            return Err(Error::Configuration(
                "playback.retry_max_attempts must be positive".to_string(),
            ));
        }
        if p.retry_cap_secs < p.retry_base_secs {
            return Err(Error::Configuration(format!(
                "playback.retry_cap_secs ({}) must be >= retry_base_secs ({})",
                p.retry_cap_secs, p.retry_base_secs
            )));
        }
        if self.delivery.signing_url.is_empty() {
            return Err(Error::Configuration(
                "delivery.signing_url must be set".to_string(),
            ));
        }
        if self.delivery.stream_source_url.is_empty() {
            return Err(Error::Configuration(
                "delivery.stream_source_url must be set".to_string(),
            ));
        }
        Ok(())
    }
}
