//! Shared test fakes for session, controller, and scheduler tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::media::MediaSurface;
use crate::models::{Credential, SourceKind};
use crate::service::ProgressSink;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Load(String),
    Seek(f64),
}

/// Media surface that records every command it receives.
#[derive(Clone, Default)]
pub struct FakeSurface {
    pub commands: Arc<Mutex<Vec<SurfaceCommand>>>,
}

impl FakeSurface {
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.commands.lock().clone()
    }

    pub fn loaded_urls(&self) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                SurfaceCommand::Load(url) => Some(url.clone()),
                SurfaceCommand::Seek(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl MediaSurface for FakeSurface {
    async fn load(&mut self, url: &str) -> crate::Result<()> {
        self.commands
            .lock()
            .push(SurfaceCommand::Load(url.to_string()));
        Ok(())
    }

    async fn seek(&mut self, position_secs: f64) -> crate::Result<()> {
        self.commands.lock().push(SurfaceCommand::Seek(position_secs));
        Ok(())
    }
}

/// Progress sink that records every report.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub positions: Arc<Mutex<Vec<f64>>>,
    pub completions: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report_position(&self, _content_id: &str, position_secs: f64) {
        self.positions.lock().push(position_secs);
    }

    async fn report_completion(&self, content_id: &str) {
        self.completions.lock().push(content_id.to_string());
    }
}

/// Gateway credential expiring `ttl_secs` from now.
pub fn gateway_credential_ttl(url: &str, ttl_secs: i64) -> Credential {
    let now = Utc::now();
    Credential::new(
        url,
        now,
        Some(now + chrono::Duration::seconds(ttl_secs)),
        SourceKind::Gateway,
    )
    .expect("test credential")
}

/// Gateway credential with a comfortable five-minute validity.
pub fn gateway_credential(url: &str) -> Credential {
    gateway_credential_ttl(url, 300)
}

/// Non-expiring stream credential.
pub fn stream_credential(url: &str) -> Credential {
    Credential::new(url, Utc::now(), None, SourceKind::Stream).expect("test credential")
}
