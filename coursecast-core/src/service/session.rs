//! Playback session wiring
//!
//! One `PlaybackSession` per open course section: it resolves the delivery
//! candidates, obtains the first credential, binds the media surface, and
//! owns the renewal scheduler and playback controller for its lifetime.
//! Nothing is shared across sessions.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::PlaybackConfig;
use crate::issuer::{issue_with_backoff, CredentialIssuer};
use crate::media::{MediaEventReceiver, MediaSurface};
use crate::models::{
    CandidateSource, CandidateSourceList, ContentReference, Credential, PositionCell,
    SessionEvent, SessionStatus, StatusCell,
};
use crate::resolver::SourceResolver;
use crate::service::playback::ControllerContext;
use crate::service::renewal::SchedulerContext;
use crate::service::{
    CredentialStore, PlaybackController, ProgressSink, RenewalScheduler, SchedulerState,
};
use crate::{Error, Result};

/// Feeds the UI consumes: the status watch and the lifecycle event stream.
#[derive(Debug)]
pub struct SessionHandles {
    pub status: watch::Receiver<SessionStatus>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// A mounted playback session.
///
/// Dropping the session cancels its timers and in-flight requests; prefer
/// [`unmount`] to also wait for the tasks to finish and to flush the final
/// position report.
///
/// [`unmount`]: PlaybackSession::unmount
pub struct PlaybackSession {
    reference: ContentReference,
    config: PlaybackConfig,
    issuer: Arc<dyn CredentialIssuer>,
    store: Arc<CredentialStore>,
    status: StatusCell,
    position: PositionCell,
    candidates: Arc<Mutex<CandidateSourceList>>,
    candidate: Arc<RwLock<CandidateSource>>,
    swap_tx: Arc<watch::Sender<Option<Credential>>>,
    cancel: CancellationToken,
    scheduler: Option<RenewalScheduler>,
    controller: Option<PlaybackController>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    /// Mount a session: resolve candidates, obtain the first credential,
    /// bind the surface, and start the renewal poll.
    ///
    /// Setup failures are immediate: a configuration error or a signing
    /// rejection here is fatal (there is no prior credential to keep
    /// playing on); only transient network failures are retried.
    pub async fn mount(
        config: PlaybackConfig,
        issuer: Arc<dyn CredentialIssuer>,
        progress: Arc<dyn ProgressSink>,
        reference: ContentReference,
        surface: Box<dyn MediaSurface>,
        media_events: MediaEventReceiver,
    ) -> Result<(Self, SessionHandles)> {
        let (status, status_rx) = StatusCell::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        status.set(SessionStatus::Resolving);

        let list = SourceResolver::resolve(&reference)?;
        let first = list.current().clone();
        let cancel = CancellationToken::new();

        let credential = issue_with_backoff(
            issuer.as_ref(),
            &first,
            config.ttl_hint_secs,
            config.backoff(),
            &cancel,
        )
        .await?;

        tracing::info!(
            content_id = %reference.content_id,
            source_kind = %credential.source_kind,
            expires_at = ?credential.expires_at,
            "Playback session mounted"
        );

        let store = Arc::new(CredentialStore::new());
        store.set(credential);

        let candidates = Arc::new(Mutex::new(list));
        let candidate = Arc::new(RwLock::new(first));
        let (swap_tx, swap_rx) = watch::channel(None);
        let swap_tx = Arc::new(swap_tx);

        let scheduler = RenewalScheduler::spawn(SchedulerContext {
            store: store.clone(),
            issuer: issuer.clone(),
            candidate: candidate.clone(),
            status: status.clone(),
            swap_tx: swap_tx.clone(),
            events: events_tx.clone(),
            config: config.clone(),
            cancel: cancel.clone(),
        });

        let position = PositionCell::new();
        let controller = PlaybackController::attach(
            ControllerContext {
                store: store.clone(),
                issuer: issuer.clone(),
                candidates: candidates.clone(),
                candidate: candidate.clone(),
                status: status.clone(),
                position: position.clone(),
                progress,
                events: events_tx,
                swap_rx,
                config: config.clone(),
                cancel: cancel.clone(),
                content_id: reference.content_id.clone(),
            },
            surface,
            media_events,
        );

        let session = Self {
            reference,
            config,
            issuer,
            store,
            status,
            position,
            candidates,
            candidate,
            swap_tx,
            cancel,
            scheduler: Some(scheduler),
            controller: Some(controller),
        };

        Ok((session, SessionHandles {
            status: status_rx,
            events: events_rx,
        }))
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }

    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler
            .as_ref()
            .map_or(SchedulerState::Destroyed, RenewalScheduler::state)
    }

    /// Furthest watch position reached, in seconds.
    #[must_use]
    pub fn position_secs(&self) -> f64 {
        self.position.get()
    }

    #[must_use]
    pub fn current_credential(&self) -> Option<Credential> {
        self.store.current()
    }

    #[must_use]
    pub fn reference(&self) -> &ContentReference {
        &self.reference
    }

    /// Manual retry after `Expired` or `Failed`: restarts setup from the
    /// resolver, with the same setup semantics as [`mount`].
    ///
    /// [`mount`]: PlaybackSession::mount
    pub async fn retry(&self) -> Result<()> {
        let status = self.status.get();
        if !status.can_retry() {
            return Err(Error::Internal(format!(
                "retry is only available from expired or failed, current status is {status}"
            )));
        }
        self.status.set(SessionStatus::Resolving);

        let list = SourceResolver::resolve(&self.reference)?;
        let first = list.current().clone();

        let issued = issue_with_backoff(
            self.issuer.as_ref(),
            &first,
            self.config.ttl_hint_secs,
            self.config.backoff(),
            &self.cancel,
        )
        .await;

        match issued {
            Ok(credential) => {
                if self.cancel.is_cancelled() {
                    return Err(Error::Internal("session already destroyed".to_string()));
                }
                self.store.set(credential.clone());
                *self.candidates.lock() = list;
                *self.candidate.write() = first;
                let _ = self.swap_tx.send(Some(credential));
                self.status.set(SessionStatus::Ready);
                tracing::info!(
                    content_id = %self.reference.content_id,
                    "Playback session recovered by manual retry"
                );
                Ok(())
            }
            Err(err) => {
                self.status.set(SessionStatus::Failed);
                Err(err)
            }
        }
    }

    /// Tear the session down: cancel the renewal poll and the controller
    /// loop, and wait for both tasks to exit. No credential mutation can
    /// happen after this returns, even if a signing response is still in
    /// flight when it is called.
    pub async fn unmount(mut self) {
        self.status.set(SessionStatus::Destroyed);
        self.cancel.cancel();
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.join().await;
        }
        if let Some(controller) = self.controller.take() {
            controller.join().await;
        }
        tracing::debug!(
            content_id = %self.reference.content_id,
            "Playback session unmounted"
        );
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        // A dropped session must never leave a dangling timer or let an
        // in-flight request mutate state afterwards.
        self.status.set(SessionStatus::Destroyed);
        self.cancel.cancel();
    }
}
