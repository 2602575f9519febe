//! Playback controller
//!
//! Binds the media surface to the session's current credential, tracks the
//! watch position, re-attaches after credential swaps without restarting
//! playback, and drives the fallback policy when a delivery path proves
//! unplayable. One event-loop task per session.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PlaybackConfig;
use crate::issuer::{issue_with_backoff, CredentialIssuer};
use crate::media::{MediaEvent, MediaEventReceiver, MediaSurface};
use crate::models::{
    CandidateSource, CandidateSourceList, Credential, PositionCell, SessionEvent, SessionStatus,
    SourceKind, StatusCell,
};
use crate::service::CredentialStore;
use crate::Error;

/// Everything the controller task needs; owned per session.
pub(crate) struct ControllerContext {
    pub store: Arc<CredentialStore>,
    pub issuer: Arc<dyn CredentialIssuer>,
    pub candidates: Arc<Mutex<CandidateSourceList>>,
    /// The candidate currently being played, shared with the scheduler so
    /// renewals follow fallback switches.
    pub candidate: Arc<RwLock<CandidateSource>>,
    pub status: StatusCell,
    pub position: PositionCell,
    pub progress: Arc<dyn crate::service::ProgressSink>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub swap_rx: watch::Receiver<Option<Credential>>,
    pub config: PlaybackConfig,
    pub cancel: CancellationToken,
    pub content_id: String,
}

/// State of the current surface binding.
struct Binding {
    kind: SourceKind,
    attached_at: Instant,
    /// Whether the surface produced decodable data since the last (re)bind.
    decoded: bool,
    /// A swap just happened; errors and stalls in this window are the
    /// expected transient kind until playback resumes.
    swap_window: bool,
}

impl Binding {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            attached_at: Instant::now(),
            decoded: false,
            swap_window: false,
        }
    }

    fn rebound(&mut self, kind: SourceKind) {
        // A same-kind swap re-points the existing pipeline and keeps its
        // decode state; a cross-kind swap is a full reload and re-enters
        // the grace window.
        if kind != self.kind {
            self.attached_at = Instant::now();
            self.decoded = false;
        }
        self.kind = kind;
        self.swap_window = true;
    }
}

/// Handle to a running controller task.
pub struct PlaybackController {
    task: JoinHandle<()>,
}

impl PlaybackController {
    /// Bind `surface` to the session and start the event loop.
    pub(crate) fn attach(
        ctx: ControllerContext,
        surface: Box<dyn MediaSurface>,
        media_events: MediaEventReceiver,
    ) -> Self {
        let task = tokio::spawn(run(ctx, surface, media_events));
        Self { task }
    }

    /// Wait for the task to observe cancellation and exit.
    pub(crate) async fn join(self) {
        let _ = self.task.await;
    }
}

async fn run(
    ctx: ControllerContext,
    mut surface: Box<dyn MediaSurface>,
    mut media_events: MediaEventReceiver,
) {
    let mut swap_rx = ctx.swap_rx.clone();
    let cancel = ctx.cancel.clone();

    // The media surface is never attached to a stale credential.
    let Some(credential) = ctx.store.current() else {
        fail(&ctx, Error::Internal("no credential at attach".to_string()));
        return;
    };
    if !ctx.store.is_valid(std::time::Duration::ZERO) {
        fail(
            &ctx,
            Error::CredentialExpired("credential stale at attach".to_string()),
        );
        return;
    }

    let mut binding = Binding::new(credential.source_kind);
    if let Err(err) = bind(surface.as_mut(), &credential.url, ctx.position.get()).await {
        tracing::warn!(error = %err, "Initial surface bind failed, trying fallback");
        if !fallback(&ctx, surface.as_mut(), &mut binding, &err.to_string()).await {
            return;
        }
    } else {
        ctx.status.set(SessionStatus::Ready);
        let _ = ctx.events.send(SessionEvent::Ready {
            source_kind: binding.kind,
        });
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                report_position(&ctx);
                return;
            }
            changed = swap_rx.changed() => {
                if changed.is_err() {
                    // Swap sender gone: the session is tearing down.
                    cancel.cancelled().await;
                    report_position(&ctx);
                    return;
                }
                let Some(new_credential) = swap_rx.borrow_and_update().clone() else {
                    continue;
                };
                handle_swap(&ctx, surface.as_mut(), &mut binding, new_credential).await;
            }
            maybe_event = media_events.recv() => {
                let Some(event) = maybe_event else {
                    // Surface dropped its sender; nothing left to control.
                    cancel.cancelled().await;
                    report_position(&ctx);
                    return;
                };
                handle_media_event(&ctx, surface.as_mut(), &mut binding, event).await;
            }
        }
    }
}

/// Point the surface at `url` and restore the watch position if resuming.
async fn bind(
    surface: &mut dyn MediaSurface,
    url: &str,
    resume_secs: f64,
) -> crate::Result<()> {
    surface.load(url).await?;
    if resume_secs > 0.0 {
        surface.seek(resume_secs).await?;
    }
    Ok(())
}

async fn handle_swap(
    ctx: &ControllerContext,
    surface: &mut dyn MediaSurface,
    binding: &mut Binding,
    credential: Credential,
) {
    let same_kind = credential.source_kind == binding.kind;
    binding.rebound(credential.source_kind);

    match bind(surface, &credential.url, ctx.position.get()).await {
        Ok(()) => {
            tracing::debug!(
                source_kind = %credential.source_kind,
                same_kind,
                position_secs = ctx.position.get(),
                "Re-attached media source after credential swap"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "Surface rejected swapped credential");
            fallback(ctx, surface, binding, &err.to_string()).await;
        }
    }
}

async fn handle_media_event(
    ctx: &ControllerContext,
    surface: &mut dyn MediaSurface,
    binding: &mut Binding,
    event: MediaEvent,
) {
    match event {
        MediaEvent::Position(secs) => {
            ctx.position.update(secs);
            binding.decoded = true;
            binding.swap_window = false;
        }
        MediaEvent::Playing => {
            binding.decoded = true;
            binding.swap_window = false;
            ctx.status.set(SessionStatus::Playing);
        }
        MediaEvent::Paused => {
            ctx.status.set(SessionStatus::Paused);
            report_position(ctx);
        }
        MediaEvent::Stalled => {
            tracing::debug!(
                during_swap = binding.swap_window,
                "Playback stalled"
            );
        }
        MediaEvent::Ended => {
            ctx.status.set(SessionStatus::Paused);
            let _ = ctx.events.send(SessionEvent::Completed);
            let progress = ctx.progress.clone();
            let content_id = ctx.content_id.clone();
            tokio::spawn(async move {
                progress.report_completion(&content_id).await;
            });
        }
        MediaEvent::Error(cause) => {
            if ctx.status.get() == SessionStatus::Failed {
                // Recovery already exhausted; one fatal event was emitted.
                return;
            }
            let in_grace =
                !binding.decoded && binding.attached_at.elapsed() <= ctx.config.grace_window();
            if in_grace {
                fallback(ctx, surface, binding, &cause).await;
            } else if binding.swap_window {
                tracing::debug!(cause = %cause, "Transient media error during credential swap");
            } else {
                fail(ctx, Error::Playback(cause));
            }
        }
    }
}

/// Walk the remaining candidates until one attaches, or fail the session.
/// Returns whether a candidate was successfully attached.
async fn fallback(
    ctx: &ControllerContext,
    surface: &mut dyn MediaSurface,
    binding: &mut Binding,
    cause: &str,
) -> bool {
    ctx.status.set(SessionStatus::Resolving);

    loop {
        let next = ctx.candidates.lock().advance().cloned();
        let Some(candidate) = next else {
            fail(
                ctx,
                Error::Playback(format!("all delivery paths exhausted: {cause}")),
            );
            return false;
        };

        tracing::warn!(
            from = %binding.kind,
            to = %candidate.source_kind,
            cause = %cause,
            "Falling back to next delivery path"
        );

        let issued = issue_with_backoff(
            ctx.issuer.as_ref(),
            &candidate,
            ctx.config.ttl_hint_secs,
            ctx.config.backoff(),
            &ctx.cancel,
        )
        .await;

        match issued {
            Ok(credential) => {
                if ctx.cancel.is_cancelled() {
                    return false;
                }
                ctx.store.set(credential.clone());
                *ctx.candidate.write() = candidate;

                if let Err(err) = bind(surface, &credential.url, ctx.position.get()).await {
                    tracing::warn!(error = %err, "Fallback candidate rejected by surface");
                    continue;
                }

                let from = binding.kind;
                *binding = Binding::new(credential.source_kind);
                ctx.status.set(SessionStatus::Ready);
                let _ = ctx.events.send(SessionEvent::FallbackSwitched {
                    from,
                    to: credential.source_kind,
                });
                return true;
            }
            Err(_) if ctx.cancel.is_cancelled() => return false,
            Err(err) => {
                tracing::warn!(error = %err, "Could not obtain credential for fallback candidate");
                continue;
            }
        }
    }
}

fn fail(ctx: &ControllerContext, error: Error) {
    ctx.status.set(SessionStatus::Failed);
    tracing::error!(error = %error, "Playback session failed");
    let _ = ctx.events.send(SessionEvent::Fatal { error });
}

/// Fire-and-forget position report (pause and unmount).
fn report_position(ctx: &ControllerContext) {
    let progress = ctx.progress.clone();
    let content_id = ctx.content_id.clone();
    let position = ctx.position.get();
    tokio::spawn(async move {
        progress.report_position(&content_id, position).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::MockCredentialIssuer;
    use crate::media::{media_event_channel, MediaEventSender};
    use crate::test_helpers::{
        gateway_credential, stream_credential, FakeSurface, RecordingSink, SurfaceCommand,
    };
    use chrono::Utc;
    use std::time::Duration;

    struct Harness {
        surface: FakeSurface,
        sink: RecordingSink,
        status: StatusCell,
        store: Arc<CredentialStore>,
        swap_tx: Arc<watch::Sender<Option<Credential>>>,
        media_tx: MediaEventSender,
        events_rx: mpsc::UnboundedReceiver<SessionEvent>,
        cancel: CancellationToken,
        controller: PlaybackController,
    }

    impl Harness {
        fn start(
            candidates: Vec<CandidateSource>,
            initial: Credential,
            issuer: Arc<dyn CredentialIssuer>,
        ) -> Self {
            let store = Arc::new(CredentialStore::new());
            store.set(initial);
            Self::start_with_store(store, candidates, issuer)
        }

        fn start_with_store(
            store: Arc<CredentialStore>,
            candidates: Vec<CandidateSource>,
            issuer: Arc<dyn CredentialIssuer>,
        ) -> Self {
            let list = CandidateSourceList::new(candidates).unwrap();
            let first = list.current().clone();

            let (status, _status_rx) = StatusCell::new();
            let (swap_tx, swap_rx) = watch::channel(None);
            let swap_tx = Arc::new(swap_tx);
            let (events_tx, events_rx) = mpsc::unbounded_channel();
            let (media_tx, media_rx) = media_event_channel();
            let cancel = CancellationToken::new();
            let surface = FakeSurface::default();
            let sink = RecordingSink::default();

            let controller = PlaybackController::attach(
                ControllerContext {
                    store: store.clone(),
                    issuer,
                    candidates: Arc::new(Mutex::new(list)),
                    candidate: Arc::new(RwLock::new(first)),
                    status: status.clone(),
                    position: PositionCell::new(),
                    progress: Arc::new(sink.clone()),
                    events: events_tx,
                    swap_rx,
                    config: PlaybackConfig::default(),
                    cancel: cancel.clone(),
                    content_id: "sec-1".to_string(),
                },
                Box::new(surface.clone()),
                media_rx,
            );

            Self {
                surface,
                sink,
                status,
                store,
                swap_tx,
                media_tx,
                events_rx,
                cancel,
                controller,
            }
        }

        fn commands(&self) -> Vec<SurfaceCommand> {
            self.surface.commands.lock().clone()
        }

        async fn send(&self, event: MediaEvent) {
            self.media_tx.send(event).await.unwrap();
            // Let the controller task process the event.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        async fn settle(&self) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        async fn shutdown(self) {
            self.cancel.cancel();
            self.controller.join().await;
        }
    }

    fn no_issuer() -> Arc<dyn CredentialIssuer> {
        let mut issuer = MockCredentialIssuer::new();
        issuer.expect_issue_for().never();
        Arc::new(issuer)
    }

    fn gateway_list() -> Vec<CandidateSource> {
        vec![CandidateSource::new(SourceKind::Gateway, "QmX")]
    }

    #[tokio::test(start_paused = true)]
    async fn attach_binds_current_credential_and_reports_ready() {
        let harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;

        assert_eq!(
            harness.commands(),
            vec![SurfaceCommand::Load("https://g.example.com/a".to_string())]
        );
        assert_eq!(harness.status.get(), SessionStatus::Ready);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn never_attaches_a_stale_credential() {
        let now = Utc::now();
        let stale = Credential::new(
            "https://g.example.com/stale",
            now,
            Some(now + chrono::Duration::seconds(5)),
            SourceKind::Gateway,
        )
        .unwrap();
        // Let the credential lapse before the controller starts.
        let store = Arc::new(CredentialStore::new());
        store.set(stale);
        tokio::time::advance(Duration::from_secs(10)).await;

        let mut harness = Harness::start_with_store(store, gateway_list(), no_issuer());
        harness.settle().await;

        assert!(harness.commands().is_empty(), "no bind on stale credential");
        assert_eq!(harness.status.get(), SessionStatus::Failed);
        assert!(matches!(
            harness.events_rx.try_recv().unwrap(),
            SessionEvent::Fatal {
                error: Error::CredentialExpired(_)
            }
        ));

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn same_kind_swap_preserves_position() {
        let harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness.send(MediaEvent::Playing).await;
        harness.send(MediaEvent::Position(42.5)).await;

        let renewed = gateway_credential("https://g.example.com/b");
        harness.store.set(renewed.clone());
        harness.swap_tx.send(Some(renewed)).unwrap();
        harness.settle().await;

        let commands = harness.commands();
        assert_eq!(
            commands.last(),
            Some(&SurfaceCommand::Seek(42.5)),
            "position restored after swap"
        );
        assert_eq!(
            commands[commands.len() - 2],
            SurfaceCommand::Load("https://g.example.com/b".to_string())
        );
        // Same-kind repoint keeps the session in its playing state.
        assert_eq!(harness.status.get(), SessionStatus::Playing);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn error_during_swap_window_is_not_fatal() {
        let harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness.send(MediaEvent::Playing).await;

        let renewed = gateway_credential("https://g.example.com/b");
        harness.store.set(renewed.clone());
        harness.swap_tx.send(Some(renewed)).unwrap();
        harness.settle().await;

        harness
            .send(MediaEvent::Error("buffer flushed".to_string()))
            .await;

        assert_ne!(harness.status.get(), SessionStatus::Failed);
        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pause_reports_furthest_position() {
        let harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness.send(MediaEvent::Playing).await;
        harness.send(MediaEvent::Position(184.0)).await;
        harness.send(MediaEvent::Paused).await;
        harness.settle().await;

        assert_eq!(harness.status.get(), SessionStatus::Paused);
        assert_eq!(harness.sink.positions.lock().clone(), vec![184.0]);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ended_reports_completion_once() {
        let mut harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness.send(MediaEvent::Playing).await;
        harness.send(MediaEvent::Ended).await;
        harness.settle().await;

        assert_eq!(
            harness.sink.completions.lock().clone(),
            vec!["sec-1".to_string()]
        );
        // Skip the Ready event, then expect Completed.
        let mut saw_completed = false;
        while let Ok(event) = harness.events_rx.try_recv() {
            if matches!(event, SessionEvent::Completed) {
                saw_completed = true;
            }
        }
        assert!(saw_completed);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn grace_window_error_falls_back_to_next_candidate() {
        // Scenario: stream errors within the grace window; the controller
        // switches to the gateway candidate and attaches its credential.
        let mut issuer = MockCredentialIssuer::new();
        issuer
            .expect_issue_for()
            .withf(|candidate, _| candidate.source_kind == SourceKind::Gateway)
            .times(1)
            .returning(|_, _| Ok(gateway_credential("https://g.example.com/fallback")));

        let mut harness = Harness::start(
            vec![
                CandidateSource::new(SourceKind::Stream, "str-1"),
                CandidateSource::new(SourceKind::Gateway, "QmX"),
            ],
            stream_credential("https://hls.example.com/master.m3u8"),
            Arc::new(issuer),
        );
        harness.settle().await;
        harness
            .send(MediaEvent::Error("demuxer: no decodable data".to_string()))
            .await;

        let commands = harness.commands();
        assert!(commands.contains(&SurfaceCommand::Load(
            "https://g.example.com/fallback".to_string()
        )));
        assert_eq!(harness.status.get(), SessionStatus::Ready);
        assert_eq!(
            harness.store.current().unwrap().url,
            "https://g.example.com/fallback"
        );

        let mut saw_switch = false;
        while let Ok(event) = harness.events_rx.try_recv() {
            if let SessionEvent::FallbackSwitched { from, to } = event {
                assert_eq!(from, SourceKind::Stream);
                assert_eq!(to, SourceKind::Gateway);
                saw_switch = true;
            }
        }
        assert!(saw_switch);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_candidates_fail_with_exactly_one_fatal_event() {
        // Scenario: the only candidate errors out; the session fails once.
        let mut harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness
            .send(MediaEvent::Error("cannot fetch".to_string()))
            .await;
        harness
            .send(MediaEvent::Error("still cannot fetch".to_string()))
            .await;

        assert_eq!(harness.status.get(), SessionStatus::Failed);
        let mut fatal_count = 0;
        while let Ok(event) = harness.events_rx.try_recv() {
            if matches!(event, SessionEvent::Fatal { .. }) {
                fatal_count += 1;
            }
        }
        assert_eq!(fatal_count, 1);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn error_after_decodable_data_is_fatal() {
        let mut harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness.send(MediaEvent::Playing).await;
        harness.send(MediaEvent::Position(30.0)).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        harness
            .send(MediaEvent::Error("network stream interrupted".to_string()))
            .await;

        assert_eq!(harness.status.get(), SessionStatus::Failed);
        let mut saw_playback_fatal = false;
        while let Ok(event) = harness.events_rx.try_recv() {
            if matches!(
                event,
                SessionEvent::Fatal {
                    error: Error::Playback(_)
                }
            ) {
                saw_playback_fatal = true;
            }
        }
        assert!(saw_playback_fatal);

        harness.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_reports_final_position() {
        let harness = Harness::start(
            gateway_list(),
            gateway_credential("https://g.example.com/a"),
            no_issuer(),
        );
        harness.settle().await;
        harness.send(MediaEvent::Playing).await;
        harness.send(MediaEvent::Position(99.0)).await;

        let sink = harness.sink.clone();
        harness.shutdown().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(sink.positions.lock().clone(), vec![99.0]);
    }
}
