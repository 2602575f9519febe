//! Credential renewal scheduler
//!
//! One fixed-interval poll task per playback session. Each tick compares the
//! stored credential's remaining validity against the safety margin and
//! renews through the issuer before expiry, with bounded jitter-free
//! backoff on failure. Fixed polling (rather than a single timer armed at
//! `expires_at - margin`) tolerates device sleep/wake and clock drift, and
//! keeps the renewal check idempotent under a virtual clock.
//!
//! State machine: Idle -> Armed -> Refreshing -> (Armed | Expired), with
//! Destroyed reachable from every state via the session's cancellation
//! token. Destroyed is the only state with no outgoing transitions;
//! Expired re-arms when a manual retry stores a fresh credential.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::PlaybackConfig;
use crate::issuer::CredentialIssuer;
use crate::models::{CandidateSource, Credential, SessionEvent, SessionStatus, StatusCell};
use crate::service::CredentialStore;
use crate::Error;

/// Renewal state, observable per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Refreshing,
    Expired,
    Destroyed,
}

/// Everything the scheduler task needs; owned per session.
pub(crate) struct SchedulerContext {
    pub store: Arc<CredentialStore>,
    pub issuer: Arc<dyn CredentialIssuer>,
    /// The candidate currently being played; fallback may change it
    /// mid-session, and renewal always follows the current one.
    pub candidate: Arc<RwLock<CandidateSource>>,
    pub status: StatusCell,
    pub swap_tx: Arc<watch::Sender<Option<Credential>>>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub config: PlaybackConfig,
    pub cancel: CancellationToken,
}

enum RenewOutcome {
    Renewed(Credential),
    Cancelled,
    Exhausted(Error),
}

/// Handle to a running renewal task.
pub struct RenewalScheduler {
    state: Arc<RwLock<SchedulerState>>,
    task: JoinHandle<()>,
}

impl RenewalScheduler {
    pub(crate) fn spawn(ctx: SchedulerContext) -> Self {
        let state = Arc::new(RwLock::new(SchedulerState::Idle));
        let task = tokio::spawn(run(ctx, state.clone()));
        Self { state, task }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Wait for the task to observe cancellation and exit.
    pub(crate) async fn join(self) {
        let _ = self.task.await;
    }
}

async fn run(ctx: SchedulerContext, state: Arc<RwLock<SchedulerState>>) {
    if ctx.store.current().is_some() {
        *state.write() = SchedulerState::Armed;
    }

    let mut ticker = tokio::time::interval(ctx.config.poll_interval());
    // A tick that fires while a renewal is in flight is skipped, never
    // queued: at most one issue call exists per session at any instant.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = ctx.cancel.cancelled() => {
                *state.write() = SchedulerState::Destroyed;
                return;
            }
            _ = ticker.tick() => {}
        }

        if *state.read() == SchedulerState::Expired {
            // Idle until a manual retry stores a fresh credential.
            if ctx.store.is_valid(ctx.config.safety_margin()) {
                *state.write() = SchedulerState::Armed;
            }
            continue;
        }

        // Covers non-expiring credentials too: they are always valid, so
        // the session effectively skips renewal polling.
        if ctx.store.is_valid(ctx.config.safety_margin()) {
            if *state.read() == SchedulerState::Idle {
                *state.write() = SchedulerState::Armed;
            }
            continue;
        }

        *state.write() = SchedulerState::Refreshing;
        let prior_status = ctx.status.get();
        ctx.status.set(SessionStatus::Refreshing);

        match renew(&ctx).await {
            RenewOutcome::Renewed(credential) => {
                *state.write() = SchedulerState::Armed;
                let resumed = match prior_status {
                    SessionStatus::Playing | SessionStatus::Paused => prior_status,
                    _ => SessionStatus::Ready,
                };
                ctx.status.set(resumed);
                let _ = ctx.events.send(SessionEvent::CredentialRenewed {
                    source_kind: credential.source_kind,
                    expires_at: credential.expires_at,
                });
            }
            RenewOutcome::Cancelled => {
                *state.write() = SchedulerState::Destroyed;
                return;
            }
            RenewOutcome::Exhausted(error) => {
                *state.write() = SchedulerState::Expired;
                ctx.status.set(SessionStatus::Expired);
                tracing::error!(error = %error, "Credential renewal exhausted");
                let _ = ctx.events.send(SessionEvent::Fatal { error });
            }
        }
    }
}

/// One renewal round: bounded attempts, exponential backoff, hard-deadline
/// escalation. Concludes strictly before the old credential's expiry —
/// backoff sleeps are clamped to the remaining validity.
async fn renew(ctx: &SchedulerContext) -> RenewOutcome {
    let candidate = ctx.candidate.read().clone();
    let policy = ctx.config.backoff();
    let mut last_err: Option<Error> = None;

    for attempt in 0..policy.max_attempts {
        if ctx.cancel.is_cancelled() {
            return RenewOutcome::Cancelled;
        }

        let result = tokio::select! {
            () = ctx.cancel.cancelled() => return RenewOutcome::Cancelled,
            result = ctx.issuer.issue_for(&candidate, ctx.config.ttl_hint_secs) => result,
        };

        match result {
            Ok(credential) => {
                // Teardown may have raced the response; a destroyed session
                // must never see its store mutated.
                if ctx.cancel.is_cancelled() {
                    return RenewOutcome::Cancelled;
                }
                ctx.store.set(credential.clone());
                let _ = ctx.swap_tx.send(Some(credential.clone()));
                tracing::info!(
                    source_kind = %credential.source_kind,
                    attempt = attempt + 1,
                    "Credential renewed"
                );
                return RenewOutcome::Renewed(credential);
            }
            Err(err) => {
                let covered = ctx.store.is_valid(Duration::ZERO);
                let retryable =
                    err.is_transient() || (err.is_retryable_while_covered() && covered);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    covered,
                    "Credential renewal attempt failed"
                );
                last_err = Some(err);
                if !retryable || attempt + 1 == policy.max_attempts {
                    break;
                }

                let mut delay = policy.delay_for_attempt(attempt);
                if let Some(remaining) = ctx.store.time_until_expiry() {
                    delay = delay.min(remaining);
                }
                tokio::select! {
                    () = ctx.cancel.cancelled() => return RenewOutcome::Cancelled,
                    () = tokio::time::sleep(delay) => {}
                }
                if !ctx.store.is_valid(Duration::ZERO) {
                    // Hard deadline passed mid-backoff.
                    break;
                }
            }
        }
    }

    let detail = last_err.map_or_else(|| "renewal failed".to_string(), |e| e.to_string());
    RenewOutcome::Exhausted(Error::CredentialExpired(format!(
        "renewal did not complete before credential expiry: {detail}"
    )))
}
