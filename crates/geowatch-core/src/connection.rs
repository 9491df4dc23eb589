//! Reconnecting live alert connection.
//!
//! [`StreamConnection`] keeps one push channel open to the backend and
//! feeds decoded events into an [`EventHub`]. When the channel closes for
//! any reason (failed connect, server close, stream end) it schedules
//! exactly one reconnect after a fixed delay, forever, until
//! [`stop`](StreamConnection::stop) is called.
//!
//! ```text
//!            start()
//!   Idle ─────────────► Connecting ──open──► Open
//!    ▲                     ▲   │               │
//!    │ stop()        retry │   │ close         │ close
//!    │ (any phase)   fires │   ▼               ▼
//!    └──────────────────── Closed ◄────────────┘
//!                       (one retry pending)
//! ```
//!
//! All I/O runs on one background task per [`start`](StreamConnection::start).
//! Every step that touches the hub holds the hub's dispatch gate and
//! re-checks the connection generation under the lifecycle lock; `stop()`
//! bumps the generation under the same lock and then passes through the
//! gate, so once it returns nothing from the old channel or timer reaches
//! the hub, and the hub reports the channel as down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use geowatch_api::{Channel, Connector, Frame, MalformedFrame, decode_event};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::gate::lock;
use crate::hub::{Dispatch, EventHub};
use crate::notice::{Notice, Notifier, TracingNotifier};

// ── Connection state machine ─────────────────────────────────────────

/// Lifecycle phase of the live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not started, or stopped.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// The channel is open and frames are flowing.
    Open,
    /// The channel is gone; a retry is pending.
    Closed,
}

/// The single pending reconnect.
#[derive(Debug, Clone)]
pub struct PendingRetry {
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

/// Result of a transition requested by a connection generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The caller belongs to an older generation; nothing changed.
    Stale,
}

/// Result of reporting a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// A retry was scheduled for the given deadline.
    Scheduled(Instant),
    /// A retry was already pending; the close was ignored.
    AlreadyScheduled(Instant),
    Stale,
}

/// Pure lifecycle state. Every transition names the generation it came
/// from and is refused if that generation is no longer current.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    phase: Phase,
    generation: u64,
    retry: Option<PendingRetry>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            retry: None,
        }
    }
}

impl ConnectionState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_retry(&self) -> Option<&PendingRetry> {
        self.retry.as_ref()
    }

    /// Begin a new generation. `None` while a previous one is still active.
    pub fn begin(&mut self) -> Option<u64> {
        if self.phase != Phase::Idle {
            return None;
        }
        self.generation += 1;
        self.phase = Phase::Connecting;
        Some(self.generation)
    }

    /// The channel of `generation` opened.
    pub fn opened(&mut self, generation: u64) -> Transition {
        if !self.is_current(generation) {
            return Transition::Stale;
        }
        if let Some(retry) = self.retry.take() {
            retry.cancel.cancel();
        }
        self.phase = Phase::Open;
        Transition::Applied
    }

    /// The channel of `generation` closed. Schedules a retry at `deadline`
    /// unless one is already pending.
    pub fn closed(
        &mut self,
        generation: u64,
        deadline: Instant,
        cancel: CancellationToken,
    ) -> CloseOutcome {
        if !self.is_current(generation) {
            return CloseOutcome::Stale;
        }
        if let Some(pending) = &self.retry {
            return CloseOutcome::AlreadyScheduled(pending.deadline);
        }
        self.phase = Phase::Closed;
        self.retry = Some(PendingRetry { deadline, cancel });
        CloseOutcome::Scheduled(deadline)
    }

    /// The pending retry of `generation` fired.
    pub fn fire_retry(&mut self, generation: u64) -> Transition {
        if !self.is_current(generation) || self.retry.take().is_none() {
            return Transition::Stale;
        }
        self.phase = Phase::Connecting;
        Transition::Applied
    }

    /// Cancel any pending retry and retire the current generation.
    /// Returns whether anything was active.
    pub fn stop(&mut self) -> bool {
        if let Some(retry) = self.retry.take() {
            retry.cancel.cancel();
        }
        let was_active = self.phase != Phase::Idle;
        self.generation += 1;
        self.phase = Phase::Idle;
        was_active
    }

    fn is_current(&self, generation: u64) -> bool {
        self.phase != Phase::Idle && self.generation == generation
    }
}

// ── StreamConnection ─────────────────────────────────────────────────

struct Lifecycle {
    state: ConnectionState,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}


/// Owns the live push channel and its reconnect policy.
pub struct StreamConnection {
    url: Url,
    connector: Arc<dyn Connector>,
    hub: Arc<EventHub>,
    notifier: Arc<dyn Notifier>,
    retry_delay: Duration,
    close_timeout: Duration,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl StreamConnection {
    pub fn new(url: Url, connector: Arc<dyn Connector>, hub: Arc<EventHub>) -> Self {
        Self {
            url,
            connector,
            hub,
            notifier: Arc::new(TracingNotifier),
            retry_delay: crate::config::DEFAULT_RETRY_DELAY,
            close_timeout: Duration::from_secs(1),
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: ConnectionState::default(),
                cancel: None,
                task: None,
            })),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Start connecting. A no-op while a previous start is still active
    /// (connecting, open, or waiting to retry). Must be called from within
    /// a tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        let Some(generation) = lifecycle.state.begin() else {
            tracing::debug!("alert stream already running");
            return;
        };

        let cancel = CancellationToken::new();
        let worker = Worker {
            url: self.url.clone(),
            connector: Arc::clone(&self.connector),
            hub: Arc::clone(&self.hub),
            notifier: Arc::clone(&self.notifier),
            retry_delay: self.retry_delay,
            close_timeout: self.close_timeout,
            lifecycle: Arc::clone(&self.lifecycle),
            generation,
            cancel: cancel.clone(),
        };

        tracing::debug!(generation, url = %self.url, "starting alert stream");
        lifecycle.cancel = Some(cancel);
        lifecycle.task = Some(tokio::spawn(worker.run()));
    }

    /// Tear down: cancel any pending retry, close the channel and retire
    /// the generation. Idempotent and valid in every phase, including from
    /// inside a hub subscriber.
    pub fn stop(&self) {
        drop(self.halt());
    }

    /// [`stop`](Self::stop), then wait for the worker to finish closing
    /// the channel.
    pub async fn shutdown(&self) {
        if let Some(task) = self.halt() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "alert stream worker failed");
            }
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        lock(&self.lifecycle).state.phase()
    }

    /// Snapshot of the full lifecycle state.
    pub fn state(&self) -> ConnectionState {
        lock(&self.lifecycle).state.clone()
    }

    fn halt(&self) -> Option<JoinHandle<()>> {
        let (was_active, task) = {
            let mut lifecycle = lock(&self.lifecycle);
            let was_active = lifecycle.state.stop();
            if let Some(cancel) = lifecycle.cancel.take() {
                cancel.cancel();
            }
            if was_active {
                tracing::debug!(
                    generation = lifecycle.state.generation(),
                    "alert stream stopped"
                );
            }
            (was_active, lifecycle.task.take())
        };

        if was_active {
            self.hub.defer_connected(false);
        }
        // Passing through the gate waits out a hub call in flight on
        // another thread and applies the flag. From inside a subscriber the
        // gate is already ours: the enclosing dispatch applies it once its
        // fan-out returns, and the bumped generation keeps the old worker
        // out afterwards.
        drop(self.hub.dispatch());
        task
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("url", &self.url.as_str())
            .field("phase", &self.phase())
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

// ── Worker ───────────────────────────────────────────────────────────

/// How a read loop ended.
enum ReadEnd {
    /// Server close frame or end of stream.
    Closed,
    /// Local teardown.
    Cancelled,
}

struct Worker {
    url: Url,
    connector: Arc<dyn Connector>,
    hub: Arc<EventHub>,
    notifier: Arc<dyn Notifier>,
    retry_delay: Duration,
    close_timeout: Duration,
    lifecycle: Arc<Mutex<Lifecycle>>,
    generation: u64,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.url) => result,
            };

            match connected {
                Ok(mut channel) => {
                    if !self.on_open() {
                        self.close_channel(channel).await;
                        break;
                    }
                    attempt = 0;

                    match self.read_frames(&mut channel).await {
                        ReadEnd::Cancelled => {
                            self.close_channel(channel).await;
                            break;
                        }
                        ReadEnd::Closed => {
                            tracing::info!(generation = self.generation, "alert channel closed");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "alert channel connect failed");
                }
            }

            let Some((deadline, retry)) = self.on_close() else {
                break;
            };
            tracing::info!(
                delay_ms = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );

            tokio::select! {
                biased;
                () = retry.cancelled() => break,
                () = tokio::time::sleep_until(deadline) => {}
            }

            if lock(&self.lifecycle).state.fire_retry(self.generation) == Transition::Stale {
                break;
            }
            attempt = attempt.saturating_add(1);
            tracing::debug!(attempt, "attempting to reconnect");
        }

        tracing::debug!(generation = self.generation, "alert stream worker exiting");
    }

    /// Read frames until the channel ends or the worker is cancelled.
    async fn read_frames(&self, channel: &mut Channel) -> ReadEnd {
        loop {
            let frame = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return ReadEnd::Cancelled,
                frame = channel.next_frame() => frame,
            };

            match frame {
                Some(Ok(Frame::Text(text))) => match decode_event(&text) {
                    Ok(event) => {
                        let event_id = event.event_id.clone();
                        let delivered = self.deliver(|hub| hub.publish(event));
                        if !delivered {
                            return ReadEnd::Cancelled;
                        }
                        tracing::trace!(event_id = %event_id, "event delivered");
                    }
                    Err(malformed) => discard(&malformed),
                },
                Some(Ok(Frame::Binary(bytes))) => discard(&MalformedFrame::non_text(bytes.len())),
                Some(Ok(Frame::Close(info))) => {
                    if let Some(info) = info {
                        tracing::debug!(code = info.code, reason = %info.reason, "close frame received");
                    }
                    return ReadEnd::Closed;
                }
                Some(Err(e)) => {
                    // The close that follows decides what happens next.
                    tracing::warn!(error = %e, "alert channel error");
                }
                None => return ReadEnd::Closed,
            }
        }
    }

    fn on_open(&self) -> bool {
        let applied = self.deliver_if(
            |state| state.opened(self.generation) == Transition::Applied,
            |hub| hub.set_connected(true),
        );
        if applied {
            tracing::info!(generation = self.generation, url = %self.url, "alert channel open");
            self.notifier.notify(&Notice::Connected {
                url: self.url.clone(),
            });
        }
        applied
    }

    /// Record the close and return the retry to wait for.
    fn on_close(&self) -> Option<(Instant, CancellationToken)> {
        let deadline = Instant::now() + self.retry_delay;
        let retry = self.cancel.child_token();
        let mut scheduled = None;

        self.deliver_if(
            |state| match state.closed(self.generation, deadline, retry.clone()) {
                CloseOutcome::Scheduled(at) => {
                    scheduled = Some(at);
                    true
                }
                CloseOutcome::AlreadyScheduled(at) => {
                    scheduled = Some(at);
                    false
                }
                CloseOutcome::Stale => false,
            },
            |hub| hub.set_connected(false),
        );

        let pending = lock(&self.lifecycle)
            .state
            .pending_retry()
            .map(|p| p.cancel.clone());
        Some((scheduled?, pending?))
    }

    fn deliver(&self, f: impl FnOnce(&Dispatch<'_>)) -> bool {
        self.deliver_if(|_| true, f)
    }

    /// Apply `transition` to the lifecycle state and, if it succeeds and
    /// this worker is still current, run `f` against the hub. `stop()`
    /// cannot complete while `f` runs.
    fn deliver_if(
        &self,
        transition: impl FnOnce(&mut ConnectionState) -> bool,
        f: impl FnOnce(&Dispatch<'_>),
    ) -> bool {
        let Ok(dispatch) = self.hub.dispatch() else {
            tracing::error!(generation = self.generation, "re-entrant delivery dropped");
            return false;
        };

        {
            let mut lifecycle = lock(&self.lifecycle);
            if lifecycle.state.generation() != self.generation || self.cancel.is_cancelled() {
                tracing::error!(
                    generation = self.generation,
                    current = lifecycle.state.generation(),
                    "stale generation; dropping callback"
                );
                return false;
            }
            if !transition(&mut lifecycle.state) {
                return false;
            }
        }

        f(&dispatch);
        true
    }

    async fn close_channel(&self, channel: Channel) {
        if tokio::time::timeout(self.close_timeout, channel.close())
            .await
            .is_err()
        {
            tracing::debug!("alert channel close timed out");
        }
    }
}

fn discard(malformed: &MalformedFrame) {
    tracing::warn!(kind = %malformed.kind, error = %malformed, "discarding malformed frame");
}

// ── Tests ────────────────────────────────────────────────────────────
