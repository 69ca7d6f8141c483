//! Status Poller - keeps the latest snapshot fresh while a simulation runs.
//!
//! # Lifecycle
//!
//! ```text
//!   begin() ──► fetch #1 (immediate)
//!               sleep(interval) ──► fetch #2
//!               sleep(interval) ──► fetch #3 ...
//!   halt()  ──► ticker stops, late responses discarded
//! ```
//!
//! # Overlapping fetches
//!
//! The ticker fires on its own cadence and does not wait for the previous
//! fetch to settle, so two requests may be in flight at once. Every fetch
//! carries a sequence number; a successful response is applied only if no
//! newer fetch has already been applied. An older response can therefore
//! never overwrite a newer one, and a slow backend still gets its snapshots
//! shown.
//!
//! # Cancellation
//!
//! Each `begin()` opens a new generation. `halt()` closes it under the same
//! lock that guards the snapshot, so once `halt()` returns no response from
//! that generation can be applied, including one already in flight.

use crate::session::Session;
use dispatch_env::{BackendError, DispatchContext, SimulationBackend, StatusSnapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Counters describing poller activity (for diagnostics and tests).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Fetches issued to the backend
    pub fetches_started: u64,
    /// Snapshots that replaced the previous one
    pub applied: u64,
    /// Fetches that failed
    pub failed: u64,
    /// Responses dropped as stale or late
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct PollState {
    /// Bumped on every begin/halt; responses from another generation are dropped
    generation: u64,
    active: bool,
    shutdown: Option<oneshot::Sender<()>>,
    next_seq: u64,
    applied_seq: Option<u64>,
    snapshot: Option<Arc<StatusSnapshot>>,
    stats: PollStats,
}

impl PollState {
    fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }

    fn issue_fetch(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.fetches_started += 1;
        seq
    }
}

struct PollerInner<Ctx, B> {
    context: Arc<Ctx>,
    backend: Arc<B>,
    session: Arc<Session>,
    interval: Duration,
    state: Mutex<PollState>,
}

impl<Ctx, B> PollerInner<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    fn state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_fetch(self: &Arc<Self>, generation: u64, seq: u64) {
        let inner = Arc::clone(self);
        self.context.spawn("status-fetch", async move {
            let result = inner.backend.status().await;
            inner.apply(generation, seq, result);
        });
    }

    fn spawn_ticker(self: &Arc<Self>, generation: u64, mut shutdown: oneshot::Receiver<()>) {
        let inner = Arc::clone(self);
        self.context.spawn("status-ticker", async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = inner.context.sleep(inner.interval) => {}
                }

                let seq = {
                    let mut state = inner.state();
                    if !state.is_current(generation) {
                        break;
                    }
                    state.issue_fetch()
                };
                debug!(generation, seq, "poll tick");
                inner.spawn_fetch(generation, seq);
            }
            debug!(generation, "status ticker exited");
        });
    }

    fn apply(&self, generation: u64, seq: u64, result: Result<StatusSnapshot, BackendError>) {
        let mut state = self.state();

        if !state.is_current(generation) {
            state.stats.discarded += 1;
            debug!(generation, seq, "discarding response from halted poller");
            return;
        }

        match result {
            Ok(snapshot) => {
                if state.applied_seq.is_some_and(|applied| applied > seq) {
                    state.stats.discarded += 1;
                    debug!(seq, "discarding stale snapshot");
                    return;
                }
                state.snapshot = Some(Arc::new(snapshot));
                state.applied_seq = Some(seq);
                state.stats.applied += 1;
            }
            Err(err) => {
                state.stats.failed += 1;
                warn!(seq, error = %err, "status fetch failed");
                self.session.log().record(format!("Failed to fetch status: {err}"));
            }
        }
    }
}

/// Periodic status fetcher owning the latest snapshot.
pub struct StatusPoller<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    inner: Arc<PollerInner<Ctx, B>>,
}

impl<Ctx, B> StatusPoller<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    /// Creates an inactive poller.
    pub fn new(context: Arc<Ctx>, backend: Arc<B>, session: Arc<Session>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                context,
                backend,
                session,
                interval,
                state: Mutex::new(PollState::default()),
            }),
        }
    }

    /// Starts polling: one fetch now, then one per interval.
    ///
    /// No-op while already active.
    pub fn begin(&self) {
        let (generation, shutdown, seq) = {
            let mut state = self.inner.state();
            if state.active {
                debug!("status poller already active");
                return;
            }
            state.active = true;
            state.generation += 1;

            let (tx, rx) = oneshot::channel();
            state.shutdown = Some(tx);
            let seq = state.issue_fetch();
            (state.generation, rx, seq)
        };

        info!(
            generation,
            interval_ms = self.inner.interval.as_millis() as u64,
            "status polling started"
        );
        self.inner.spawn_fetch(generation, seq);
        self.inner.spawn_ticker(generation, shutdown);
    }

    /// Stops polling. Safe to call when inactive.
    ///
    /// After this returns no further snapshot update happens until the next
    /// `begin()`.
    pub fn halt(&self) {
        let mut state = self.inner.state();
        if !state.active {
            return;
        }
        state.active = false;
        state.generation += 1;
        if let Some(shutdown) = state.shutdown.take() {
            let _ = shutdown.send(());
        }
        info!(generation = state.generation, "status polling halted");
    }

    /// Halts and forgets the current snapshot.
    pub fn reset(&self) {
        self.halt();
        let mut state = self.inner.state();
        state.snapshot = None;
        state.applied_seq = None;
    }

    /// Discards the current snapshot and starts a fresh polling run.
    pub fn restart(&self) {
        self.reset();
        self.begin();
    }

    /// The most recently applied snapshot.
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.inner.state().snapshot.clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner.state().active
    }

    pub fn stats(&self) -> PollStats {
        self.inner.state().stats
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl<Ctx, B> Drop for StatusPoller<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dispatch_env::{BackendSummary, SimulationConfig, TokioContext};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Answers every status call immediately with a snapshot stamped by call number.
    #[derive(Default)]
    struct CountingBackend {
        status_calls: AtomicU64,
    }

    #[async_trait]
    impl SimulationBackend for CountingBackend {
        async fn start(&self, _config: &SimulationConfig) -> Result<(), BackendError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn restart(&self, _config: &SimulationConfig) -> Result<(), BackendError> {
            Ok(())
        }

        async fn status(&self) -> Result<StatusSnapshot, BackendError> {
            let n = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(StatusSnapshot {
                time: n as f64,
                ..Default::default()
            })
        }

        async fn summary(&self) -> Result<BackendSummary, BackendError> {
            Ok(BackendSummary::default())
        }
    }

    fn poller() -> (StatusPoller<TokioContext, CountingBackend>, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        let poller = StatusPoller::new(
            TokioContext::shared(),
            Arc::clone(&backend),
            Session::shared(),
            Duration::from_secs(3600),
        );
        (poller, backend)
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_begin_fetches_immediately() {
        let (poller, backend) = poller();
        poller.begin();
        settle().await;

        assert_eq!(backend.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.snapshot().map(|s| s.time), Some(1.0));
        assert!(poller.is_active());
    }

    #[tokio::test]
    async fn test_begin_is_idempotent() {
        let (poller, backend) = poller();
        poller.begin();
        poller.begin();
        settle().await;

        assert_eq!(backend.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.stats().fetches_started, 1);
    }

    #[tokio::test]
    async fn test_halt_when_inactive_is_safe() {
        let (poller, _backend) = poller();
        poller.halt();
        poller.halt();
        assert!(!poller.is_active());
    }

    #[tokio::test]
    async fn test_restart_discards_snapshot() {
        let (poller, backend) = poller();
        poller.begin();
        settle().await;
        assert!(poller.snapshot().is_some());

        poller.reset();
        assert!(poller.snapshot().is_none());

        poller.begin();
        settle().await;
        assert_eq!(backend.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(poller.snapshot().map(|s| s.time), Some(2.0));
    }
}
