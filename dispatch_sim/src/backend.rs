//! Simulated backend with fault injection.
//!
//! `SimBackend` answers the client's HTTP surface in-process. A
//! `SimBackendController` sharing its state lets a scenario script the
//! awkward cases: failing a call, holding status responses in flight and
//! releasing them in any order.

use crate::generator::SnapshotGenerator;
use async_trait::async_trait;
use dispatch_env::{
    BackendError, BackendOp, BackendSummary, SimulationBackend, SimulationConfig, StatusSnapshot,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug)]
struct BackendState {
    running: bool,
    calls: Vec<BackendOp>,
    /// Queued failures, consumed one per call of that op
    failures: HashMap<BackendOp, VecDeque<BackendError>>,
    hold_status: bool,
    /// Gates of status calls waiting to be released, oldest first
    held: VecDeque<oneshot::Sender<()>>,
    generator: SnapshotGenerator,
}

type SharedState = Arc<Mutex<BackendState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the dispatch server.
pub struct SimBackend {
    state: SharedState,
}

impl SimBackend {
    /// Creates a stopped backend whose world is seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_generator(SnapshotGenerator::new(seed))
    }

    pub fn with_generator(generator: SnapshotGenerator) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                running: false,
                calls: Vec::new(),
                failures: HashMap::new(),
                hold_status: false,
                held: VecDeque::new(),
                generator,
            })),
        }
    }

    /// Returns a controller for scripting this backend.
    pub fn controller(&self) -> SimBackendController {
        SimBackendController {
            state: Arc::clone(&self.state),
        }
    }

    /// Logs the call and pops a queued failure for it, if any.
    fn record(&self, op: BackendOp) -> (MutexGuard<'_, BackendState>, Option<BackendError>) {
        let mut state = lock(&self.state);
        state.calls.push(op);
        let failure = state.failures.get_mut(&op).and_then(VecDeque::pop_front);
        if let Some(err) = &failure {
            debug!(%op, error = %err, "injected failure");
        }
        (state, failure)
    }
}

#[async_trait]
impl SimulationBackend for SimBackend {
    async fn start(&self, config: &SimulationConfig) -> Result<(), BackendError> {
        let (mut state, failure) = self.record(BackendOp::Start);
        if let Some(err) = failure {
            return Err(err);
        }
        state.running = true;
        state.generator.reset(*config);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        let (mut state, failure) = self.record(BackendOp::Stop);
        if let Some(err) = failure {
            return Err(err);
        }
        state.running = false;
        Ok(())
    }

    async fn restart(&self, config: &SimulationConfig) -> Result<(), BackendError> {
        let (mut state, failure) = self.record(BackendOp::Restart);
        if let Some(err) = failure {
            return Err(err);
        }
        state.running = true;
        state.generator.reset(*config);
        Ok(())
    }

    async fn status(&self) -> Result<StatusSnapshot, BackendError> {
        // The snapshot is taken when the request arrives, not when it is released
        let (result, gate) = {
            let (mut state, failure) = self.record(BackendOp::Status);
            let result = match failure {
                Some(err) => Err(err),
                None => Ok(state.generator.step()),
            };
            let gate = if state.hold_status {
                let (tx, rx) = oneshot::channel();
                state.held.push_back(tx);
                Some(rx)
            } else {
                None
            };
            (result, gate)
        };

        if let Some(gate) = gate {
            // A dropped gate releases the response too
            let _ = gate.await;
        }
        result
    }

    async fn summary(&self) -> Result<BackendSummary, BackendError> {
        let (state, failure) = self.record(BackendOp::Summary);
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(state.generator.summary())
    }
}

/// Fault injection and inspection handle for a [`SimBackend`].
#[derive(Clone)]
pub struct SimBackendController {
    state: SharedState,
}

impl SimBackendController {
    /// Queues a failure for the next call of `op`.
    pub fn fail_next(&self, op: BackendOp, err: BackendError) {
        lock(&self.state).failures.entry(op).or_default().push_back(err);
    }

    /// Holds every later status response until released.
    pub fn hold_status(&self, hold: bool) {
        lock(&self.state).hold_status = hold;
    }

    /// Number of status responses currently held.
    pub fn held_count(&self) -> usize {
        lock(&self.state).held.len()
    }

    /// Releases the oldest held response. Returns false if none was held.
    pub fn release_oldest(&self) -> bool {
        let gate = lock(&self.state).held.pop_front();
        gate.map(|tx| tx.send(()).is_ok()).unwrap_or(false)
    }

    /// Releases the most recently held response.
    pub fn release_newest(&self) -> bool {
        let gate = lock(&self.state).held.pop_back();
        gate.map(|tx| tx.send(()).is_ok()).unwrap_or(false)
    }

    /// Releases all held responses in arrival order.
    pub fn release_all(&self) -> usize {
        let gates: Vec<_> = lock(&self.state).held.drain(..).collect();
        gates.into_iter().map(|tx| tx.send(())).filter(Result::is_ok).count()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Config of the backend's current world.
    pub fn config(&self) -> Option<SimulationConfig> {
        lock(&self.state).generator.config()
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<BackendOp> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, op: BackendOp) -> usize {
        lock(&self.state).calls.iter().filter(|&&c| c == op).count()
    }
}
