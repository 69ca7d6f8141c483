//! Scenario runner - drives the real lifecycle controller against the
//! simulated backend on a virtual clock.

use crate::backend::{SimBackend, SimBackendController};
use crate::context::{advance_by, settle, SimContext};
use crate::scenarios::ScenarioId;

use dispatch_core::{
    ConfigField, ConfigInput, LifecycleController, LifecycleError, Phase, Session,
    DEFAULT_POLL_INTERVAL, INVALID_CONFIG_MESSAGE,
};
use dispatch_env::{BackendError, BackendOp, DispatchContext, SessionId, SimulationConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Returns early from a scenario with a formatted failure reason.
macro_rules! ensure {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            return Err(format!($($msg)+));
        }
    };
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Status requests the backend received
    pub status_fetches: u64,

    /// Snapshots the poller applied
    pub snapshots_applied: u64,

    /// Status fetches that failed
    pub fetch_failures: u64,

    /// Responses dropped as stale or late
    pub responses_discarded: u64,

    /// All backend calls, any operation
    pub backend_calls: u64,

    /// Virtual time elapsed
    pub virtual_time_ms: u64,
}

/// One controller wired to a simulated backend and clock.
struct Harness {
    context: Arc<SimContext>,
    backend: SimBackendController,
    controller: LifecycleController<SimContext, SimBackend>,
    interval: Duration,
    step: Duration,
}

impl Harness {
    fn new(seed: u64, interval: Duration) -> Self {
        let context = SimContext::shared(seed);
        let backend = Arc::new(SimBackend::new(seed));
        let controller_handle = backend.controller();
        let session = Arc::new(Session::with_id(SessionId::from_seed(seed)));
        let controller = LifecycleController::new(Arc::clone(&context), backend, session, interval);

        Self {
            context,
            backend: controller_handle,
            controller,
            interval,
            step: (interval / 20).max(Duration::from_millis(1)),
        }
    }

    /// Moves virtual time forward by `intervals` poll intervals.
    async fn advance(&self, intervals: u32) {
        advance_by(&self.context, self.interval * intervals, self.step).await;
    }

    fn status_calls(&self) -> usize {
        self.backend.call_count(BackendOp::Status)
    }

    fn snapshot_time(&self) -> Option<f64> {
        self.controller.snapshot().map(|s| s.time)
    }

    fn last_log(&self) -> String {
        self.controller.session().log().latest().unwrap_or_default()
    }

    fn metrics(&self) -> ScenarioMetrics {
        let stats = self.controller.poller().stats();
        ScenarioMetrics {
            status_fetches: self.status_calls() as u64,
            snapshots_applied: stats.applied,
            fetch_failures: stats.failed,
            responses_discarded: stats.discarded,
            backend_calls: self.backend.calls().len() as u64,
            virtual_time_ms: self.context.now().as_millis() as u64,
        }
    }
}

fn counts(points: i64, hospitals: i64, ambulances: i64) -> ConfigInput {
    ConfigInput::from_counts(points, hospitals, ambulances)
}

fn sim_config(points: u32, hospitals: u32, ambulances: u32) -> Option<SimulationConfig> {
    SimulationConfig::new(points, hospitals, ambulances)
}

/// Runs client behaviour scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Poll interval in virtual time
    poll_interval: Duration,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs a scenario and returns the result.
    ///
    /// Must be awaited on a current-thread runtime for deterministic ordering.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut harness = Harness::new(self.seed, self.poll_interval);
        let outcome = match scenario {
            ScenarioId::HappyPath => Self::run_happy_path(&mut harness).await,
            ScenarioId::FlakyBackend => Self::run_flaky_backend(&mut harness).await,
            ScenarioId::SlowStatus => Self::run_slow_status(&mut harness).await,
            ScenarioId::RestartWhileRunning => Self::run_restart_while_running(&mut harness).await,
            ScenarioId::ValidationGate => Self::run_validation_gate(&mut harness).await,
            ScenarioId::OverlappingPolls => Self::run_overlapping_polls(&mut harness).await,
        };

        harness.controller.teardown();
        harness.backend.release_all();
        settle().await;

        let metrics = harness.metrics();
        debug!(?metrics, "scenario finished");
        if let Err(reason) = &outcome {
            warn!(scenario = scenario.name(), %reason, "scenario failed");
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            failure_reason: outcome.err(),
            metrics,
        }
    }

    /// SIM-001: one immediate fetch, one per interval, none after stop.
    async fn run_happy_path(h: &mut Harness) -> Result<(), String> {
        h.controller
            .start(&counts(10, 2, 4))
            .await
            .map_err(|e| format!("start failed: {e}"))?;
        settle().await;

        ensure!(h.status_calls() == 1, "expected one immediate fetch, saw {}", h.status_calls());
        ensure!(h.snapshot_time() == Some(1.0), "first snapshot not applied: {:?}", h.snapshot_time());
        ensure!(h.backend.config() == sim_config(10, 2, 4), "backend started with wrong config");

        h.advance(1).await;
        ensure!(h.status_calls() == 2, "expected second fetch after one interval, saw {}", h.status_calls());

        h.advance(5).await;
        ensure!(h.status_calls() == 7, "expected 7 fetches after six intervals, saw {}", h.status_calls());
        ensure!(h.snapshot_time() == Some(7.0), "latest snapshot not shown: {:?}", h.snapshot_time());

        h.controller.stop().await.map_err(|e| format!("stop failed: {e}"))?;
        ensure!(h.controller.phase() == Phase::Idle, "phase after stop: {}", h.controller.phase());
        ensure!(h.last_log() == "Simulation stopped", "unexpected log: {}", h.last_log());

        let before = h.status_calls();
        h.advance(3).await;
        ensure!(h.status_calls() == before, "polling continued after stop");
        Ok(())
    }

    /// SIM-002: failures are logged and leave the last good state in place.
    async fn run_flaky_backend(h: &mut Harness) -> Result<(), String> {
        h.controller
            .start(&counts(10, 2, 4))
            .await
            .map_err(|e| format!("start failed: {e}"))?;
        settle().await;

        h.backend.fail_next(
            BackendOp::Status,
            BackendError::Status {
                code: 503,
                body: "busy".to_string(),
            },
        );
        h.advance(1).await;
        ensure!(h.status_calls() == 2, "second fetch not issued");
        ensure!(h.snapshot_time() == Some(1.0), "failed fetch replaced snapshot: {:?}", h.snapshot_time());
        ensure!(
            h.last_log().starts_with("Failed to fetch status:"),
            "fetch failure not logged: {}",
            h.last_log()
        );
        ensure!(h.controller.phase() == Phase::Running, "fetch failure changed phase");

        // Failed requests do not advance the simulated world
        h.advance(1).await;
        ensure!(h.snapshot_time() == Some(2.0), "polling did not recover: {:?}", h.snapshot_time());

        h.controller.stop().await.map_err(|e| format!("stop failed: {e}"))?;
        h.backend.fail_next(BackendOp::Start, BackendError::network("connection refused"));
        match h.controller.start(&counts(10, 2, 4)).await {
            Err(LifecycleError::Backend { op: BackendOp::Start, .. }) => {}
            other => return Err(format!("expected start failure, got {other:?}")),
        }
        ensure!(h.controller.phase() == Phase::Idle, "failed start left phase {}", h.controller.phase());
        ensure!(
            h.last_log().starts_with("Failed to start simulation"),
            "start failure not logged: {}",
            h.last_log()
        );
        ensure!(h.controller.run_state().last_error.is_some(), "last_error not recorded");

        let before = h.status_calls();
        h.advance(2).await;
        ensure!(h.status_calls() == before, "failed start began polling");
        Ok(())
    }

    /// SIM-003: a response still in flight at stop must be ignored.
    async fn run_slow_status(h: &mut Harness) -> Result<(), String> {
        h.backend.hold_status(true);
        h.controller
            .start(&counts(6, 1, 2))
            .await
            .map_err(|e| format!("start failed: {e}"))?;
        settle().await;
        ensure!(h.backend.held_count() == 1, "expected one held fetch, saw {}", h.backend.held_count());
        ensure!(h.snapshot_time().is_none(), "held response applied early");

        h.controller.stop().await.map_err(|e| format!("stop failed: {e}"))?;
        h.backend.release_all();
        settle().await;

        ensure!(h.snapshot_time().is_none(), "late response updated snapshot after stop");
        let stats = h.controller.poller().stats();
        ensure!(stats.discarded == 1, "expected one discarded response, saw {}", stats.discarded);
        Ok(())
    }

    /// SIM-004: restart replaces both the world and the displayed snapshot.
    async fn run_restart_while_running(h: &mut Harness) -> Result<(), String> {
        h.controller
            .start(&counts(10, 2, 4))
            .await
            .map_err(|e| format!("start failed: {e}"))?;
        settle().await;
        h.advance(2).await;
        ensure!(h.snapshot_time() == Some(3.0), "pre-restart snapshot: {:?}", h.snapshot_time());

        h.controller
            .restart(&counts(8, 3, 5))
            .await
            .map_err(|e| format!("restart failed: {e}"))?;
        settle().await;

        let snapshot = h.controller.snapshot().ok_or("no snapshot after restart")?;
        ensure!(snapshot.time == 1.0, "old snapshot survived restart: t={}", snapshot.time);
        ensure!(snapshot.hospitals.len() == 3, "restart world has {} hospitals", snapshot.hospitals.len());
        ensure!(snapshot.ambulances.len() == 5, "restart world has {} ambulances", snapshot.ambulances.len());
        ensure!(h.controller.active_config() == sim_config(8, 3, 5), "active config not replaced");
        ensure!(h.controller.map_points(6) == 8, "map points not taken from new config");
        ensure!(h.status_calls() == 4, "expected 4 fetches, saw {}", h.status_calls());

        // A single ticker after restart
        h.advance(1).await;
        ensure!(h.status_calls() == 5, "duplicate polling after restart: {}", h.status_calls());
        Ok(())
    }

    /// SIM-005: invalid config never reaches the backend; phase guards hold.
    async fn run_validation_gate(h: &mut Harness) -> Result<(), String> {
        let invalid = [
            ConfigInput::new(),
            counts(10, 2, 4).with(ConfigField::Points, "abc"),
            counts(10, 2, 4).with(ConfigField::Hospitals, "0"),
            counts(10, 2, 4).with(ConfigField::Ambulances, "-3"),
            counts(10, 2, 4).with(ConfigField::Points, "1.5"),
        ];

        for input in &invalid {
            match h.controller.start(input).await {
                Err(LifecycleError::Validation(_)) => {}
                other => return Err(format!("expected validation error for {input:?}, got {other:?}")),
            }
            ensure!(h.last_log() == INVALID_CONFIG_MESSAGE, "unexpected message: {}", h.last_log());

            match h.controller.restart(input).await {
                Err(LifecycleError::Validation(_)) => {}
                other => return Err(format!("restart accepted {input:?}: {other:?}")),
            }
        }
        ensure!(h.backend.calls().is_empty(), "backend contacted: {:?}", h.backend.calls());

        h.controller
            .start(&counts(10, 2, 4))
            .await
            .map_err(|e| format!("valid start failed: {e}"))?;
        match h.controller.start(&counts(10, 2, 4)).await {
            Err(LifecycleError::InvalidTransition { .. }) => {}
            other => return Err(format!("second start not rejected: {other:?}")),
        }
        ensure!(h.last_log() == "Simulation is already running", "unexpected message: {}", h.last_log());
        ensure!(h.backend.call_count(BackendOp::Start) == 1, "duplicate start sent");

        h.controller.stop().await.map_err(|e| format!("stop failed: {e}"))?;
        match h.controller.stop().await {
            Err(LifecycleError::InvalidTransition { .. }) => {}
            other => return Err(format!("second stop not rejected: {other:?}")),
        }
        ensure!(h.last_log() == "Simulation is not running", "unexpected message: {}", h.last_log());
        ensure!(h.backend.call_count(BackendOp::Stop) == 1, "duplicate stop sent");
        Ok(())
    }

    /// SIM-006: newest applied response wins over a late older one.
    async fn run_overlapping_polls(h: &mut Harness) -> Result<(), String> {
        h.backend.hold_status(true);
        h.controller
            .start(&counts(10, 2, 4))
            .await
            .map_err(|e| format!("start failed: {e}"))?;
        settle().await;
        h.advance(1).await;
        ensure!(h.backend.held_count() == 2, "expected two fetches in flight, saw {}", h.backend.held_count());

        h.backend.release_newest();
        settle().await;
        ensure!(h.snapshot_time() == Some(2.0), "newer response not applied: {:?}", h.snapshot_time());

        h.backend.release_oldest();
        settle().await;
        ensure!(h.snapshot_time() == Some(2.0), "stale response overwrote snapshot: {:?}", h.snapshot_time());
        let stats = h.controller.poller().stats();
        ensure!(stats.discarded == 1, "expected stale response discarded, saw {}", stats.discarded);

        h.backend.hold_status(false);
        h.advance(1).await;
        ensure!(h.snapshot_time() == Some(3.0), "polling stalled after overlap: {:?}", h.snapshot_time());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(42);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario).await;
            assert!(
                result.passed,
                "{} failed: {:?}",
                scenario,
                result.failure_reason
            );
        }
    }

    #[tokio::test]
    async fn test_results_do_not_depend_on_seed() {
        for seed in [1, 7, 1_000_003] {
            let result = ScenarioRunner::new(seed).run(ScenarioId::HappyPath).await;
            assert!(result.passed, "seed {seed}: {:?}", result.failure_reason);
            assert_eq!(result.metrics.status_fetches, 7);
        }
    }

    #[tokio::test]
    async fn test_custom_interval() {
        let result = ScenarioRunner::new(3)
            .with_poll_interval(Duration::from_millis(500))
            .run(ScenarioId::OverlappingPolls)
            .await;
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.virtual_time_ms, 1000);
    }
}
