//! Lifecycle Controller - the client's run/stop/restart state machine.
//!
//! # State Machine
//!
//! ```text
//!                 start (ok)
//!        ┌──────────────────────────┐
//!        │                          ▼
//!   ┌────┴────┐   stop (ok)    ┌─────────┐
//!   │  IDLE   │◄───────────────┤ RUNNING │◄──┐
//!   └────┬────┘                └────┬────┘   │ restart (ok)
//!        │      restart (ok)        └────────┘
//!        └──────────────────────────────►
//! ```
//!
//! Commands inconsistent with the current phase (`start` while running,
//! `stop` while idle) are rejected here, not by whatever front end is
//! attached. Every method takes `&mut self`, so one transition's backend call
//! always settles before the next transition can begin.
//!
//! A failed backend call leaves the phase untouched; it only records the
//! error. Nothing is retried.

use crate::poller::StatusPoller;
use crate::session::Session;
use crate::validation::{ConfigInput, ValidationError};
use dispatch_env::{
    BackendError, BackendOp, BackendSummary, DispatchContext, SimulationBackend,
    SimulationConfig, StatusSnapshot,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Client-side lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("IDLE"),
            Phase::Running => f.write_str("RUNNING"),
        }
    }
}

/// The one run state of a client session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub phase: Phase,
    /// Message of the most recent failed or rejected command
    pub last_error: Option<String>,
}

/// Why a lifecycle command did not take effect.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("cannot {op} while {phase}")]
    InvalidTransition { op: BackendOp, phase: Phase },

    #[error("{op} failed: {source}")]
    Backend {
        op: BackendOp,
        #[source]
        source: BackendError,
    },
}

/// Owns [`RunState`] and the [`StatusPoller`], and issues lifecycle commands.
pub struct LifecycleController<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    backend: Arc<B>,
    session: Arc<Session>,
    poller: StatusPoller<Ctx, B>,
    run_state: RunState,
    /// Config of the last successful start/restart
    active_config: Option<SimulationConfig>,
}

impl<Ctx, B> LifecycleController<Ctx, B>
where
    Ctx: DispatchContext,
    B: SimulationBackend,
{
    /// Creates an idle controller polling every `poll_interval` once running.
    pub fn new(
        context: Arc<Ctx>,
        backend: Arc<B>,
        session: Arc<Session>,
        poll_interval: Duration,
    ) -> Self {
        let poller = StatusPoller::new(
            context,
            Arc::clone(&backend),
            Arc::clone(&session),
            poll_interval,
        );

        Self {
            backend,
            session,
            poller,
            run_state: RunState::default(),
            active_config: None,
        }
    }

    /// Validates `input` and starts the simulation. Only permitted while idle.
    pub async fn start(&mut self, input: &ConfigInput) -> Result<(), LifecycleError> {
        self.require_phase(BackendOp::Start, Phase::Idle)?;
        let config = self.validated(input)?;

        self.session.log().record("Starting simulation...");
        if let Err(err) = self.backend.start(&config).await {
            return Err(self.backend_failed(BackendOp::Start, err));
        }

        self.enter_running(config);
        self.poller.begin();
        self.session.log().record("Simulation started");
        Ok(())
    }

    /// Stops the simulation. Only permitted while running.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        self.require_phase(BackendOp::Stop, Phase::Running)?;

        self.session.log().record("Stopping simulation...");
        if let Err(err) = self.backend.stop().await {
            return Err(self.backend_failed(BackendOp::Stop, err));
        }

        self.poller.halt();
        self.run_state = RunState {
            phase: Phase::Idle,
            last_error: None,
        };
        info!(session = %self.session.id(), "simulation stopped");
        self.session.log().record("Simulation stopped");
        Ok(())
    }

    /// Validates `input` and restarts the simulation from either phase.
    ///
    /// On success the previous snapshot is discarded and polling starts over.
    pub async fn restart(&mut self, input: &ConfigInput) -> Result<(), LifecycleError> {
        let config = self.validated(input)?;

        self.session.log().record("Restarting simulation...");
        if let Err(err) = self.backend.restart(&config).await {
            return Err(self.backend_failed(BackendOp::Restart, err));
        }

        self.enter_running(config);
        self.poller.restart();
        self.session.log().record("Simulation restarted");
        Ok(())
    }

    /// Queries the backend's delivery statistics. Does not touch the run state.
    pub async fn fetch_summary(&self) -> Result<BackendSummary, LifecycleError> {
        self.backend.summary().await.map_err(|err| {
            warn!(error = %err, "summary fetch failed");
            self.session
                .log()
                .record(format!("Failed to fetch summary: {err}"));
            LifecycleError::Backend {
                op: BackendOp::Summary,
                source: err,
            }
        })
    }

    /// Stops local polling without contacting the backend (client shutdown).
    pub fn teardown(&mut self) {
        self.poller.halt();
    }

    pub fn phase(&self) -> Phase {
        self.run_state.phase
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    /// The most recent snapshot held by the poller.
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.poller.snapshot()
    }

    pub fn active_config(&self) -> Option<SimulationConfig> {
        self.active_config
    }

    /// Point count to lay the map out with: the active config's, else `fallback`.
    pub fn map_points(&self, fallback: u32) -> u32 {
        self.active_config
            .map(|config| config.points.get())
            .unwrap_or(fallback)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn poller(&self) -> &StatusPoller<Ctx, B> {
        &self.poller
    }

    fn require_phase(&mut self, op: BackendOp, required: Phase) -> Result<(), LifecycleError> {
        let phase = self.run_state.phase;
        if phase == required {
            return Ok(());
        }

        let message = match phase {
            Phase::Running => "Simulation is already running",
            Phase::Idle => "Simulation is not running",
        };
        warn!(%op, %phase, "rejected lifecycle command");
        self.session.log().record(message);
        self.run_state.last_error = Some(message.to_string());
        Err(LifecycleError::InvalidTransition { op, phase })
    }

    fn validated(&mut self, input: &ConfigInput) -> Result<SimulationConfig, LifecycleError> {
        input.validate().map_err(|err| {
            warn!(error = %err, "configuration rejected");
            self.session.log().record(err.user_message());
            self.run_state.last_error = Some(err.user_message().to_string());
            LifecycleError::Validation(err)
        })
    }

    fn enter_running(&mut self, config: SimulationConfig) {
        self.run_state = RunState {
            phase: Phase::Running,
            last_error: None,
        };
        self.active_config = Some(config);
        info!(
            session = %self.session.id(),
            points = config.points.get(),
            hospitals = config.hospitals.get(),
            ambulances = config.ambulances.get(),
            "simulation running"
        );
    }

    fn backend_failed(&mut self, op: BackendOp, err: BackendError) -> LifecycleError {
        let message = format!("Failed to {op} simulation: {err}");
        warn!(%op, error = %err, phase = %self.run_state.phase, "backend call failed");
        self.session.log().record(message.clone());
        self.run_state.last_error = Some(message);
        LifecycleError::Backend { op, source: err }
    }
}
