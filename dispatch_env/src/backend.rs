//! Backend collaborator abstraction.

use crate::error::BackendError;
use crate::types::{BackendSummary, SimulationConfig, StatusSnapshot};
use async_trait::async_trait;
use std::fmt;

/// The simulation service as seen by the client.
///
/// # Implementations
///
/// - **Production**: `HttpBackend` - JSON over HTTP to the dispatch service
/// - **Simulation**: `SimBackend` (dispatch_sim) - in-process, scriptable faults
///
/// # Call Semantics
///
/// Every call is a single unary request. Callers never retry; a failure is
/// reported once and the caller decides what state survives it.
///
/// ```text
/// Client                       Backend
///   |-- start(config) ------------>|
///   |<------------- Ok / Err ------|
///   |-- status() ----------------->|
///   |<-------- StatusSnapshot -----|
/// ```
#[async_trait]
pub trait SimulationBackend: Send + Sync + 'static {
    /// Initializes the simulation with `config` and starts it.
    async fn start(&self, config: &SimulationConfig) -> Result<(), BackendError>;

    /// Stops the running simulation.
    async fn stop(&self) -> Result<(), BackendError>;

    /// Stops, re-initializes with `config`, and starts again.
    async fn restart(&self, config: &SimulationConfig) -> Result<(), BackendError>;

    /// Fetches the current point-in-time view of all entities.
    async fn status(&self) -> Result<StatusSnapshot, BackendError>;

    /// Fetches aggregate delivery statistics.
    async fn summary(&self) -> Result<BackendSummary, BackendError>;
}

/// Backend operation identifiers (for logging and fault injection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Start,
    Stop,
    Restart,
    Status,
    Summary,
}

impl BackendOp {
    /// Returns the operation name.
    pub fn name(&self) -> &'static str {
        match self {
            BackendOp::Start => "start",
            BackendOp::Stop => "stop",
            BackendOp::Restart => "restart",
            BackendOp::Status => "status",
            BackendOp::Summary => "summary",
        }
    }

    /// Returns the REST path serving this operation.
    pub fn path(&self) -> &'static str {
        match self {
            BackendOp::Start => "/api/start",
            BackendOp::Stop => "/api/stop",
            BackendOp::Restart => "/api/restart",
            BackendOp::Status => "/api/status",
            BackendOp::Summary => "/api/summary",
        }
    }
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
