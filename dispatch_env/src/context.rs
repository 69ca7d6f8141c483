//! Core environment context trait for the dispatch monitor.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// The central interface for time and task scheduling.
///
/// This trait abstracts the runtime so the poller's timer can be driven by
/// either the real clock (tokio) or a manually advanced virtual clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `tokio::spawn`
/// - **Simulation**: `SimContext` (dispatch_sim) - virtual clock advanced by the test
#[async_trait]
pub trait DispatchContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: resolves once the virtual clock has been advanced past
    /// the deadline
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    ///
    /// The name is used for tracing only.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
