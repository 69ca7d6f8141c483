//! Dispatch Monitor Environment Abstraction Layer
//!
//! This crate provides the seams that let the monitor's lifecycle and polling
//! logic run against either the **live** backend (tokio + HTTP) or a
//! **simulated** one (virtual clock + scripted responses).
//!
//! # Core Concept
//!
//! Everything the client does that touches the outside world goes through
//! one of two traits:
//! - Time and tasks (`now()`, `sleep()`, `spawn()`) via [`DispatchContext`]
//! - Backend commands and queries (`start`, `stop`, `restart`, `status`)
//!   via [`SimulationBackend`]
//!
//! With both under test control, poll ticks and in-flight responses can be
//! sequenced exactly, so races like "response arrives after halt" are
//! reproducible instead of timing-dependent.
//!
//! # Example
//!
//! ```ignore
//! use dispatch_env::{DispatchContext, SimulationBackend};
//!
//! async fn poll_once<Ctx: DispatchContext, B: SimulationBackend>(ctx: &Ctx, backend: &B) {
//!     ctx.sleep(Duration::from_millis(2000)).await;
//!     match backend.status().await {
//!         Ok(snapshot) => render(snapshot),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

mod backend;
mod context;
mod error;
mod http_impl;
mod tokio_impl;
mod types;

pub use backend::{BackendOp, SimulationBackend};
pub use context::DispatchContext;
pub use error::BackendError;
pub use http_impl::HttpBackend;
pub use tokio_impl::TokioContext;
pub use types::{
    Ambulance, AmbulanceState, BackendSummary, EntityId, Hospital, NodeIndex, Patient,
    PatientState, SessionId, SimulationConfig, StatusSnapshot,
};
