//! Dispatch Monitor Deterministic Simulation Harness
//!
//! This crate runs the real client lifecycle and polling code against an
//! in-process backend, with every source of non-determinism under control:
//! - **Time**: a virtual clock that only moves when the harness advances it
//! - **Backend**: scripted failures and status responses held in flight
//! - **World**: snapshots generated from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                     │
//! │  ┌──────────────────────┐    ┌────────────────────┐  │
//! │  │ LifecycleController  │───►│     SimBackend     │  │
//! │  │   + StatusPoller     │◄───│ (SnapshotGenerator)│  │
//! │  └──────────┬───────────┘    └─────────▲──────────┘  │
//! │             │ sleep/spawn              │ fail/hold   │
//! │  ┌──────────▼───────────┐    ┌─────────┴──────────┐  │
//! │  │     SimContext       │    │SimBackendController│  │
//! │  │   (virtual clock)    │    │                    │  │
//! │  └──────────────────────┘    └────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dispatch_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::OverlappingPolls).await;
//! assert!(result.passed);
//! ```

mod backend;
mod context;
mod generator;
mod runner;
pub mod scenarios;

pub use backend::{SimBackend, SimBackendController};
pub use context::{advance_by, settle, SimContext};
pub use generator::SnapshotGenerator;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
