//! Dispatch Core - monitoring and control client for an ambulance dispatch simulation
//!
//! The backend owns the simulation. This library owns everything on the
//! client side of the wire:
//! 1. **Validation**: raw user input becomes a [`SimulationConfig`](dispatch_env::SimulationConfig) or a field-level error
//! 2. **Lifecycle**: start/stop/restart guarded by the IDLE/RUNNING phase
//! 3. **Polling**: a periodic status fetch that never lets a stale or late response win
//! 4. **Presentation**: ring map layout and summary figures derived from a snapshot

pub mod config;
pub mod lifecycle;
pub mod map_layout;
pub mod poller;
pub mod session;
pub mod summary;
pub mod validation;

#[cfg(feature = "dashboard")]
pub mod dashboard;

// Re-export key types for convenience
pub use config::{ClientConfig, DEFAULT_MAX_NODES, DEFAULT_POLL_INTERVAL, FALLBACK_POINTS};
pub use lifecycle::{LifecycleController, LifecycleError, Phase, RunState};
pub use map_layout::{layout, LayoutConfig, LayoutNode, MapLayout, MapLayoutEngine, RingEdge};
pub use poller::{PollStats, StatusPoller};
pub use session::{Session, StatusLog};
pub use summary::{StandbyRoster, StatusSummary};
pub use validation::{validate, ConfigField, ConfigInput, ValidationError, INVALID_CONFIG_MESSAGE};
