//! Session context shared by the lifecycle controller and the status poller.
//!
//! A client instance owns exactly one [`Session`]. It replaces ambient
//! global state: everything that both components write to the user lives
//! here and is handed out by `Arc`.

use dispatch_env::SessionId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Single-slot status line.
///
/// Each `record` overwrites the previous message; only the latest outcome is
/// retained. The revision counter lets views detect a new message even when
/// its text repeats.
#[derive(Debug, Default)]
pub struct StatusLog {
    slot: Mutex<LogSlot>,
}

#[derive(Debug, Default, Clone)]
struct LogSlot {
    message: Option<String>,
    revision: u64,
}

impl StatusLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, LogSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the current message.
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "dispatch::status", "{}", message);

        let mut slot = self.slot();
        slot.message = Some(message);
        slot.revision += 1;
    }

    /// Returns the latest message, if any.
    pub fn latest(&self) -> Option<String> {
        self.slot().message.clone()
    }

    /// Number of messages recorded so far.
    pub fn revision(&self) -> u64 {
        self.slot().revision
    }
}

/// Explicit per-client session context.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    log: StatusLog,
}

impl Session {
    /// Creates a session with a random id.
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Creates a session with a caller-chosen id (deterministic in simulation).
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            log: StatusLog::new(),
        }
    }

    /// Creates an Arc-wrapped session for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The user-facing status line.
    pub fn log(&self) -> &StatusLog {
        &self.log
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_only_latest() {
        let log = StatusLog::new();
        assert_eq!(log.latest(), None);

        log.record("Starting simulation...");
        log.record("Simulation started");

        assert_eq!(log.latest().as_deref(), Some("Simulation started"));
        assert_eq!(log.revision(), 2);
    }

    #[test]
    fn test_repeated_message_bumps_revision() {
        let log = StatusLog::new();
        log.record("same");
        log.record("same");
        assert_eq!(log.revision(), 2);
    }

    #[test]
    fn test_session_id_is_stable() {
        let id = SessionId::from_seed(3);
        let session = Session::with_id(id);
        assert_eq!(session.id(), id);
    }
}
