//! Client behaviour scenarios for the simulation harness.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// SIM-001: start, poll on cadence, stop, no polls after stop
    HappyPath,

    /// SIM-002: failed fetches keep the last snapshot, failed start keeps IDLE
    FlakyBackend,

    /// SIM-003: a status response that arrives after stop is ignored
    SlowStatus,

    /// SIM-004: restart while running discards the old snapshot
    RestartWhileRunning,

    /// SIM-005: invalid input never reaches the backend
    ValidationGate,

    /// SIM-006: an older response landing after a newer one is dropped
    OverlappingPolls,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::HappyPath,
            ScenarioId::FlakyBackend,
            ScenarioId::SlowStatus,
            ScenarioId::RestartWhileRunning,
            ScenarioId::ValidationGate,
            ScenarioId::OverlappingPolls,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::HappyPath => "happy_path",
            ScenarioId::FlakyBackend => "flaky_backend",
            ScenarioId::SlowStatus => "slow_status",
            ScenarioId::RestartWhileRunning => "restart_while_running",
            ScenarioId::ValidationGate => "validation_gate",
            ScenarioId::OverlappingPolls => "overlapping_polls",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::HappyPath => "Start, poll every interval, stop; polling ends with the run",
            ScenarioId::FlakyBackend => "Injected fetch and start failures leave state intact and are logged",
            ScenarioId::SlowStatus => "Status response held past stop must not update the snapshot",
            ScenarioId::RestartWhileRunning => "Restart with a new config replaces the snapshot and world",
            ScenarioId::ValidationGate => "Missing, non-integer and non-positive inputs are rejected locally",
            ScenarioId::OverlappingPolls => "Two fetches in flight, released newest first; the older is dropped",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unrecognised scenario name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown scenario: {0}")]
pub struct UnknownScenario(pub String);

impl FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "happy_path" | "happypath" | "sim-001" => Ok(ScenarioId::HappyPath),
            "flaky_backend" | "flakybackend" | "sim-002" => Ok(ScenarioId::FlakyBackend),
            "slow_status" | "slowstatus" | "sim-003" => Ok(ScenarioId::SlowStatus),
            "restart_while_running" | "restart" | "sim-004" => Ok(ScenarioId::RestartWhileRunning),
            "validation_gate" | "validation" | "sim-005" => Ok(ScenarioId::ValidationGate),
            "overlapping_polls" | "overlap" | "sim-006" => Ok(ScenarioId::OverlappingPolls),
            _ => Err(UnknownScenario(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("SIM-006".parse::<ScenarioId>(), Ok(ScenarioId::OverlappingPolls));
        assert_eq!("Restart".parse::<ScenarioId>(), Ok(ScenarioId::RestartWhileRunning));
    }

    #[test]
    fn test_unknown() {
        let err = "split_brain".parse::<ScenarioId>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown scenario: split_brain");
    }
}
