//! Wire types exchanged with the simulation backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use uuid::Uuid;

/// Backend-assigned location index in `[0, points)`.
pub type NodeIndex = usize;

/// Backend-assigned entity identifier.
pub type EntityId = u32;

/// Identifier for one client session.
///
/// A client instance drives exactly one simulation session; the id only
/// tags diagnostics so interleaved logs from several clients can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random SessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic SessionId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Validated simulation parameters sent with start/restart.
///
/// Every field is strictly positive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Total number of locations in the city
    pub points: NonZeroU32,
    /// Number of hospitals
    pub hospitals: NonZeroU32,
    /// Number of ambulances
    pub ambulances: NonZeroU32,
}

impl SimulationConfig {
    /// Builds a config from raw counts, or `None` if any count is zero.
    pub fn new(points: u32, hospitals: u32, ambulances: u32) -> Option<Self> {
        Some(Self {
            points: NonZeroU32::new(points)?,
            hospitals: NonZeroU32::new(hospitals)?,
            ambulances: NonZeroU32::new(ambulances)?,
        })
    }
}

/// Ambulance lifecycle as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmbulanceState {
    Idle,
    ToPatient,
    ToHospital,
    Returning,
}

impl AmbulanceState {
    /// All states in reporting order.
    pub const ALL: [AmbulanceState; 4] = [
        AmbulanceState::Idle,
        AmbulanceState::ToPatient,
        AmbulanceState::ToHospital,
        AmbulanceState::Returning,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AmbulanceState::Idle => "on standby",
            AmbulanceState::ToPatient => "heading to patient",
            AmbulanceState::ToHospital => "transporting to hospital",
            AmbulanceState::Returning => "returning to base",
        }
    }
}

impl fmt::Display for AmbulanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Patient lifecycle as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatientState {
    Waiting,
    PickedUp,
    Arrived,
}

impl PatientState {
    /// All states in reporting order.
    pub const ALL: [PatientState; 3] = [
        PatientState::Waiting,
        PatientState::PickedUp,
        PatientState::Arrived,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            PatientState::Waiting => "waiting for pickup",
            PatientState::PickedUp => "in transit",
            PatientState::Arrived => "delivered",
        }
    }
}

impl fmt::Display for PatientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: EntityId,
    pub location: NodeIndex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ambulance {
    pub id: EntityId,
    pub location: NodeIndex,
    pub state: AmbulanceState,
    /// Home hospital
    pub hospital_id: EntityId,
    /// Patient currently assigned, if any
    #[serde(default)]
    pub patient_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: EntityId,
    pub location: NodeIndex,
    pub state: PatientState,
    /// Simulation time of the emergency call
    #[serde(default)]
    pub call_time: Option<i64>,
    #[serde(default)]
    pub assigned_ambulance: Option<EntityId>,
    /// Call-to-arrival time; the backend reports -1 until delivered
    #[serde(default)]
    pub total_time: Option<i64>,
}

/// One backend-provided point-in-time view of all simulation entities.
///
/// The client never mutates a snapshot; it is replaced wholesale on each
/// successful poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Simulation clock
    pub time: f64,
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
    #[serde(default)]
    pub ambulances: Vec<Ambulance>,
    #[serde(default)]
    pub patients: Vec<Patient>,
}

/// Aggregate outcome reported by `GET /api/summary`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSummary {
    /// Patients delivered to a hospital
    pub completed: u64,
    /// Mean call-to-arrival time of delivered patients
    pub avg_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serializes_as_plain_integers() {
        let config = SimulationConfig::new(10, 2, 4).unwrap();
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"points": 10, "hospitals": 2, "ambulances": 4})
        );
    }

    #[test]
    fn test_config_rejects_zero() {
        assert!(SimulationConfig::new(0, 2, 4).is_none());
        assert!(SimulationConfig::new(10, 0, 4).is_none());
        assert!(SimulationConfig::new(10, 2, 0).is_none());
    }

    #[test]
    fn test_snapshot_decodes_backend_payload() {
        // Shape produced by the Spring backend, including fields the client ignores
        let body = r#"{
            "time": 12,
            "ambulances": [
                {"id": 1, "location": 2, "state": "TO_PATIENT", "stateDesc": "x",
                 "hospitalId": 9, "patientId": 3}
            ],
            "patients": [
                {"id": 3, "location": 5, "state": "WAITING", "stateDesc": "y",
                 "callTime": 10, "assignedAmbulance": 1, "totalTime": -1}
            ],
            "hospitals": [
                {"id": 9, "location": 0, "idleAmbulances": []}
            ]
        }"#;

        let snapshot: StatusSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snapshot.time, 12.0);
        assert_eq!(snapshot.ambulances[0].state, AmbulanceState::ToPatient);
        assert_eq!(snapshot.ambulances[0].patient_id, Some(3));
        assert_eq!(snapshot.patients[0].total_time, Some(-1));
        assert_eq!(snapshot.hospitals[0].location, 0);
    }

    #[test]
    fn test_ambulance_minimal_shape() {
        let body = r#"{"id": 1, "location": 2, "state": "IDLE", "hospitalId": 9}"#;
        let ambulance: Ambulance = serde_json::from_str(body).unwrap();
        assert_eq!(ambulance.state, AmbulanceState::Idle);
        assert_eq!(ambulance.patient_id, None);
    }

    #[test]
    fn test_session_id_from_seed_is_stable() {
        assert_eq!(SessionId::from_seed(7), SessionId::from_seed(7));
        assert_ne!(SessionId::from_seed(7), SessionId::from_seed(8));
    }
}
