//! Status Summary - headline figures derived from one snapshot.
//!
//! Everything here is a pure function of a [`StatusSnapshot`]:
//! - simulation time and number of patients delivered
//! - per-hospital standby roster (IDLE ambulances grouped by home hospital)
//! - entity counts by state

use dispatch_env::{AmbulanceState, EntityId, PatientState, StatusSnapshot};
use std::collections::HashMap;

/// IDLE ambulances belonging to one hospital.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandbyRoster {
    pub hospital_id: EntityId,
    pub idle_ambulances: Vec<EntityId>,
}

/// Aggregate view of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub time: f64,
    /// Patients in ARRIVED
    pub delivered: usize,
    /// One roster per hospital id referenced by any ambulance, in first-seen order
    pub standby: Vec<StandbyRoster>,
    pub ambulances_by_state: Vec<(AmbulanceState, usize)>,
    pub patients_by_state: Vec<(PatientState, usize)>,
}

impl StatusSummary {
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        let delivered = snapshot
            .patients
            .iter()
            .filter(|p| p.state == PatientState::Arrived)
            .count();

        let mut standby: Vec<StandbyRoster> = Vec::new();
        let mut roster_index: HashMap<EntityId, usize> = HashMap::new();
        for ambulance in &snapshot.ambulances {
            let idx = *roster_index.entry(ambulance.hospital_id).or_insert_with(|| {
                standby.push(StandbyRoster {
                    hospital_id: ambulance.hospital_id,
                    idle_ambulances: Vec::new(),
                });
                standby.len() - 1
            });
            if ambulance.state == AmbulanceState::Idle {
                standby[idx].idle_ambulances.push(ambulance.id);
            }
        }

        let ambulances_by_state = AmbulanceState::ALL
            .iter()
            .map(|&state| {
                let count = snapshot.ambulances.iter().filter(|a| a.state == state).count();
                (state, count)
            })
            .collect();

        let patients_by_state = PatientState::ALL
            .iter()
            .map(|&state| {
                let count = snapshot.patients.iter().filter(|p| p.state == state).count();
                (state, count)
            })
            .collect();

        Self {
            time: snapshot.time,
            delivered,
            standby,
            ambulances_by_state,
            patients_by_state,
        }
    }

    /// Number of ambulances in `state`.
    pub fn ambulances_in(&self, state: AmbulanceState) -> usize {
        self.ambulances_by_state
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}
