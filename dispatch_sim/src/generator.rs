//! Synthetic world for the simulated backend.
//!
//! The generator stands in for the real dispatch server:
//! - Hospitals on every other location, ambulances split among them
//! - Seeded random emergency calls
//! - A fixed per-tick state progression, one step per status request
//!
//! It is a test fixture, not a dispatcher: the first idle ambulance takes the
//! oldest waiting call, and travel is instantaneous.

use dispatch_env::{
    Ambulance, AmbulanceState, BackendSummary, EntityId, Hospital, Patient, PatientState,
    SimulationConfig, StatusSnapshot,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic source of status snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotGenerator {
    seed: u64,
    rng: ChaCha8Rng,
    config: Option<SimulationConfig>,
    tick: u64,
    hospitals: Vec<Hospital>,
    ambulances: Vec<Ambulance>,
    patients: Vec<Patient>,
    next_patient_id: EntityId,
    /// Probability of a new emergency call per tick
    call_probability: f64,
}

impl SnapshotGenerator {
    /// Creates an unconfigured generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config: None,
            tick: 0,
            hospitals: Vec::new(),
            ambulances: Vec::new(),
            patients: Vec::new(),
            next_patient_id: 0,
            call_probability: 0.5,
        }
    }

    /// Sets the per-tick call probability.
    pub fn with_call_probability(mut self, p: f64) -> Self {
        self.call_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Rebuilds the world for `config`. Same seed and config, same sequence.
    pub fn reset(&mut self, config: SimulationConfig) {
        let points = config.points.get() as usize;
        let hospital_count = config.hospitals.get();
        let ambulance_count = config.ambulances.get();

        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.config = Some(config);
        self.tick = 0;
        self.patients.clear();
        self.next_patient_id = 0;

        self.hospitals = (0..hospital_count)
            .map(|id| Hospital {
                id,
                location: (id as usize * 2) % points,
            })
            .collect();

        // Even split, remainder to the first hospital
        let per_hospital = ambulance_count / hospital_count;
        let remainder = ambulance_count % hospital_count;
        self.ambulances = Vec::with_capacity(ambulance_count as usize);
        for hospital in &self.hospitals {
            let count = if hospital.id == 0 { per_hospital + remainder } else { per_hospital };
            for _ in 0..count {
                self.ambulances.push(Ambulance {
                    id: self.ambulances.len() as EntityId,
                    location: hospital.location,
                    state: AmbulanceState::Idle,
                    hospital_id: hospital.id,
                    patient_id: None,
                });
            }
        }
    }

    /// Drops the world; later snapshots are empty.
    pub fn clear(&mut self) {
        self.config = None;
        self.tick = 0;
        self.hospitals.clear();
        self.ambulances.clear();
        self.patients.clear();
    }

    pub fn config(&self) -> Option<SimulationConfig> {
        self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advances one tick and returns the resulting snapshot (time = tick).
    pub fn step(&mut self) -> StatusSnapshot {
        let Some(config) = self.config else {
            return StatusSnapshot::default();
        };

        self.tick += 1;
        self.maybe_call(config.points.get() as usize);
        self.advance_ambulances();
        self.snapshot()
    }

    /// Current state without advancing.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            time: self.tick as f64,
            hospitals: self.hospitals.clone(),
            ambulances: self.ambulances.clone(),
            patients: self.patients.clone(),
        }
    }

    /// Delivered count and mean call-to-arrival time.
    pub fn summary(&self) -> BackendSummary {
        let times: Vec<i64> = self
            .patients
            .iter()
            .filter(|p| p.state == PatientState::Arrived)
            .filter_map(|p| p.total_time)
            .collect();

        let avg_time = if times.is_empty() {
            0.0
        } else {
            times.iter().sum::<i64>() as f64 / times.len() as f64
        };

        BackendSummary {
            completed: times.len() as u64,
            avg_time,
        }
    }

    fn maybe_call(&mut self, points: usize) {
        if !self.rng.gen_bool(self.call_probability) {
            return;
        }
        let location = self.rng.gen_range(0..points);
        self.patients.push(Patient {
            id: self.next_patient_id,
            location,
            state: PatientState::Waiting,
            call_time: Some(self.tick as i64),
            assigned_ambulance: None,
            total_time: Some(-1),
        });
        self.next_patient_id += 1;
    }

    fn advance_ambulances(&mut self) {
        let tick = self.tick as i64;
        let patients = &mut self.patients;
        let hospitals = &self.hospitals;

        for ambulance in self.ambulances.iter_mut() {
            match ambulance.state {
                AmbulanceState::Idle => {
                    let waiting = patients
                        .iter_mut()
                        .find(|p| p.state == PatientState::Waiting && p.assigned_ambulance.is_none());
                    if let Some(patient) = waiting {
                        patient.assigned_ambulance = Some(ambulance.id);
                        ambulance.patient_id = Some(patient.id);
                        ambulance.state = AmbulanceState::ToPatient;
                    }
                }
                AmbulanceState::ToPatient => {
                    if let Some(patient) = assigned(patients, ambulance.patient_id) {
                        ambulance.location = patient.location;
                        patient.state = PatientState::PickedUp;
                    }
                    ambulance.state = AmbulanceState::ToHospital;
                }
                AmbulanceState::ToHospital => {
                    let home = hospitals
                        .iter()
                        .find(|h| h.id == ambulance.hospital_id)
                        .map(|h| h.location)
                        .unwrap_or(ambulance.location);
                    ambulance.location = home;
                    if let Some(patient) = assigned(patients, ambulance.patient_id) {
                        patient.location = home;
                        patient.state = PatientState::Arrived;
                        patient.total_time = patient.call_time.map(|called| tick - called);
                    }
                    ambulance.patient_id = None;
                    ambulance.state = AmbulanceState::Returning;
                }
                AmbulanceState::Returning => {
                    ambulance.state = AmbulanceState::Idle;
                }
            }
        }
    }
}

fn assigned(patients: &mut [Patient], id: Option<EntityId>) -> Option<&mut Patient> {
    let id = id?;
    patients.iter_mut().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(points: u32, hospitals: u32, ambulances: u32) -> SimulationConfig {
        SimulationConfig::new(points, hospitals, ambulances).unwrap()
    }

    #[test]
    fn test_unconfigured_yields_empty_snapshot() {
        let mut generator = SnapshotGenerator::new(42);
        assert_eq!(generator.step(), StatusSnapshot::default());
        assert_eq!(generator.tick(), 0);
    }

    #[test]
    fn test_reset_places_hospitals_and_ambulances() {
        let mut generator = SnapshotGenerator::new(42);
        generator.reset(config(10, 3, 7));
        let snapshot = generator.snapshot();

        let locations: Vec<usize> = snapshot.hospitals.iter().map(|h| h.location).collect();
        assert_eq!(locations, vec![0, 2, 4]);

        // 7 = 2 each + remainder 1 to hospital 0
        let at_first = snapshot.ambulances.iter().filter(|a| a.hospital_id == 0).count();
        assert_eq!(at_first, 3);
        assert_eq!(snapshot.ambulances.len(), 7);
        assert!(snapshot.ambulances.iter().all(|a| a.state == AmbulanceState::Idle));
    }

    #[test]
    fn test_time_advances_per_step() {
        let mut generator = SnapshotGenerator::new(1);
        generator.reset(config(6, 1, 1));
        assert_eq!(generator.step().time, 1.0);
        assert_eq!(generator.step().time, 2.0);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SnapshotGenerator::new(99);
        let mut b = SnapshotGenerator::new(99);
        a.reset(config(12, 2, 4));
        b.reset(config(12, 2, 4));
        for _ in 0..20 {
            assert_eq!(a.step(), b.step());
        }
    }

    #[test]
    fn test_patient_is_delivered() {
        let mut generator = SnapshotGenerator::new(5).with_call_probability(1.0);
        generator.reset(config(8, 1, 1));

        // tick 1: call + assign, tick 2: pickup, tick 3: delivered
        generator.step();
        generator.step();
        let snapshot = generator.step();

        let first = &snapshot.patients[0];
        assert_eq!(first.state, PatientState::Arrived);
        assert_eq!(first.total_time, Some(2));
        assert_eq!(first.location, 0);

        let summary = generator.summary();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.avg_time, 2.0);
    }

    #[test]
    fn test_clear() {
        let mut generator = SnapshotGenerator::new(5);
        generator.reset(config(8, 1, 1));
        generator.step();
        generator.clear();
        assert!(generator.config().is_none());
        assert!(generator.snapshot().ambulances.is_empty());
    }

    proptest! {
        #[test]
        fn prop_entities_stay_in_bounds(
            seed in any::<u64>(),
            points in 1u32..40,
            hospitals in 1u32..6,
            ambulances in 1u32..12,
            steps in 0usize..30,
        ) {
            let mut generator = SnapshotGenerator::new(seed);
            generator.reset(config(points, hospitals, ambulances));
            let mut snapshot = generator.snapshot();
            for _ in 0..steps {
                snapshot = generator.step();
            }

            let points = points as usize;
            prop_assert_eq!(snapshot.hospitals.len(), hospitals as usize);
            prop_assert_eq!(snapshot.ambulances.len(), ambulances as usize);
            prop_assert!(snapshot.hospitals.iter().all(|h| h.location < points));
            prop_assert!(snapshot.ambulances.iter().all(|a| a.location < points));
            prop_assert!(snapshot.patients.iter().all(|p| p.location < points));
        }
    }
}
