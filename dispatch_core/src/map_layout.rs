//! Map Layout Engine - deterministic ring arrangement of location nodes
//! ====================================================================
//!
//! The backend's city is a set of integer-indexed locations. For display the
//! first `n = min(total_points, max_nodes)` of them are placed evenly on a
//! circle, node 0 at the top and proceeding clockwise (screen coordinates,
//! y grows downward):
//!
//! ```text
//!   θ_i = 2π·i/n − π/2
//!   p_i = (cx + R·cos θ_i, cy + R·sin θ_i),   cx = cy = R + margin
//! ```
//!
//! Consecutive nodes are joined into a closed ring. The ring is a drawing
//! device only; it says nothing about the backend's road network.
//!
//! Entities are bucketed by `location`. Anything located at `>= n` is left
//! off the map (capping, not an error).

use dispatch_env::{Ambulance, Hospital, NodeIndex, Patient, StatusSnapshot};
use nalgebra::Point2;
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, PI};

// =============================================================================
// LAYOUT TYPES
// =============================================================================

/// Geometry parameters for the ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Ring radius in canvas units
    pub radius: f64,
    /// Space between the ring's bounding box and the canvas edge
    pub margin: f64,
    /// Maximum number of nodes drawn
    pub max_nodes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius: 150.0,
            margin: 40.0,
            max_nodes: crate::config::DEFAULT_MAX_NODES,
        }
    }
}

/// One drawn location and everything currently there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub index: NodeIndex,
    /// Polar angle in radians (screen coordinates)
    pub angle: f64,
    pub position: Point2<f64>,
    pub hospitals_here: Vec<Hospital>,
    pub ambulances_here: Vec<Ambulance>,
    pub patients_here: Vec<Patient>,
}

impl LayoutNode {
    /// True when no entity occupies this node.
    pub fn is_empty(&self) -> bool {
        self.hospitals_here.is_empty() && self.ambulances_here.is_empty() && self.patients_here.is_empty()
    }
}

/// Segment of the closed ring between two adjacent nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RingEdge {
    pub from: NodeIndex,
    pub to: NodeIndex,
}

/// A complete map: nodes, ring edges and canvas size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<RingEdge>,
    pub width: f64,
    pub height: f64,
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Angle of node `i` out of `n` (node 0 at the top, clockwise on screen).
pub fn node_angle(i: usize, n: usize) -> f64 {
    2.0 * PI * i as f64 / n as f64 - FRAC_PI_2
}

/// Edges of a closed ring over `n` nodes.
///
/// Two nodes share a single segment; fewer than two have none.
pub fn ring_edges(n: usize) -> Vec<RingEdge> {
    match n {
        0 | 1 => Vec::new(),
        2 => vec![RingEdge { from: 0, to: 1 }],
        _ => (0..n).map(|i| RingEdge { from: i, to: (i + 1) % n }).collect(),
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Computes ring layouts. Stateless apart from its geometry.
#[derive(Debug, Clone, Default)]
pub struct MapLayoutEngine {
    config: LayoutConfig,
}

impl MapLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Centre of the ring.
    pub fn center(&self) -> Point2<f64> {
        let c = self.config.radius + self.config.margin;
        Point2::new(c, c)
    }

    /// Canvas width/height that fits the ring plus margin.
    pub fn canvas_size(&self) -> (f64, f64) {
        let side = 2.0 * (self.config.radius + self.config.margin);
        (side, side)
    }

    /// Lays out `min(total_points, max_nodes)` nodes and buckets the
    /// snapshot's entities onto them.
    ///
    /// Pure: identical inputs give identical output.
    pub fn layout(&self, snapshot: &StatusSnapshot, total_points: usize, max_nodes: usize) -> Vec<LayoutNode> {
        let n = total_points.min(max_nodes);
        let center = self.center();
        let radius = self.config.radius;

        let mut nodes: Vec<LayoutNode> = (0..n)
            .map(|i| {
                let angle = node_angle(i, n);
                LayoutNode {
                    index: i,
                    angle,
                    position: Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin()),
                    hospitals_here: Vec::new(),
                    ambulances_here: Vec::new(),
                    patients_here: Vec::new(),
                }
            })
            .collect();

        // Single pass per entity kind; snapshot order is preserved within a node
        for hospital in &snapshot.hospitals {
            if let Some(node) = nodes.get_mut(hospital.location) {
                node.hospitals_here.push(hospital.clone());
            }
        }
        for ambulance in &snapshot.ambulances {
            if let Some(node) = nodes.get_mut(ambulance.location) {
                node.ambulances_here.push(ambulance.clone());
            }
        }
        for patient in &snapshot.patients {
            if let Some(node) = nodes.get_mut(patient.location) {
                node.patients_here.push(patient.clone());
            }
        }

        nodes
    }

    /// Full map using the configured node cap.
    pub fn map(&self, snapshot: &StatusSnapshot, total_points: usize) -> MapLayout {
        let nodes = self.layout(snapshot, total_points, self.config.max_nodes);
        let edges = ring_edges(nodes.len());
        let (width, height) = self.canvas_size();
        MapLayout {
            nodes,
            edges,
            width,
            height,
        }
    }
}

/// Lays out with the default ring geometry.
pub fn layout(snapshot: &StatusSnapshot, total_points: usize, max_nodes: usize) -> Vec<LayoutNode> {
    MapLayoutEngine::default().layout(snapshot, total_points, max_nodes)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dispatch_env::{AmbulanceState, PatientState};
    use proptest::prelude::*;

    fn ambulance(id: u32, location: usize) -> Ambulance {
        Ambulance {
            id,
            location,
            state: AmbulanceState::Idle,
            hospital_id: 0,
            patient_id: None,
        }
    }

    fn patient(id: u32, location: usize) -> Patient {
        Patient {
            id,
            location,
            state: PatientState::Waiting,
            call_time: None,
            assigned_ambulance: None,
            total_time: None,
        }
    }

    fn snapshot_with_locations(locations: &[usize]) -> StatusSnapshot {
        StatusSnapshot {
            time: 0.0,
            hospitals: locations
                .iter()
                .enumerate()
                .map(|(i, &location)| Hospital { id: i as u32, location })
                .collect(),
            ambulances: locations
                .iter()
                .enumerate()
                .map(|(i, &location)| ambulance(i as u32, location))
                .collect(),
            patients: locations
                .iter()
                .enumerate()
                .map(|(i, &location)| patient(i as u32, location))
                .collect(),
        }
    }

    #[test]
    fn test_six_nodes_top_and_bottom() {
        let nodes = layout(&StatusSnapshot::default(), 6, 20);
        assert_eq!(nodes.len(), 6);

        assert_relative_eq!(nodes[0].angle, -FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(nodes[3].angle, FRAC_PI_2, epsilon = 1e-12);

        // Centre is (190, 190) with the default geometry
        assert_relative_eq!(nodes[0].position.x, 190.0, epsilon = 1e-9);
        assert_relative_eq!(nodes[0].position.y, 40.0, epsilon = 1e-9);
        assert_relative_eq!(nodes[3].position.x, 190.0, epsilon = 1e-9);
        assert_relative_eq!(nodes[3].position.y, 340.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_on_screen() {
        let nodes = layout(&StatusSnapshot::default(), 4, 20);
        // Node 1 of 4 sits at the right-hand side
        assert_relative_eq!(nodes[1].position.x, 340.0, epsilon = 1e-9);
        assert_relative_eq!(nodes[1].position.y, 190.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cap_excludes_far_entities() {
        let snapshot = snapshot_with_locations(&[0, 5, 19, 20, 35, 49]);
        let nodes = layout(&snapshot, 50, 20);

        assert_eq!(nodes.len(), 20);
        for node in &nodes {
            assert!(node.hospitals_here.iter().all(|h| h.location < 20));
            assert!(node.ambulances_here.iter().all(|a| a.location < 20));
            assert!(node.patients_here.iter().all(|p| p.location < 20));
        }

        let placed: usize = nodes.iter().map(|n| n.ambulances_here.len()).sum();
        assert_eq!(placed, 3);
    }

    #[test]
    fn test_single_ambulance_lands_on_its_node() {
        let snapshot = StatusSnapshot {
            ambulances: vec![Ambulance {
                id: 1,
                location: 2,
                state: AmbulanceState::Idle,
                hospital_id: 9,
                patient_id: None,
            }],
            ..Default::default()
        };

        let nodes = layout(&snapshot, 6, 6);

        assert_eq!(nodes[2].ambulances_here, snapshot.ambulances);
        for node in nodes.iter().filter(|n| n.index != 2) {
            assert!(node.ambulances_here.is_empty());
        }
    }

    #[test]
    fn test_aggregation_preserves_snapshot_order() {
        let snapshot = StatusSnapshot {
            patients: vec![patient(7, 1), patient(3, 1), patient(5, 1)],
            ..Default::default()
        };
        let nodes = layout(&snapshot, 3, 20);
        let ids: Vec<u32> = nodes[1].patients_here.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_ring_edges() {
        assert!(ring_edges(0).is_empty());
        assert!(ring_edges(1).is_empty());
        assert_eq!(ring_edges(2), vec![RingEdge { from: 0, to: 1 }]);

        let edges = ring_edges(5);
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[4], RingEdge { from: 4, to: 0 });
    }

    #[test]
    fn test_zero_points_is_empty_map() {
        let map = MapLayoutEngine::default().map(&snapshot_with_locations(&[0, 1]), 0);
        assert!(map.nodes.is_empty());
        assert!(map.edges.is_empty());
    }

    #[test]
    fn test_map_uses_configured_cap() {
        let engine = MapLayoutEngine::new(LayoutConfig {
            radius: 100.0,
            margin: 10.0,
            max_nodes: 8,
        });
        let map = engine.map(&StatusSnapshot::default(), 30);

        assert_eq!(map.nodes.len(), 8);
        assert_eq!(map.edges.len(), 8);
        assert_relative_eq!(map.width, 220.0);
    }

    #[test]
    fn test_map_serializes_for_export() {
        let map = MapLayoutEngine::default().map(&snapshot_with_locations(&[1]), 3);
        let json = serde_json::to_value(&map).unwrap();

        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["nodes"][1]["ambulances_here"][0]["id"], 0);
        assert_eq!(json["edges"][2], serde_json::json!({"from": 2, "to": 0}));
    }

    proptest! {
        #[test]
        fn prop_layout_is_deterministic_and_on_circle(
            total in 0usize..60,
            cap in 1usize..30,
            locations in proptest::collection::vec(0usize..60, 0..40),
        ) {
            let snapshot = snapshot_with_locations(&locations);
            let engine = MapLayoutEngine::default();
            let a = engine.layout(&snapshot, total, cap);
            let b = engine.layout(&snapshot, total, cap);
            prop_assert_eq!(&a, &b);

            let n = total.min(cap);
            prop_assert_eq!(a.len(), n);

            let center = engine.center();
            for node in &a {
                let distance = (node.position - center).norm();
                prop_assert!((distance - engine.config().radius).abs() < 1e-9);
            }

            // Every entity below the cap appears exactly once, on its own node
            let expected = locations.iter().filter(|&&l| l < n).count();
            let placed: usize = a.iter().map(|node| node.patients_here.len()).sum();
            prop_assert_eq!(placed, expected);
            for node in &a {
                prop_assert!(node.patients_here.iter().all(|p| p.location == node.index));
            }
        }
    }
}
