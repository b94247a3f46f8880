//! Magnetic attraction
//!
//! A [`MagneticField`] pulls ferrous rigid bodies toward the magnet with an
//! inverse-square force, velocity damping and a hard force cap. Range
//! membership is fed by the overlap collaborator; the field itself never
//! performs spatial queries. Forces are returned to the host, which owns
//! the rigid-body integrator.
//!
//! All distances are in meters, forces in newtons.

use crate::body::{AppliedForce, BodyId, BodyState, BodyTags};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Forces produced by one magnet tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MagnetForces {
    /// Additive force per attracted body
    pub forces: Vec<AppliedForce>,
    /// Reaction force for the magnet's own body; zero unless the
    /// reciprocal-force policy is on and the magnet body simulates
    pub self_force: Vec3,
}

/// Distance-bounded attraction field around a magnet body
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MagneticField {
    /// Force coefficient; derived by
    /// [`auto_compute_strength`](Self::auto_compute_strength) or set manually
    pub strength: f32,
    /// Distance at which `max_lift_mass_kg` exactly balances gravity
    pub reference_distance_m: f32,
    /// Heaviest mass the magnet can hold at the reference distance
    pub max_lift_mass_kg: f32,
    /// Bodies at or below this distance feel no force
    pub min_distance_m: f32,
    /// Bodies beyond this distance feel no force
    pub max_distance_m: f32,
    /// Gravitational acceleration used for strength derivation
    pub gravity: f32,
    /// Velocity damping coefficient applied to attracted bodies
    pub velocity_damping: f32,
    /// Per-body cap on the total force magnitude
    pub max_force: f32,
    /// Softening term added to the squared distance in the force law
    pub softening: f32,
    /// Whether the negated force is fed back to the magnet's own body
    pub reciprocal_force: bool,
    #[serde(skip)]
    overlapping: HashSet<BodyId>,
}

impl Default for MagneticField {
    fn default() -> Self {
        MagneticField {
            strength: 0.0,
            reference_distance_m: 3.0,
            max_lift_mass_kg: 500.0,
            min_distance_m: 0.5,
            max_distance_m: 8.0,
            gravity: 9.81,
            velocity_damping: 0.5,
            max_force: 1e6,
            softening: 0.01,
            reciprocal_force: false,
            overlapping: HashSet::new(),
        }
    }
}

impl MagneticField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive `strength` so a body of `max_lift_mass_kg` exactly balances
    /// gravity at `reference_distance_m`
    pub fn auto_compute_strength(&mut self) {
        self.strength =
            self.max_lift_mass_kg * self.gravity * self.reference_distance_m * self.reference_distance_m;
    }

    /// A body entered the field's range
    ///
    /// Only ferrous, dynamically simulated bodies are tracked.
    pub fn on_enter_range(&mut self, body: BodyId, tags: BodyTags, simulating: bool) {
        if !tags.contains(BodyTags::FERROUS) || !simulating {
            return;
        }
        if self.overlapping.insert(body) {
            log::debug!("magnet: body {:?} entered range", body);
        }
    }

    /// A body left the field's range; removal is unconditional
    pub fn on_exit_range(&mut self, body: BodyId) {
        if self.overlapping.remove(&body) {
            log::debug!("magnet: body {:?} left range", body);
        }
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.overlapping.contains(&body)
    }

    pub fn overlapping_count(&self) -> usize {
        self.overlapping.len()
    }

    /// Compute attraction forces for the current members
    ///
    /// Bodies without a state snapshot or no longer simulating are skipped
    /// for this tick. Distances outside `(min_distance_m, max_distance_m]`
    /// produce exactly zero force.
    pub fn tick(&self, self_state: &BodyState, bodies: &HashMap<BodyId, BodyState>) -> MagnetForces {
        let mut out = MagnetForces::default();
        if self.overlapping.is_empty() {
            return out;
        }

        for &body in &self.overlapping {
            let Some(state) = bodies.get(&body) else {
                continue;
            };
            if !state.simulating {
                continue;
            }

            let to_magnet = self_state.position - state.position;
            let distance = to_magnet.length();
            if distance <= self.min_distance_m || distance > self.max_distance_m {
                continue;
            }

            let direction = to_magnet.normalize_or_zero();
            let force_mag = self.strength / (distance * distance + self.softening);
            let damping = -state.velocity * self.velocity_damping;
            let force = (direction * force_mag + damping).clamp_length_max(self.max_force);

            out.forces.push(AppliedForce { body, force });

            if self.reciprocal_force && self_state.simulating {
                out.self_force -= force;
            }
        }

        out
    }
}
