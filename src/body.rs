//! Boundary types shared with the external collaborators
//!
//! The crate never performs spatial queries or owns rigid bodies. The
//! overlap collaborator reports range membership with [`BodyId`] handles
//! and [`BodyTags`], the physics collaborator supplies [`BodyState`]
//! snapshots each tick and consumes [`AppliedForce`] vectors and
//! [`BodyProperties`] pushes. Mesh and material handles are opaque and
//! passed through unmodified.

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Handle to an externally-owned rigid body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// Opaque handle to a mesh asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// Opaque handle to a render material asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderMaterialHandle(pub u32);

/// Opaque handle to a physical-material asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalMaterialHandle(pub u32);

bitflags! {
    /// Capability tags reported by the overlap collaborator at body-enter
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BodyTags: u32 {
        /// Responds to magnetic attraction
        const FERROUS = 1 << 0;
        /// Accepts radiant heat
        const MELTABLE = 1 << 1;
    }
}

/// Per-tick snapshot of a rigid body, supplied by the physics collaborator
///
/// Positions and velocities are in meters and meters per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Whether the body is currently dynamically simulated
    pub simulating: bool,
}

impl BodyState {
    pub fn at(position: Vec3) -> Self {
        BodyState {
            position,
            velocity: Vec3::ZERO,
            simulating: true,
        }
    }
}

/// An additive force to apply to one body this tick, in newtons
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedForce {
    pub body: BodyId,
    pub force: Vec3,
}

/// Physics properties pushed to a body when a form spec is applied
///
/// `None` fields leave the corresponding binding on the body untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyProperties {
    pub simulate_physics: bool,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub physical_material: Option<PhysicalMaterialHandle>,
    pub mass_override_kg: Option<f32>,
}
