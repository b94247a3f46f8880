//! # Matterbox
//!
//! Physical material behaviors for externally-owned simulated solid
//! bodies: radiative heating, energy-driven melting, magnetic attraction,
//! and a material-form state machine that preserves melt progress across
//! form switches.
//!
//! The crate is the numeric/state-machine core only. Collision detection,
//! rendering, asset binding and rigid-body integration are collaborators
//! on the other side of the boundary types in [`body`]; every per-tick
//! operation here is total and single-threaded.

pub mod body;
pub mod simulation;

/// Common imports for internal use
pub mod prelude {
    pub use crate::body::{AppliedForce, BodyId, BodyProperties, BodyState, BodyTags};
    pub use crate::simulation::{
        Form, FormError, FormSpec, FormStateMachine, HeatSourceId, HeatSources, HeatZone,
        MagnetForces, MagneticField, MeltParams, MeltState, RadiantSource, ThermalReceiver,
    };
    pub use glam::Vec3;
}
