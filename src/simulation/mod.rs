//! Simulation systems - radiant heat, melting, magnetism, material forms

pub mod forms;
pub mod magnet;
pub mod melt;
pub mod thermal;

pub use forms::{Form, FormError, FormSpec, FormStateMachine};
pub use magnet::{MagnetForces, MagneticField};
pub use melt::{MeltParams, MeltSnapshot, MeltState};
pub use thermal::{
    HeatSourceId, HeatSources, HeatZone, RadiantSource, ThermalReceiver, STEFAN_BOLTZMANN,
};
