//! Radiant heat emission
//!
//! A [`RadiantSource`] emits power from its surface temperature via the
//! Stefan–Boltzmann law and answers flux queries at a distance or a world
//! point. Sources live in a [`HeatSources`] registry; receivers keep the
//! copyable [`HeatSourceId`] instead of a reference, so a removed source
//! simply stops resolving and heating ends on the receiver's next tick.
//!
//! All distances are in meters.

use crate::body::BodyId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Stefan–Boltzmann constant (W·m⁻²·K⁻⁴)
pub const STEFAN_BOLTZMANN: f32 = 5.67e-8;

/// Flux queries clamp the distance to this floor to keep results finite
const MIN_FLUX_DISTANCE_M: f32 = 0.01;

/// A radiating heat source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiantSource {
    /// World position of the emitter, meters
    pub position: Vec3,
    /// Surface temperature, degrees Celsius
    pub temperature_c: f32,
    /// Emitting surface area, m²
    pub surface_area_m2: f32,
    /// Surface emissivity, 0..1
    pub emissivity: f32,
    /// Radiation constant; overridable so tests can use round numbers
    pub stefan_boltzmann: f32,
    /// Heating range, meters; 0 means unlimited
    pub max_range_m: f32,
    /// Passive cooling, degrees Celsius per second
    pub cool_rate_per_sec: f32,
    /// Factor mapping temperature to the 0..1 shader heat alpha
    pub heat_alpha_scale: f32,
}

impl RadiantSource {
    pub fn new(position: Vec3) -> Self {
        RadiantSource {
            position,
            temperature_c: 600.0,
            surface_area_m2: 1.0,
            emissivity: 0.7,
            stefan_boltzmann: STEFAN_BOLTZMANN,
            max_range_m: 5.0,
            cool_rate_per_sec: 3.0,
            heat_alpha_scale: 0.002,
        }
    }

    /// Total emitted power in watts: `σ·ε·A·T⁴` with T in kelvin
    ///
    /// Computed in f64; the quartic overflows f32 precision at furnace
    /// temperatures.
    pub fn total_radiant_power_w(&self) -> f32 {
        let t_k = f64::from(self.temperature_c) + 273.15;
        let p = f64::from(self.emissivity)
            * f64::from(self.stefan_boltzmann)
            * f64::from(self.surface_area_m2)
            * t_k.powi(4);
        p as f32
    }

    /// Flux in W/m² at a distance, spread over the sphere surface
    pub fn flux_at_distance(&self, distance_m: f32) -> f32 {
        let r = f64::from(distance_m.max(MIN_FLUX_DISTANCE_M));
        let p = f64::from(self.total_radiant_power_w());
        (p / (4.0 * std::f64::consts::PI * r * r)) as f32
    }

    /// Flux at a world point; zero beyond `max_range_m` when ranged
    pub fn flux_at_point(&self, point: Vec3) -> f32 {
        let distance_m = self.position.distance(point);
        if self.max_range_m > 0.0 && distance_m > self.max_range_m {
            return 0.0;
        }
        self.flux_at_distance(distance_m)
    }

    /// Power in watts absorbed by a receiver surface at a world point
    pub fn received_power_w(&self, point: Vec3, receiver_area_m2: f32) -> f32 {
        self.flux_at_point(point) * receiver_area_m2.max(0.0)
    }

    /// Advance passive cooling; temperature never drops below 0 °C
    pub fn update(&mut self, dt: f32) {
        if self.cool_rate_per_sec > 0.0 {
            self.temperature_c = (self.temperature_c - self.cool_rate_per_sec * dt).max(0.0);
        }
    }

    /// Shader heat alpha: `clamp(temperature · scale, 0, 1)`
    pub fn heat_alpha(&self) -> f32 {
        (self.temperature_c * self.heat_alpha_scale).clamp(0.0, 1.0)
    }
}

/// Handle to a source in a [`HeatSources`] registry
///
/// Non-owning: resolution fails once the source is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeatSourceId(u32);

/// Registry of live heat sources
#[derive(Default)]
pub struct HeatSources {
    next_id: u32,
    sources: HashMap<HeatSourceId, RadiantSource>,
}

impl HeatSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: RadiantSource) -> HeatSourceId {
        let id = HeatSourceId(self.next_id);
        self.next_id += 1;
        self.sources.insert(id, source);
        id
    }

    pub fn remove(&mut self, id: HeatSourceId) -> Option<RadiantSource> {
        self.sources.remove(&id)
    }

    pub fn get(&self, id: HeatSourceId) -> Option<&RadiantSource> {
        self.sources.get(&id)
    }

    pub fn get_mut(&mut self, id: HeatSourceId) -> Option<&mut RadiantSource> {
        self.sources.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Advance passive cooling on every source
    pub fn update(&mut self, dt: f32) {
        for source in self.sources.values_mut() {
            source.update(dt);
        }
    }
}

/// Capability interface for anything that can absorb radiant heat
///
/// Receivers are looked up by the host when the overlap collaborator
/// reports range changes; there is no dynamic name-based dispatch.
pub trait ThermalReceiver {
    /// Begin absorbing from the given source
    fn start_heating(&mut self, source: HeatSourceId);

    /// Stop absorbing; accumulated energy is kept
    fn stop_heating(&mut self);

    /// Whether this receiver currently takes heat at all
    fn accepts_heat(&self) -> bool {
        true
    }
}

/// Range membership for one heat source
///
/// The host forwards body-enter/body-exit facts from its overlap
/// collaborator together with the matching receiver; the zone filters on
/// [`ThermalReceiver::accepts_heat`] and keeps enter/exit paired.
pub struct HeatZone {
    source: HeatSourceId,
    receivers: HashSet<BodyId>,
}

impl HeatZone {
    pub fn new(source: HeatSourceId) -> Self {
        HeatZone {
            source,
            receivers: HashSet::new(),
        }
    }

    pub fn source(&self) -> HeatSourceId {
        self.source
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.receivers.contains(&body)
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// A body entered the zone; starts heating if the receiver takes heat
    pub fn on_body_enter<R: ThermalReceiver + ?Sized>(&mut self, body: BodyId, receiver: &mut R) {
        if !receiver.accepts_heat() {
            return;
        }
        if self.receivers.insert(body) {
            log::debug!("heat zone {:?}: body {:?} entered", self.source, body);
            receiver.start_heating(self.source);
        }
    }

    /// A body left the zone; removal is unconditional
    pub fn on_body_exit<R: ThermalReceiver + ?Sized>(&mut self, body: BodyId, receiver: &mut R) {
        if self.receivers.remove(&body) {
            log::debug!("heat zone {:?}: body {:?} left", self.source, body);
            receiver.stop_heating();
        }
    }
}
