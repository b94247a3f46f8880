//! Energy-driven melting
//!
//! A [`MeltState`] accumulates absorbed radiant energy and maps it to a
//! normalized melt fraction. The fraction drives a shrinking visual scale
//! and, once it reaches 1, reports the object as fully melted. Removal is
//! the caller's policy, never this module's.

use crate::simulation::thermal::{HeatSourceId, HeatSources, ThermalReceiver};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Heating distance floor, meters; keeps flux finite for touching bodies
const MIN_HEAT_DISTANCE_M: f32 = 0.05;

/// Volume floor so degenerate extents still give a positive melt energy
const MIN_VOLUME_M3: f32 = 1e-6;

/// Seconds between melt progress trace lines
const PROGRESS_LOG_INTERVAL: f32 = 0.25;

/// Construction-time melt configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeltParams {
    /// Material density, kg/m³
    pub density_kg_m3: f32,
    /// Latent heat of fusion, J/kg
    pub latent_heat_j_per_kg: f32,
    /// Scale the object shrinks toward at full melt, as a ratio of the
    /// pre-melt scale
    pub min_scale_ratio: f32,
    /// Simulated-seconds per wall-clock second applied to absorbed energy
    pub sim_time_scale: f32,
    /// Removal policy consulted by the caller once fully melted; the melt
    /// state itself never destroys anything
    pub destroy_when_melted: bool,
}

impl Default for MeltParams {
    fn default() -> Self {
        // Water ice
        MeltParams {
            density_kg_m3: 917.0,
            latent_heat_j_per_kg: 334_000.0,
            min_scale_ratio: 0.15,
            sim_time_scale: 3600.0,
            destroy_when_melted: false,
        }
    }
}

/// Melt progress carried across form switches
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeltSnapshot {
    pub melt_fraction: f32,
    pub energy_accum_j: f32,
    pub heat_source: Option<HeatSourceId>,
    pub heating: bool,
}

/// Per-object energy accumulator and phase-change mapping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeltState {
    energy_accum_j: f32,
    melt_fraction: f32,
    total_melt_energy_j: f32,
    effective_area_m2: f32,
    volume_m3: f32,
    base_scale: Vec3,
    min_scale_ratio: f32,
    sim_time_scale: f32,
    heating: bool,
    heat_source: Option<HeatSourceId>,
    progress_log_acc: f32,
}

impl Default for MeltState {
    fn default() -> Self {
        MeltState {
            energy_accum_j: 0.0,
            melt_fraction: 0.0,
            total_melt_energy_j: 1.0,
            effective_area_m2: 1.0,
            volume_m3: 1.0,
            base_scale: Vec3::ONE,
            min_scale_ratio: 0.15,
            sim_time_scale: 1.0,
            heating: false,
            heat_source: None,
            progress_log_acc: 0.0,
        }
    }
}

impl MeltState {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)initialize for the meltable form
    ///
    /// `reference_scale` is the pre-melt world scale, `extent_m` the
    /// world-space bounding size at that scale. A fresh state (no
    /// accumulated energy) adopts `reference_scale` as its base; a state
    /// with prior progress keeps its accumulated energy and only the
    /// geometry constants are recomputed.
    pub fn activate(&mut self, reference_scale: Vec3, extent_m: Vec3, params: &MeltParams) {
        self.min_scale_ratio = params.min_scale_ratio;
        self.sim_time_scale = params.sim_time_scale;

        if self.energy_accum_j == 0.0 {
            self.base_scale = reference_scale;
        }

        let size = extent_m.max(Vec3::ZERO);
        self.volume_m3 = (size.x * size.y * size.z).max(MIN_VOLUME_M3);

        let face_xy = size.x * size.y;
        let face_xz = size.x * size.z;
        let face_yz = size.y * size.z;
        self.effective_area_m2 = face_xy.max(face_xz).max(face_yz);

        self.total_melt_energy_j =
            (params.density_kg_m3 * self.volume_m3 * params.latent_heat_j_per_kg).max(1.0);
        self.melt_fraction = (self.energy_accum_j / self.total_melt_energy_j).clamp(0.0, 1.0);
        self.progress_log_acc = 0.0;
    }

    /// Capture progress before leaving the meltable form
    pub fn snapshot(&self) -> MeltSnapshot {
        MeltSnapshot {
            melt_fraction: self.melt_fraction,
            energy_accum_j: self.energy_accum_j,
            heat_source: self.heat_source,
            heating: self.heating,
        }
    }

    /// Restore progress captured by [`snapshot`](Self::snapshot)
    ///
    /// The fraction is re-derived from the restored energy so it stays
    /// consistent with the current melt-energy total.
    pub fn restore(&mut self, snapshot: MeltSnapshot) {
        self.energy_accum_j = snapshot.energy_accum_j.max(0.0);
        self.melt_fraction = (self.energy_accum_j / self.total_melt_energy_j).clamp(0.0, 1.0);
        self.heat_source = snapshot.heat_source;
        self.heating = snapshot.heating && snapshot.heat_source.is_some();
    }

    /// Absorb radiant energy for one tick
    ///
    /// Every early-out leaves the state unchanged. A source id that no
    /// longer resolves reverts the state to non-heating without rolling
    /// back accumulated energy.
    pub fn tick(&mut self, dt: f32, sources: &HeatSources, self_position: Vec3) {
        if !self.heating || self.melt_fraction >= 1.0 {
            return;
        }
        let Some(id) = self.heat_source else {
            return;
        };
        let Some(source) = sources.get(id) else {
            log::debug!("heat source {:?} gone, melt reverts to idle", id);
            self.heating = false;
            self.heat_source = None;
            return;
        };

        let distance_m = source.position.distance(self_position);
        if source.max_range_m > 0.0 && distance_m > source.max_range_m {
            return;
        }

        let flux = source.flux_at_distance(distance_m.max(MIN_HEAT_DISTANCE_M));
        let mut received_w = flux * self.effective_area_m2;

        // Linear fade toward the edge of a ranged source
        if source.max_range_m > 0.0 {
            received_w *= (1.0 - distance_m / source.max_range_m).clamp(0.0, 1.0);
        }

        if received_w <= 0.0 {
            return;
        }

        self.energy_accum_j += received_w * dt * self.sim_time_scale.max(0.0);
        self.melt_fraction = (self.energy_accum_j / self.total_melt_energy_j).clamp(0.0, 1.0);

        self.progress_log_acc += dt;
        if self.progress_log_acc >= PROGRESS_LOG_INTERVAL {
            self.progress_log_acc = 0.0;
            log::trace!(
                "melt: d={:.2}m received={:.1}W accum={:.0}J fraction={:.3}",
                distance_m,
                received_w,
                self.energy_accum_j,
                self.melt_fraction
            );
        }

        if self.melt_fraction >= 1.0 {
            log::debug!(
                "melt complete after {:.0}J absorbed",
                self.energy_accum_j
            );
        }
    }

    /// World scale for the current fraction, shrinking toward
    /// `base_scale · min_scale_ratio`
    pub fn current_scale(&self) -> Vec3 {
        let ratio = self.min_scale_ratio.clamp(0.0, 1.0);
        self.base_scale
            .lerp(self.base_scale * ratio, self.melt_fraction)
    }

    /// Shader melt alpha, 0..1
    pub fn melt_alpha(&self) -> f32 {
        self.melt_fraction
    }

    pub fn is_fully_melted(&self) -> bool {
        self.melt_fraction >= 1.0
    }

    pub fn is_heating(&self) -> bool {
        self.heating
    }

    pub fn melt_fraction(&self) -> f32 {
        self.melt_fraction
    }

    pub fn energy_accum_j(&self) -> f32 {
        self.energy_accum_j
    }

    pub fn total_melt_energy_j(&self) -> f32 {
        self.total_melt_energy_j
    }

    pub fn effective_area_m2(&self) -> f32 {
        self.effective_area_m2
    }

    pub fn volume_m3(&self) -> f32 {
        self.volume_m3
    }

    pub fn base_scale(&self) -> Vec3 {
        self.base_scale
    }

    pub fn heat_source(&self) -> Option<HeatSourceId> {
        self.heat_source
    }
}

impl ThermalReceiver for MeltState {
    fn start_heating(&mut self, source: HeatSourceId) {
        self.heat_source = Some(source);
        self.heating = true;
    }

    fn stop_heating(&mut self) {
        self.heating = false;
        self.heat_source = None;
    }
}
