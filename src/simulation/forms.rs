//! Material-form state machine
//!
//! An object switches between discrete material forms, each described by a
//! [`FormSpec`] of opaque render handles and numeric physics properties.
//! Only the ice form melts; its progress survives excursions through the
//! other forms, so a half-melted block that turns to metal and back is
//! still half melted, at the same visual scale.

use crate::body::{BodyProperties, MeshHandle, PhysicalMaterialHandle, RenderMaterialHandle};
use crate::simulation::melt::{MeltParams, MeltSnapshot, MeltState};
use crate::simulation::thermal::{HeatSourceId, HeatSources, ThermalReceiver};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base-scale recovery keeps the melt factor away from zero
const MIN_SCALE_FACTOR: f32 = 1e-4;

/// The discrete material forms
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Form {
    Ice,
    Rubber,
    Metal,
    Wood,
}

impl Form {
    /// Whether this form runs the melt process
    pub fn is_meltable(self) -> bool {
        matches!(self, Form::Ice)
    }
}

/// Static properties of one material form
///
/// Mesh and material fields are opaque handles passed through to the
/// rendering collaborator; `None` entries leave the current binding
/// untouched when the spec is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormSpec {
    pub form: Form,
    pub mesh: Option<MeshHandle>,
    pub materials: Vec<RenderMaterialHandle>,
    pub physical_material: Option<PhysicalMaterialHandle>,
    pub simulate_physics: bool,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub mass_override_kg: Option<f32>,
}

impl FormSpec {
    pub fn new(form: Form) -> Self {
        FormSpec {
            form,
            mesh: None,
            materials: Vec::new(),
            physical_material: None,
            simulate_physics: true,
            linear_damping: 0.0,
            angular_damping: 0.0,
            mass_override_kg: None,
        }
    }

    /// The physics push derived from this spec
    pub fn body_properties(&self) -> BodyProperties {
        BodyProperties {
            simulate_physics: self.simulate_physics,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            physical_material: self.physical_material,
            mass_override_kg: self.mass_override_kg,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    /// The form has no registered spec; a configuration error the caller
    /// must handle, never silently defaulted
    #[error("no spec registered for form {0:?}")]
    UnknownForm(Form),
}

/// Per-object form selection with melt-progress preservation
pub struct FormStateMachine {
    current: Form,
    active_index: usize,
    specs: Vec<FormSpec>,
    cycle_order: Vec<Form>,
    melt_params: MeltParams,
    /// Current world scale output for the mesh transform
    scale: Vec3,
    /// World-space bounding size used for melt geometry
    extent_m: Vec3,
    /// Present only while the current form is meltable
    melt: Option<MeltState>,
    /// Progress parked while in a non-meltable form
    saved: Option<MeltSnapshot>,
}

impl FormStateMachine {
    /// Build a machine starting in `initial_form`
    ///
    /// Fails if the initial form has no spec. The meltable form starts
    /// with a fresh melt state over `initial_scale` and `extent_m`.
    pub fn new(
        initial_form: Form,
        initial_scale: Vec3,
        extent_m: Vec3,
        specs: Vec<FormSpec>,
        cycle_order: Vec<Form>,
        melt_params: MeltParams,
    ) -> Result<Self, FormError> {
        let active_index = specs
            .iter()
            .position(|s| s.form == initial_form)
            .ok_or(FormError::UnknownForm(initial_form))?;

        let mut machine = FormStateMachine {
            current: initial_form,
            active_index,
            specs,
            cycle_order,
            melt_params,
            scale: initial_scale,
            extent_m,
            melt: None,
            saved: None,
        };

        if initial_form.is_meltable() {
            let mut melt = MeltState::new();
            melt.activate(initial_scale, extent_m, &machine.melt_params);
            machine.melt = Some(melt);
        }

        Ok(machine)
    }

    pub fn current_form(&self) -> Form {
        self.current
    }

    /// World scale the rendering collaborator should apply
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// The applied form spec
    pub fn active_spec(&self) -> &FormSpec {
        &self.specs[self.active_index]
    }

    /// Physics properties of the applied form
    pub fn body_properties(&self) -> BodyProperties {
        self.active_spec().body_properties()
    }

    pub fn melt_params(&self) -> &MeltParams {
        &self.melt_params
    }

    /// Shader melt alpha; reflects parked progress in non-meltable forms
    pub fn melt_alpha(&self) -> f32 {
        match (&self.melt, &self.saved) {
            (Some(melt), _) => melt.melt_alpha(),
            (None, Some(saved)) => saved.melt_fraction,
            (None, None) => 0.0,
        }
    }

    pub fn is_fully_melted(&self) -> bool {
        self.melt_alpha() >= 1.0
    }

    /// Whether the caller's removal policy asks for this object to go
    pub fn pending_removal(&self) -> bool {
        self.melt_params.destroy_when_melted && self.is_fully_melted()
    }

    pub fn melt_state(&self) -> Option<&MeltState> {
        self.melt.as_ref()
    }

    /// Update the bounding size when the host's mesh or bounds change
    pub fn set_extent(&mut self, extent_m: Vec3) {
        self.extent_m = extent_m;
        if let Some(melt) = self.melt.as_mut() {
            let base = melt.base_scale();
            melt.activate(base, extent_m, &self.melt_params);
        }
    }

    fn spec_index(&self, form: Form) -> Option<usize> {
        self.specs.iter().position(|s| s.form == form)
    }

    /// Switch to `new_form`, preserving melt progress
    ///
    /// Same-form calls re-apply the current spec and touch nothing
    /// numeric. An unregistered form fails without mutating any state.
    pub fn set_form(&mut self, new_form: Form) -> Result<(), FormError> {
        let new_index = self
            .spec_index(new_form)
            .ok_or(FormError::UnknownForm(new_form))?;

        if new_form == self.current {
            log::debug!("form {:?} re-applied", new_form);
            return Ok(());
        }

        let leaving = self.current;
        if leaving.is_meltable() {
            if let Some(melt) = self.melt.take() {
                // Keep the absolute, possibly-shrunken scale; a partial
                // melt is not undone by wearing a different form
                self.scale = melt.current_scale();
                self.saved = Some(melt.snapshot());
            }
        }

        self.current = new_form;
        self.active_index = new_index;

        if new_form.is_meltable() {
            let snapshot = self.saved.take();
            let fraction = snapshot.map(|s| s.melt_fraction).unwrap_or(0.0);

            // Recover the pre-melt base scale from the shrunken one
            let base = if fraction > 0.0 {
                let ratio = self.melt_params.min_scale_ratio.clamp(0.0, 1.0);
                let factor = (1.0 + (ratio - 1.0) * fraction).max(MIN_SCALE_FACTOR);
                self.scale / factor
            } else {
                self.scale
            };

            let mut melt = MeltState::new();
            melt.activate(base, self.extent_m, &self.melt_params);
            if let Some(snap) = snapshot {
                melt.restore(snap);
            }
            self.scale = melt.current_scale();
            self.melt = Some(melt);
        }

        log::debug!("form {:?} -> {:?}", leaving, new_form);
        Ok(())
    }

    /// Switch to the next form in the cycle order
    ///
    /// A current form missing from the order jumps to the first entry;
    /// an empty order changes nothing.
    pub fn advance_cycle(&mut self) -> Result<Form, FormError> {
        if self.cycle_order.is_empty() {
            return Ok(self.current);
        }
        let next = match self.cycle_order.iter().position(|&f| f == self.current) {
            Some(index) => self.cycle_order[(index + 1) % self.cycle_order.len()],
            None => self.cycle_order[0],
        };
        self.set_form(next)?;
        Ok(next)
    }

    /// Advance the active melt process, if any
    pub fn tick(&mut self, dt: f32, sources: &HeatSources, position: Vec3) {
        if let Some(melt) = self.melt.as_mut() {
            melt.tick(dt, sources, position);
            self.scale = melt.current_scale();
        }
    }
}

impl ThermalReceiver for FormStateMachine {
    fn start_heating(&mut self, source: HeatSourceId) {
        // Heating requests outside the meltable form are ignored
        if let Some(melt) = self.melt.as_mut() {
            melt.start_heating(source);
        }
    }

    fn stop_heating(&mut self) {
        if let Some(melt) = self.melt.as_mut() {
            melt.stop_heating();
        } else if let Some(saved) = self.saved.as_mut() {
            saved.heating = false;
            saved.heat_source = None;
        }
    }

    fn accepts_heat(&self) -> bool {
        self.current.is_meltable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::thermal::RadiantSource;

    fn all_specs() -> Vec<FormSpec> {
        vec![
            FormSpec {
                mesh: Some(MeshHandle(10)),
                materials: vec![RenderMaterialHandle(20)],
                linear_damping: 0.1,
                ..FormSpec::new(Form::Ice)
            },
            FormSpec {
                linear_damping: 2.0,
                angular_damping: 1.5,
                ..FormSpec::new(Form::Rubber)
            },
            FormSpec {
                physical_material: Some(PhysicalMaterialHandle(3)),
                mass_override_kg: Some(40.0),
                ..FormSpec::new(Form::Metal)
            },
            FormSpec {
                simulate_physics: false,
                ..FormSpec::new(Form::Wood)
            },
        ]
    }

    fn cycle() -> Vec<Form> {
        vec![Form::Metal, Form::Ice, Form::Rubber, Form::Wood]
    }

    fn params() -> MeltParams {
        MeltParams {
            sim_time_scale: 1.0,
            ..MeltParams::default()
        }
    }

    fn machine(initial: Form) -> FormStateMachine {
        FormStateMachine::new(
            initial,
            Vec3::ONE,
            Vec3::splat(0.1),
            all_specs(),
            cycle(),
            params(),
        )
        .unwrap()
    }

    fn heat_setup() -> (HeatSources, HeatSourceId) {
        let mut source = RadiantSource::new(Vec3::ZERO);
        source.max_range_m = 0.0;
        source.cool_rate_per_sec = 0.0;
        let mut sources = HeatSources::new();
        let id = sources.insert(source);
        (sources, id)
    }

    /// Tick until the melt fraction passes `target`, returning the
    /// reached fraction
    fn heat_to(
        machine: &mut FormStateMachine,
        sources: &HeatSources,
        target: f32,
    ) -> f32 {
        while machine.melt_alpha() < target {
            machine.tick(100.0, sources, Vec3::new(1.0, 0.0, 0.0));
        }
        machine.melt_alpha()
    }

    #[test]
    fn test_new_requires_registered_form() {
        let specs = vec![FormSpec::new(Form::Rubber)];
        let result = FormStateMachine::new(
            Form::Ice,
            Vec3::ONE,
            Vec3::splat(0.1),
            specs,
            cycle(),
            params(),
        );
        assert_eq!(result.err(), Some(FormError::UnknownForm(Form::Ice)));
    }

    #[test]
    fn test_meltable_start_owns_melt_state() {
        let ice_machine = machine(Form::Ice);
        assert!(ice_machine.melt_state().is_some());
        assert_eq!(ice_machine.melt_alpha(), 0.0);

        let metal_machine = machine(Form::Metal);
        assert!(metal_machine.melt_state().is_none());
    }

    #[test]
    fn test_set_form_idempotent() {
        let (sources, id) = heat_setup();
        let mut machine = machine(Form::Ice);
        machine.start_heating(id);
        heat_to(&mut machine, &sources, 0.2);

        let fraction = machine.melt_alpha();
        let energy = machine.melt_state().unwrap().energy_accum_j();
        let scale = machine.scale();

        machine.set_form(Form::Ice).unwrap();

        assert_eq!(machine.melt_alpha(), fraction);
        assert_eq!(machine.melt_state().unwrap().energy_accum_j(), energy);
        assert_eq!(machine.scale(), scale);
        assert!(machine.melt_state().unwrap().is_heating());
    }

    #[test]
    fn test_unknown_form_is_atomic() {
        let (sources, id) = heat_setup();
        let mut specs = all_specs();
        specs.retain(|s| s.form != Form::Wood);
        let mut machine = FormStateMachine::new(
            Form::Ice,
            Vec3::ONE,
            Vec3::splat(0.1),
            specs,
            cycle(),
            params(),
        )
        .unwrap();

        machine.start_heating(id);
        heat_to(&mut machine, &sources, 0.2);
        let fraction = machine.melt_alpha();
        let scale = machine.scale();

        assert_eq!(
            machine.set_form(Form::Wood),
            Err(FormError::UnknownForm(Form::Wood))
        );
        assert_eq!(machine.current_form(), Form::Ice);
        assert_eq!(machine.melt_alpha(), fraction);
        assert_eq!(machine.scale(), scale);
        assert!(machine.melt_state().is_some());
    }

    #[test]
    fn test_round_trip_preserves_melt_progress() {
        let (sources, id) = heat_setup();
        let mut machine = machine(Form::Ice);
        machine.start_heating(id);

        let fraction = heat_to(&mut machine, &sources, 0.4);
        let scale_before = machine.scale();
        let base_before = machine.melt_state().unwrap().base_scale();

        machine.set_form(Form::Metal).unwrap();
        assert!(machine.melt_state().is_none());
        // Progress is parked, the shrunken scale is kept
        assert!((machine.melt_alpha() - fraction).abs() < 1e-6);
        assert_eq!(machine.scale(), scale_before);

        machine.set_form(Form::Ice).unwrap();
        let melt = machine.melt_state().unwrap();
        assert!((melt.melt_fraction() - fraction).abs() < 1e-4);
        assert!((melt.base_scale() - base_before).length() < 1e-4);
        assert!((machine.scale() - scale_before).length() < 1e-4);
        assert!(melt.is_heating(), "heating survives the round trip");
    }

    #[test]
    fn test_scale_persists_across_non_meltable_forms() {
        let (sources, id) = heat_setup();
        let mut machine = machine(Form::Ice);
        machine.start_heating(id);
        heat_to(&mut machine, &sources, 0.3);
        let shrunken = machine.scale();
        assert!(shrunken.x < 1.0);

        machine.set_form(Form::Rubber).unwrap();
        assert_eq!(machine.scale(), shrunken);

        machine.set_form(Form::Wood).unwrap();
        assert_eq!(machine.scale(), shrunken);
        assert!((machine.melt_alpha() - 0.3).abs() < 0.1);
    }

    #[test]
    fn test_advance_cycle() {
        let mut machine = machine(Form::Metal);
        assert_eq!(machine.advance_cycle().unwrap(), Form::Ice);
        assert_eq!(machine.advance_cycle().unwrap(), Form::Rubber);
        assert_eq!(machine.advance_cycle().unwrap(), Form::Wood);
        // Wraps around
        assert_eq!(machine.advance_cycle().unwrap(), Form::Metal);
    }

    #[test]
    fn test_advance_cycle_from_outside_order() {
        let mut machine = FormStateMachine::new(
            Form::Ice,
            Vec3::ONE,
            Vec3::splat(0.1),
            all_specs(),
            vec![Form::Metal, Form::Rubber],
            params(),
        )
        .unwrap();
        // Ice is not in the order: jump to the first entry
        assert_eq!(machine.advance_cycle().unwrap(), Form::Metal);
    }

    #[test]
    fn test_advance_cycle_empty_order() {
        let mut machine = FormStateMachine::new(
            Form::Ice,
            Vec3::ONE,
            Vec3::splat(0.1),
            all_specs(),
            Vec::new(),
            params(),
        )
        .unwrap();
        assert_eq!(machine.advance_cycle().unwrap(), Form::Ice);
        assert_eq!(machine.current_form(), Form::Ice);
    }

    #[test]
    fn test_body_properties_follow_active_form() {
        let mut machine = machine(Form::Metal);
        let props = machine.body_properties();
        assert_eq!(props.mass_override_kg, Some(40.0));
        assert_eq!(props.physical_material, Some(PhysicalMaterialHandle(3)));
        assert!(props.simulate_physics);

        machine.set_form(Form::Wood).unwrap();
        let props = machine.body_properties();
        assert!(!props.simulate_physics);
        assert_eq!(props.mass_override_kg, None);

        machine.set_form(Form::Rubber).unwrap();
        let props = machine.body_properties();
        assert_eq!(props.linear_damping, 2.0);
        assert_eq!(props.angular_damping, 1.5);
    }

    #[test]
    fn test_heating_ignored_in_non_meltable_form() {
        let (sources, id) = heat_setup();
        let mut machine = machine(Form::Metal);
        assert!(!machine.accepts_heat());

        machine.start_heating(id);
        machine.tick(100.0, &sources, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(machine.melt_alpha(), 0.0);

        // Switching to ice afterwards does not retroactively heat
        machine.set_form(Form::Ice).unwrap();
        assert!(!machine.melt_state().unwrap().is_heating());
    }

    #[test]
    fn test_stop_heating_clears_parked_progress() {
        let (sources, id) = heat_setup();
        let mut machine = machine(Form::Ice);
        machine.start_heating(id);
        heat_to(&mut machine, &sources, 0.2);

        machine.set_form(Form::Metal).unwrap();
        machine.stop_heating();

        machine.set_form(Form::Ice).unwrap();
        let melt = machine.melt_state().unwrap();
        assert!(!melt.is_heating());
        assert!(melt.heat_source().is_none());
        // The parked energy itself is untouched
        assert!(melt.melt_fraction() > 0.0);
    }

    #[test]
    fn test_full_melt_and_removal_policy() {
        let (sources, id) = heat_setup();
        let mut machine = FormStateMachine::new(
            Form::Ice,
            Vec3::ONE,
            Vec3::splat(0.1),
            all_specs(),
            cycle(),
            MeltParams {
                sim_time_scale: 1.0,
                destroy_when_melted: true,
                ..MeltParams::default()
            },
        )
        .unwrap();

        machine.start_heating(id);
        assert!(!machine.pending_removal());

        heat_to(&mut machine, &sources, 1.0);
        assert!(machine.is_fully_melted());
        assert!(machine.pending_removal());

        let ratio = machine.melt_params().min_scale_ratio;
        assert!((machine.scale() - Vec3::ONE * ratio).length() < 1e-5);
    }
}
