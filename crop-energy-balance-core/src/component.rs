//! Module containing canopy components: the soil and leaf layers (lumped, sunlit or shaded).

use crate::crop::CanopyStateVariables;
use crate::formalisms::irradiance::LeafExposure;
use crate::formalisms::weather::convert_photosynthetically_active_radiation_into_global_radiation;
use crate::formalisms::{component, lumped_leaves, soil, sunlit_shaded_leaves};
use crate::imports::*;
use crate::inputs::{AbsorbedIrradiance, Inputs, SOIL_INDEX};
use crate::params::{Constants, Params};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Soil,
    LumpedLeaf,
    SunlitLeaf,
    ShadedLeaf,
}

/// State shared by every kind of component.
///
/// Structural fields are set at construction, `init_state_variables` sets the irradiance and
/// resistance terms once, solver iterations only touch the conductance/energy/temperature chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ComponentState {
    /// layer index, `-1` for the soil
    pub index: i32,
    /// [-] share of the layer covered by the component
    pub surface_fraction: f64,
    /// [m2leaf m-2ground]
    pub upper_cumulative_leaf_area_index: f64,
    /// [m2leaf m-2ground]
    pub lower_cumulative_leaf_area_index: f64,
    /// [m2leaf m-2ground]
    pub thickness: f64,
    /// [W m-2ground] absorbed photosynthetically active radiation
    pub absorbed_irradiance: f64,
    /// [h m-1]
    pub surface_resistance: f64,
    /// [h m-1]
    pub boundary_resistance: f64,
    /// [h m-1]
    pub composed_resistance: f64,
    /// [m h-1]
    pub composed_conductance: f64,
    /// [W m-2ground]
    pub net_longwave_radiation: f64,
    /// [W m-2ground]
    pub available_energy: f64,
    /// [W m-2ground]
    pub evaporative_energy: f64,
    /// [K]
    pub temperature: f64,
    /// [K] temperature retained from the previous iteration
    pub previous_temperature: f64,
}

impl ComponentState {
    fn new(
        index: i32,
        upper_cumulative_leaf_area_index: f64,
        thickness: f64,
        surface_fraction: f64,
    ) -> Self {
        Self {
            index,
            surface_fraction,
            upper_cumulative_leaf_area_index,
            lower_cumulative_leaf_area_index: upper_cumulative_leaf_area_index + thickness,
            thickness,
            ..Default::default()
        }
    }

    /// Sets the Lhomme composed resistance and the initial temperature guess, once surface and
    /// boundary resistances are known
    fn init_composed_resistance(
        &mut self,
        canopy: &CanopyStateVariables,
        stomatal_density_factor: f64,
    ) {
        self.composed_resistance = component::calc_composed_resistance(
            self.surface_resistance,
            self.boundary_resistance,
            canopy.vapor_pressure_slope,
            canopy.psychrometric_constant,
            stomatal_density_factor,
        )
        .max(PRECISION);
        self.temperature = canopy.air_temperature;
        self.previous_temperature = canopy.air_temperature;
    }
}

/// Behaviour shared by every canopy component
pub trait CropComponent {
    fn state(&self) -> &ComponentState;

    fn state_mut(&mut self) -> &mut ComponentState;

    fn kind(&self) -> ComponentKind;

    /// Sets irradiance, resistance and energy terms. Must be called once, before any solver
    /// iteration.
    fn init_state_variables(
        &mut self,
        inputs: &Inputs,
        params: &Params,
        constants: &Constants,
        canopy: &CanopyStateVariables,
    ) -> anyhow::Result<()>;

    fn calc_composed_conductance(&mut self, canopy: &CanopyStateVariables) {
        let state = self.state_mut();
        state.composed_conductance = component::calc_composed_conductance(
            state.composed_resistance,
            canopy.sum_composed_conductances,
            canopy.lumped_aerodynamic_resistance,
        );
    }

    fn calc_evaporative_energy(&mut self, canopy: &CanopyStateVariables) {
        let state = self.state_mut();
        state.evaporative_energy = component::calc_evaporative_energy(
            state.available_energy,
            state.boundary_resistance,
            state.composed_resistance,
            canopy.lumped_aerodynamic_resistance,
            canopy.penman_evaporative_energy,
            canopy.penman_monteith_evaporative_energy,
            canopy.vapor_pressure_slope,
            canopy.psychrometric_constant,
        );
    }

    /// Sets the (undamped) temperature of the component from the canopy source temperature,
    /// floored at absolute zero
    fn calc_temperature(&mut self, canopy: &CanopyStateVariables, constants: &Constants) {
        let state = self.state_mut();
        state.temperature = component::calc_temperature(
            canopy.source_temperature,
            state.boundary_resistance,
            state.available_energy,
            state.evaporative_energy,
            constants.air_volumetric_heat_capacity(),
        )
        .max(0.0);
    }

    /// Damps the last temperature change by `step_fraction` and retains the damped value for the
    /// next iteration
    fn update_temperature(&mut self, step_fraction: f64) {
        let state = self.state_mut();
        state.temperature = state.previous_temperature
            + crate::utils::calc_temperature_step(
                state.previous_temperature,
                state.temperature,
                step_fraction,
            );
        state.previous_temperature = state.temperature;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Soil {
    pub state: ComponentState,
    /// [W m-2ground] heat flux into the soil
    pub heat_flux: f64,
}

impl Soil {
    pub fn new(canopy_leaf_area_index: f64) -> Self {
        Self {
            state: ComponentState::new(SOIL_INDEX, canopy_leaf_area_index, 0.0, 1.0),
            heat_flux: 0.0,
        }
    }
}

impl CropComponent for Soil {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Soil
    }

    fn init_state_variables(
        &mut self,
        inputs: &Inputs,
        params: &Params,
        constants: &Constants,
        canopy: &CanopyStateVariables,
    ) -> anyhow::Result<()> {
        let sim = &params.simulation;
        self.state.absorbed_irradiance = inputs
            .absorbed_irradiance
            .get(&SOIL_INDEX)
            .map(AbsorbedIrradiance::total)
            .with_context(|| format_dbg!(SOIL_INDEX))?;
        self.state.surface_resistance = soil::calc_surface_resistance(
            inputs.soil_saturation_ratio,
            sim.soil_resistance_to_vapor_shape_parameter_1,
            sim.soil_resistance_to_vapor_shape_parameter_2,
        );
        self.state.boundary_resistance = soil::calc_boundary_resistance(
            canopy.canopy_height,
            canopy.wind_speed,
            canopy.measurement_height,
            sim.soil_roughness_length_for_momentum,
            sim.soil_aerodynamic_resistance_shape_parameter,
            constants.von_karman,
        );
        self.state.net_longwave_radiation = soil::calc_net_longwave_radiation(
            canopy.net_longwave_radiation,
            canopy.leaf_area_index,
            canopy.optics.diffuse_black_extinction_coefficient,
            sim.soil_emissivity,
        );
        self.heat_flux = soil::calc_heat_flux(
            canopy.net_radiation,
            inputs.incident_irradiance.total() > 0.0,
        );
        self.state.available_energy = component::calc_available_energy(
            convert_photosynthetically_active_radiation_into_global_radiation(
                self.state.absorbed_irradiance,
            ),
            self.state.net_longwave_radiation,
            self.heat_flux,
        );
        // bare soil has no stomata
        self.state.init_composed_resistance(canopy, 1.0);
        Ok(())
    }
}

/// Leaf layer made of one pseudo-leaf
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LumpedLeaf {
    pub state: ComponentState,
    /// [-] stomatal closure fraction due to water stress
    pub stomatal_sensibility: f64,
}

impl LumpedLeaf {
    pub fn new(index: i32, upper_cumulative_leaf_area_index: f64, thickness: f64) -> Self {
        Self {
            state: ComponentState::new(index, upper_cumulative_leaf_area_index, thickness, 1.0),
            stomatal_sensibility: 1.0,
        }
    }
}

impl CropComponent for LumpedLeaf {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::LumpedLeaf
    }

    fn init_state_variables(
        &mut self,
        inputs: &Inputs,
        params: &Params,
        _constants: &Constants,
        canopy: &CanopyStateVariables,
    ) -> anyhow::Result<()> {
        let sim = &params.simulation;
        let index = self.state.index;
        self.state.absorbed_irradiance = match inputs.absorbed_irradiance.get(&index) {
            Some(AbsorbedIrradiance::Lumped { lumped }) => *lumped,
            other => bail!(
                "expected lumped absorbed irradiance for leaf layer {}, got {:?}",
                index,
                other
            ),
        };
        self.stomatal_sensibility = sim
            .stomatal_sensibility
            .calc_stomatal_sensibility(canopy.vapor_pressure_deficit, inputs.soil_water_potential)
            .with_context(|| format!("leaf layer {}", index))?;
        self.state.surface_resistance =
            lumped_leaves::calc_leaf_layer_resistance(lumped_leaves::calc_leaf_layer_surface_conductance(
                inputs.incident_irradiance.total(),
                self.state.upper_cumulative_leaf_area_index,
                self.state.lower_cumulative_leaf_area_index,
                self.stomatal_sensibility,
                sim.global_extinction_coefficient,
                sim.maximum_stomatal_conductance,
                sim.residual_stomatal_conductance,
                sim.absorbed_par_50,
            ));
        self.state.boundary_resistance =
            lumped_leaves::calc_leaf_layer_resistance(lumped_leaves::calc_leaf_layer_boundary_conductance(
                canopy.wind_speed_at_canopy_height,
                self.state.upper_cumulative_leaf_area_index,
                self.state.lower_cumulative_leaf_area_index,
                sim.wind_speed_extinction_coef,
                sim.leaf_characteristic_length,
                sim.leaf_boundary_layer_shape_parameter,
            ));
        self.state.net_longwave_radiation = lumped_leaves::calc_leaf_layer_net_longwave_radiation(
            canopy.net_longwave_radiation,
            self.state.upper_cumulative_leaf_area_index,
            self.state.lower_cumulative_leaf_area_index,
            canopy.optics.diffuse_black_extinction_coefficient,
            sim.leaf_emissivity,
        );
        self.state.available_energy = component::calc_available_energy(
            convert_photosynthetically_active_radiation_into_global_radiation(
                self.state.absorbed_irradiance,
            ),
            self.state.net_longwave_radiation,
            0.0,
        );
        self.state
            .init_composed_resistance(canopy, sim.stomatal_density_factor);
        Ok(())
    }
}

/// Sunlit or shaded share of a leaf layer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SunlitShadedLeaf {
    pub exposure: LeafExposure,
    pub state: ComponentState,
    /// [-] stomatal closure fraction due to water stress
    pub stomatal_sensibility: f64,
}

impl SunlitShadedLeaf {
    pub fn new(
        exposure: LeafExposure,
        index: i32,
        upper_cumulative_leaf_area_index: f64,
        thickness: f64,
        direct_black_extinction_coefficient: f64,
    ) -> Self {
        let kb = direct_black_extinction_coefficient;
        let lower_cumulative_leaf_area_index = upper_cumulative_leaf_area_index + thickness;
        let sunlit_fraction = if thickness > 0.0 && kb > 0.0 {
            ((-kb * upper_cumulative_leaf_area_index).exp()
                - (-kb * lower_cumulative_leaf_area_index).exp())
                / (kb * thickness)
        } else {
            1.0
        };
        let surface_fraction = match exposure {
            LeafExposure::Sunlit => sunlit_fraction,
            LeafExposure::Shaded => 1.0 - sunlit_fraction,
        };
        Self {
            exposure,
            state: ComponentState::new(
                index,
                upper_cumulative_leaf_area_index,
                thickness,
                surface_fraction,
            ),
            stomatal_sensibility: 1.0,
        }
    }
}

impl CropComponent for SunlitShadedLeaf {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn kind(&self) -> ComponentKind {
        match self.exposure {
            LeafExposure::Sunlit => ComponentKind::SunlitLeaf,
            LeafExposure::Shaded => ComponentKind::ShadedLeaf,
        }
    }

    fn init_state_variables(
        &mut self,
        inputs: &Inputs,
        params: &Params,
        _constants: &Constants,
        canopy: &CanopyStateVariables,
    ) -> anyhow::Result<()> {
        let sim = &params.simulation;
        let optics = &canopy.optics;
        let index = self.state.index;
        self.state.absorbed_irradiance = match (inputs.absorbed_irradiance.get(&index), self.exposure) {
            (Some(AbsorbedIrradiance::SunlitShaded { sunlit, .. }), LeafExposure::Sunlit) => *sunlit,
            (Some(AbsorbedIrradiance::SunlitShaded { shaded, .. }), LeafExposure::Shaded) => *shaded,
            (other, _) => bail!(
                "expected sunlit and shaded absorbed irradiance for leaf layer {}, got {:?}",
                index,
                other
            ),
        };
        self.stomatal_sensibility = sim
            .stomatal_sensibility
            .calc_stomatal_sensibility(canopy.vapor_pressure_deficit, inputs.soil_water_potential)
            .with_context(|| format!("leaf layer {}", index))?;
        self.state.surface_resistance = lumped_leaves::calc_leaf_layer_resistance(
            sunlit_shaded_leaves::calc_leaf_layer_surface_conductance(
                self.exposure,
                optics,
                inputs.incident_irradiance.direct,
                inputs.incident_irradiance.diffuse,
                self.state.upper_cumulative_leaf_area_index,
                self.state.lower_cumulative_leaf_area_index,
                self.stomatal_sensibility,
                sim.maximum_stomatal_conductance,
                sim.residual_stomatal_conductance,
                sim.absorbed_par_50,
                sim.sublayers_number,
            )
            .with_context(|| format!("leaf layer {} ({:?})", index, self.exposure))?,
        );
        self.state.boundary_resistance = lumped_leaves::calc_leaf_layer_resistance(
            sunlit_shaded_leaves::calc_leaf_layer_boundary_conductance(
                self.exposure,
                canopy.wind_speed_at_canopy_height,
                self.state.upper_cumulative_leaf_area_index,
                self.state.lower_cumulative_leaf_area_index,
                optics.direct_black_extinction_coefficient,
                sim.wind_speed_extinction_coef,
                sim.leaf_characteristic_length,
                sim.leaf_boundary_layer_shape_parameter,
            ),
        );
        self.state.net_longwave_radiation = sunlit_shaded_leaves::calc_leaf_layer_net_longwave_radiation(
            self.exposure,
            canopy.net_longwave_radiation,
            self.state.upper_cumulative_leaf_area_index,
            self.state.lower_cumulative_leaf_area_index,
            optics.direct_black_extinction_coefficient,
            optics.diffuse_black_extinction_coefficient,
            sim.leaf_emissivity,
        );
        self.state.available_energy = component::calc_available_energy(
            convert_photosynthetically_active_radiation_into_global_radiation(
                self.state.absorbed_irradiance,
            ),
            self.state.net_longwave_radiation,
            0.0,
        );
        self.state
            .init_composed_resistance(canopy, sim.stomatal_density_factor);
        Ok(())
    }
}

/// Any canopy component. Sunlit and shaded leaves share one variant, told apart by their
/// `exposure`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    Soil(Soil),
    LumpedLeaf(LumpedLeaf),
    SunlitShadedLeaf(SunlitShadedLeaf),
}

impl Component {
    /// [W m-2ground] heat flux into the soil, `None` for leaves
    pub fn heat_flux(&self) -> Option<f64> {
        match self {
            Self::Soil(soil) => Some(soil.heat_flux),
            _ => None,
        }
    }
}

impl From<SunlitShadedLeaf> for Component {
    fn from(leaf: SunlitShadedLeaf) -> Self {
        Self::SunlitShadedLeaf(leaf)
    }
}

impl CropComponent for Component {
    fn state(&self) -> &ComponentState {
        match self {
            Self::Soil(c) => c.state(),
            Self::LumpedLeaf(c) => c.state(),
            Self::SunlitShadedLeaf(c) => c.state(),
        }
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        match self {
            Self::Soil(c) => c.state_mut(),
            Self::LumpedLeaf(c) => c.state_mut(),
            Self::SunlitShadedLeaf(c) => c.state_mut(),
        }
    }

    fn kind(&self) -> ComponentKind {
        match self {
            Self::Soil(c) => c.kind(),
            Self::LumpedLeaf(c) => c.kind(),
            Self::SunlitShadedLeaf(c) => c.kind(),
        }
    }

    fn init_state_variables(
        &mut self,
        inputs: &Inputs,
        params: &Params,
        constants: &Constants,
        canopy: &CanopyStateVariables,
    ) -> anyhow::Result<()> {
        match self {
            Self::Soil(c) => c.init_state_variables(inputs, params, constants, canopy),
            Self::LumpedLeaf(c) => c.init_state_variables(inputs, params, constants, canopy),
            Self::SunlitShadedLeaf(c) => {
                c.init_state_variables(inputs, params, constants, canopy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::Crop;
    use crate::inputs::tests::big_leaf_inputs;

    #[test]
    fn test_composed_resistance_is_not_below_boundary_resistance() {
        let crop = Crop::new(big_leaf_inputs(), Params::default(), Constants::default()).unwrap();
        for c in crop.extract_all_components() {
            let state = c.state();
            assert!(state.composed_resistance >= state.boundary_resistance);
            assert!(state.composed_resistance > 0.0);
            assert!(state.boundary_resistance > 0.0);
            assert!(state.surface_resistance > 0.0);
        }
    }

    #[test]
    fn test_init_sets_initial_temperature_to_air_temperature() {
        let crop = Crop::new(big_leaf_inputs(), Params::default(), Constants::default()).unwrap();
        let air_temperature = crop.state_variables.air_temperature;
        assert!((air_temperature - 293.15).abs() < 1e-9);
        for c in crop.extract_all_components() {
            assert_eq!(c.state().temperature, air_temperature);
            assert_eq!(c.state().previous_temperature, air_temperature);
        }
    }

    #[test]
    fn test_soil_heat_flux_depends_on_daylight() {
        let day = Crop::new(big_leaf_inputs(), Params::default(), Constants::default()).unwrap();
        let mut night_inputs = big_leaf_inputs();
        night_inputs.incident_irradiance.direct = 0.0;
        night_inputs.incident_irradiance.diffuse = 0.0;
        for absorbed in night_inputs.absorbed_irradiance.values_mut() {
            *absorbed = AbsorbedIrradiance::Lumped { lumped: 0.0 };
        }
        let night = Crop::new(night_inputs, Params::default(), Constants::default()).unwrap();
        let soil_flux = |crop: &Crop| crop.soil().and_then(Component::heat_flux).unwrap();
        assert!((soil_flux(&day) - 0.1 * day.state_variables.net_radiation).abs() < 1e-9);
        assert!((soil_flux(&night) - 0.5 * night.state_variables.net_radiation).abs() < 1e-9);
        // no absorbed shortwave at night: longwave losses dominate
        assert!(night.state_variables.net_radiation < 0.0);
    }

    #[test]
    fn test_update_temperature_damps_the_step() {
        let mut leaf = LumpedLeaf::new(0, 0.0, 1.0);
        leaf.state.previous_temperature = 290.0;
        leaf.state.temperature = 300.0;
        leaf.update_temperature(0.5);
        assert_eq!(leaf.state.temperature, 295.0);
        assert_eq!(leaf.state.previous_temperature, 295.0);
    }

    #[test]
    fn test_temperature_is_floored_at_absolute_zero() {
        let constants = Constants::default();
        let canopy = CanopyStateVariables {
            source_temperature: 293.15,
            ..Default::default()
        };
        let mut leaf = LumpedLeaf::new(0, 0.0, 1.0);
        leaf.state.boundary_resistance = 1.0;
        leaf.state.evaporative_energy = 0.0;
        leaf.state.available_energy = -1.0e6;
        assert!(
            component::calc_temperature(
                canopy.source_temperature,
                leaf.state.boundary_resistance,
                leaf.state.available_energy,
                leaf.state.evaporative_energy,
                constants.air_volumetric_heat_capacity(),
            ) < 0.0
        );
        leaf.calc_temperature(&canopy, &constants);
        assert_eq!(leaf.state.temperature, 0.0);

        let mut soil = Soil::new(1.0);
        soil.state.boundary_resistance = 10.0;
        soil.state.available_energy = -500.0;
        soil.calc_temperature(&canopy, &constants);
        assert_eq!(soil.state.temperature, 0.0);

        // ordinary energy deficits are left untouched
        leaf.state.available_energy = -10.0;
        leaf.state.boundary_resistance = 0.01;
        leaf.calc_temperature(&canopy, &constants);
        assert!(leaf.state.temperature > 0.0);
        assert!(leaf.state.temperature < canopy.source_temperature);
    }

    #[test]
    fn test_leaf_exposure_sets_component_kind() {
        let shaded = Component::from(SunlitShadedLeaf::new(LeafExposure::Shaded, 0, 0.0, 1.0, 0.7));
        let mut value = serde_json::to_value(&shaded).unwrap();
        assert_eq!(value["kind"], "sunlit_shaded_leaf");
        assert_eq!(value["exposure"], "shaded");
        let loaded: Component = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(loaded.kind(), ComponentKind::ShadedLeaf);
        assert_eq!(loaded, shaded);

        value["exposure"] = "sunlit".into();
        let loaded: Component = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(loaded.kind(), ComponentKind::SunlitLeaf);

        // per-exposure tags are not accepted
        value["kind"] = "shaded_leaf".into();
        assert!(serde_json::from_value::<Component>(value).is_err());
    }

    #[test]
    fn test_sunlit_and_shaded_fractions_complement_each_other() {
        let sunlit = SunlitShadedLeaf::new(LeafExposure::Sunlit, 1, 0.5, 1.0, 0.7);
        let shaded = SunlitShadedLeaf::new(LeafExposure::Shaded, 1, 0.5, 1.0, 0.7);
        assert!((sunlit.state.surface_fraction + shaded.state.surface_fraction - 1.0).abs() < 1e-12);
        assert_eq!(Component::from(sunlit).kind(), ComponentKind::SunlitLeaf);
        assert_eq!(Component::from(shaded).kind(), ComponentKind::ShadedLeaf);
        assert!((LumpedLeaf::new(2, 1.0, 0.5).state.lower_cumulative_leaf_area_index - 1.5).abs() < 1e-12);
    }
}
