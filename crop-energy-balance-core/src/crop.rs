//! Module containing the crop aggregate: its ordered components and the canopy-level state.

use crate::component::{
    Component, CropComponent, LumpedLeaf, Soil, SunlitShadedLeaf,
};
use crate::formalisms::irradiance::{leaf_exposures, CanopyOptics};
use crate::formalisms::{canopy, weather};
use crate::imports::*;
use crate::inputs::{Inputs, SOIL_INDEX};
use crate::params::{Constants, LeavesCategory, Params};

/// [m h-1] wind speed below which inputs are considered calm
pub const MINIMUM_INPUT_WIND_SPEED: f64 = 36.0;

/// Canopy-level (big-leaf) state of one timestep
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CanopyStateVariables {
    /// [K]
    pub air_temperature: f64,
    /// [K] air temperature at source height
    pub source_temperature: f64,
    /// [m h-1] wind speed at measurement height
    pub wind_speed: f64,
    /// [m]
    pub measurement_height: f64,
    /// [m]
    pub canopy_height: f64,
    /// [m2leaf m-2ground]
    pub leaf_area_index: f64,
    /// [m]
    pub zero_displacement_height: f64,
    /// [m]
    pub roughness_length_for_momentum: f64,
    /// [m]
    pub roughness_length_for_heat_transfer: f64,
    /// [m h-1]
    pub wind_speed_at_canopy_height: f64,
    /// [kPa]
    pub vapor_pressure_deficit: f64,
    /// [kPa K-1]
    pub vapor_pressure_slope: f64,
    /// [kPa K-1]
    pub psychrometric_constant: f64,
    /// [-]
    pub atmospheric_emissivity: f64,
    pub optics: CanopyOptics,
    /// [h m-1]
    pub aerodynamic_resistance: f64,
    /// [h m-1]
    pub lumped_aerodynamic_resistance: f64,
    /// [W m-2ground] net longwave radiation at the top of the canopy
    pub net_longwave_radiation: f64,
    /// [W m-2ground]
    pub available_energy: f64,
    /// [W m-2ground]
    pub net_radiation: f64,
    /// [m h-1] sum of the inverse composed resistances of all components
    pub sum_composed_conductances: f64,
    /// [W m-2ground]
    pub penman_evaporative_energy: f64,
    /// [W m-2ground] canopy evaporative energy
    pub penman_monteith_evaporative_energy: f64,
    /// [W m-2ground]
    pub sensible_heat_flux: f64,
    /// [m h-1]
    pub friction_velocity: f64,
    /// [m]
    pub monin_obukhov_length: f64,
    /// [-]
    pub richardson_number: f64,
    /// [-]
    pub stability_correction_for_momentum: f64,
    /// [-]
    pub stability_correction_for_heat: f64,
}

impl CanopyStateVariables {
    /// Computes the timestep-constant canopy variables and bootstraps available energy and net
    /// radiation from the absorbed shortwave and the canopy-top longwave radiation
    pub fn new(inputs: &Inputs, params: &Params, constants: &Constants) -> Self {
        let sim = &params.simulation;
        let air_temperature =
            weather::convert_celsius_to_kelvin(inputs.air_temperature, constants.absolute_zero);
        let wind_speed = inputs.wind_speed.max(MINIMUM_INPUT_WIND_SPEED);
        let canopy_height = inputs.canopy_height.max(canopy::MINIMUM_CANOPY_HEIGHT);
        let leaf_area_index = inputs.leaf_area_index();
        let psychrometric_constant = match inputs.atmospheric_pressure {
            Some(pressure) => weather::calc_psychrometric_constant(
                pressure,
                constants.air_specific_heat_capacity,
                constants.latent_heat_for_vaporization,
                constants.vapor_to_dry_air_molecular_weight,
            ),
            None => constants.psychrometric_constant,
        };
        let vapor_pressure_slope = weather::calc_vapor_pressure_slope(inputs.air_temperature);
        let atmospheric_emissivity = sim
            .atmospheric_emissivity_model
            .calc_atmospheric_emissivity(inputs.vapor_pressure, air_temperature);
        let net_longwave_radiation = canopy::calc_net_longwave_radiation(
            air_temperature,
            atmospheric_emissivity,
            constants.stefan_boltzmann,
        );
        let aerodynamic_resistance = canopy::calc_neutral_aerodynamic_resistance(
            wind_speed,
            canopy_height,
            inputs.measurement_height,
            constants.von_karman,
        );
        let absorbed_shortwave: f64 = inputs
            .absorbed_irradiance
            .values()
            .map(|absorbed| {
                weather::convert_photosynthetically_active_radiation_into_global_radiation(
                    absorbed.total(),
                )
            })
            .sum();
        let bootstrap_energy = absorbed_shortwave + net_longwave_radiation;

        Self {
            air_temperature,
            source_temperature: air_temperature,
            wind_speed,
            measurement_height: inputs.measurement_height,
            canopy_height,
            leaf_area_index,
            zero_displacement_height: canopy::calc_zero_displacement_height(canopy_height),
            roughness_length_for_momentum: canopy::calc_roughness_length_for_momentum(
                canopy_height,
            ),
            roughness_length_for_heat_transfer: canopy::calc_roughness_length_for_heat_transfer(
                canopy_height,
            ),
            wind_speed_at_canopy_height: canopy::calc_wind_speed_at_canopy_height(
                wind_speed,
                canopy_height,
                inputs.measurement_height,
            ),
            vapor_pressure_deficit: inputs.vapor_pressure_deficit,
            vapor_pressure_slope,
            psychrometric_constant,
            atmospheric_emissivity,
            optics: CanopyOptics::new(sim, inputs.solar_inclination, leaf_area_index),
            aerodynamic_resistance,
            lumped_aerodynamic_resistance: canopy::calc_lumped_aerodynamic_resistance(
                aerodynamic_resistance,
                vapor_pressure_slope,
                psychrometric_constant,
            ),
            net_longwave_radiation,
            available_energy: bootstrap_energy,
            net_radiation: bootstrap_energy,
            ..Default::default()
        }
    }

    pub fn update_sum_composed_conductances(&mut self, components: &[Component]) {
        self.sum_composed_conductances = components
            .iter()
            .map(|c| 1.0 / c.state().composed_resistance)
            .sum();
    }

    pub fn update_evaporative_energy(&mut self, components: &[Component], constants: &Constants) {
        self.penman_evaporative_energy = canopy::calc_penman_evaporative_energy(
            self.aerodynamic_resistance,
            self.available_energy,
            self.vapor_pressure_slope,
            self.vapor_pressure_deficit,
            self.psychrometric_constant,
            constants.air_volumetric_heat_capacity(),
        );
        let composed_conductances: Vec<f64> = components
            .iter()
            .map(|c| c.state().composed_conductance)
            .collect();
        let available_energies: Vec<f64> = components
            .iter()
            .map(|c| c.state().available_energy)
            .collect();
        let boundary_resistances: Vec<f64> = components
            .iter()
            .map(|c| c.state().boundary_resistance)
            .collect();
        self.penman_monteith_evaporative_energy = canopy::calc_penman_monteith_evaporative_energy(
            self.lumped_aerodynamic_resistance,
            self.penman_evaporative_energy,
            &composed_conductances,
            &available_energies,
            &boundary_resistances,
            self.vapor_pressure_slope,
            self.psychrometric_constant,
        );
    }

    /// Updates source temperature, floored at absolute zero
    pub fn update_source_temperature(&mut self, constants: &Constants) {
        self.source_temperature = canopy::calc_temperature(
            self.air_temperature,
            self.aerodynamic_resistance,
            self.available_energy,
            self.penman_monteith_evaporative_energy,
            constants.air_volumetric_heat_capacity(),
        )
        .max(0.0);
    }

    pub fn update_available_energy(&mut self, components: &[Component]) {
        self.available_energy = components.iter().map(|c| c.state().available_energy).sum();
    }

    pub fn update_net_radiation(&mut self, soil_heat_flux: f64) {
        self.net_radiation = self.available_energy + soil_heat_flux;
    }

    pub fn update_sensible_heat_flux(&mut self, constants: &Constants) {
        self.sensible_heat_flux = canopy::calc_sensible_heat_flux(
            self.source_temperature,
            self.air_temperature,
            self.aerodynamic_resistance,
            constants.air_volumetric_heat_capacity(),
        );
    }

    fn update_lumped_aerodynamic_resistance(&mut self) {
        self.lumped_aerodynamic_resistance = canopy::calc_lumped_aerodynamic_resistance(
            self.aerodynamic_resistance,
            self.vapor_pressure_slope,
            self.psychrometric_constant,
        );
    }

    /// Corrects aerodynamic resistance for atmospheric stability using the current sensible
    /// heat flux and the stability correction of the previous call
    pub fn update_aerodynamic_resistance_with_stability(
        &mut self,
        params: &Params,
        constants: &Constants,
    ) {
        let sim = &params.simulation;
        let wind_speed = self.wind_speed.max(canopy::MINIMUM_WIND_SPEED);
        self.friction_velocity = canopy::calc_friction_velocity(
            wind_speed,
            self.measurement_height,
            self.zero_displacement_height,
            self.roughness_length_for_momentum,
            self.stability_correction_for_momentum,
            constants.von_karman,
        );
        self.monin_obukhov_length = canopy::calc_monin_obukhov_length(
            self.source_temperature,
            self.sensible_heat_flux,
            self.friction_velocity,
            constants.air_volumetric_heat_capacity(),
            constants.gravitational_acceleration,
            constants.von_karman,
        );
        self.richardson_number = canopy::calc_richardson_number(
            self.sensible_heat_flux < 0.0,
            self.measurement_height,
            self.zero_displacement_height,
            self.monin_obukhov_length,
        );
        let (phi_m, phi_h) = canopy::calc_stability_correction_functions(
            self.monin_obukhov_length,
            self.richardson_number,
            self.measurement_height,
            self.zero_displacement_height,
            sim.richardson_threshold_free_convection,
        );
        self.stability_correction_for_momentum = phi_m;
        self.stability_correction_for_heat = phi_h;
        self.aerodynamic_resistance = canopy::calc_aerodynamic_resistance(
            self.richardson_number,
            self.friction_velocity,
            self.measurement_height,
            self.zero_displacement_height,
            self.roughness_length_for_heat_transfer,
            self.stability_correction_for_heat,
            self.source_temperature,
            self.air_temperature,
            sim.richardson_threshold_free_convection,
            constants.von_karman,
            constants.air_volumetric_heat_capacity(),
            sim.free_convection_shape_parameter,
        );
        self.update_lumped_aerodynamic_resistance();
    }

    /// Replaces aerodynamic resistance by its neutral value scaled up (upward sensible heat) or
    /// down (downward sensible heat)
    pub fn force_aerodynamic_resistance(&mut self, constants: &Constants) {
        self.stability_correction_for_momentum = 0.0;
        self.stability_correction_for_heat = 0.0;
        self.richardson_number = 0.0;
        let neutral = canopy::calc_neutral_aerodynamic_resistance(
            self.wind_speed,
            self.canopy_height,
            self.measurement_height,
            constants.von_karman,
        );
        let scaling_factor = if self.sensible_heat_flux > 0.0 { 1.2 } else { 0.8 };
        self.aerodynamic_resistance = neutral * scaling_factor;
        self.update_lumped_aerodynamic_resistance();
    }
}

/// Crop canopy made of leaf layers and the soil.
///
/// Components are stored in construction order: leaf layers from the top (highest index) to the
/// bottom of the canopy, sunlit before shaded leaves when split, and the soil last.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Crop {
    pub inputs: Inputs,
    pub params: Params,
    pub constants: Constants,
    pub state_variables: CanopyStateVariables,
    components: Vec<Component>,
    /// positions in `components` of each layer index
    layers: BTreeMap<i32, Vec<usize>>,
}

impl Crop {
    /// Builds components top-down and initializes their state variables
    pub fn new(inputs: Inputs, params: Params, constants: Constants) -> anyhow::Result<Self> {
        inputs.check_leaf_layers()?;
        inputs.check_absorbed_irradiance(params.simulation.leaves_category)?;

        let state_variables = CanopyStateVariables::new(&inputs, &params, &constants);
        let mut crop = Self {
            inputs,
            params,
            constants,
            state_variables,
            components: Vec::new(),
            layers: BTreeMap::new(),
        };
        crop.set_components();
        crop.init_components_state_variables()?;
        Ok(crop)
    }

    /// Restores the state of construction: neutral aerodynamic resistance, bootstrapped canopy
    /// energy and component temperatures at air temperature
    pub fn reset_state_variables(&mut self) -> anyhow::Result<()> {
        self.state_variables = CanopyStateVariables::new(&self.inputs, &self.params, &self.constants);
        self.init_components_state_variables()
    }

    fn push(&mut self, component: Component) {
        let index = component.state().index;
        self.layers
            .entry(index)
            .or_default()
            .push(self.components.len());
        self.components.push(component);
    }

    fn set_components(&mut self) {
        let leaves_category = self.params.simulation.leaves_category;
        let kb = self.state_variables.optics.direct_black_extinction_coefficient;
        let mut upper_cumulative_leaf_area_index = 0.0;
        for index in self.inputs.leaf_layer_indices_top_down() {
            let thickness = self.inputs.leaf_layers[&index];
            match leaves_category {
                LeavesCategory::Lumped => self.push(Component::LumpedLeaf(LumpedLeaf::new(
                    index,
                    upper_cumulative_leaf_area_index,
                    thickness,
                ))),
                LeavesCategory::SunlitShaded => {
                    for exposure in leaf_exposures(leaves_category) {
                        self.push(
                            SunlitShadedLeaf::new(
                                *exposure,
                                index,
                                upper_cumulative_leaf_area_index,
                                thickness,
                                kb,
                            )
                            .into(),
                        );
                    }
                }
            }
            upper_cumulative_leaf_area_index += thickness;
        }
        self.push(Component::Soil(Soil::new(upper_cumulative_leaf_area_index)));
    }

    fn init_components_state_variables(&mut self) -> anyhow::Result<()> {
        let Self {
            inputs,
            params,
            constants,
            state_variables,
            components,
            ..
        } = self;
        for component in components.iter_mut() {
            component
                .init_state_variables(inputs, params, constants, state_variables)
                .with_context(|| format!("component {:?}", component.kind()))?;
        }
        Ok(())
    }

    /// Every component in construction order (top leaf layer first, soil last). The order is
    /// stable across calls.
    pub fn extract_all_components(&self) -> &[Component] {
        &self.components
    }

    /// Components of the layer `index` (`-1` for the soil)
    pub fn get(&self, index: i32) -> Vec<&Component> {
        self.layers
            .get(&index)
            .map(|positions| positions.iter().map(|p| &self.components[*p]).collect())
            .unwrap_or_default()
    }

    pub fn soil(&self) -> Option<&Component> {
        self.get(SOIL_INDEX).into_iter().next()
    }

    /// [W m-2ground] heat flux into the soil
    pub fn soil_heat_flux(&self) -> f64 {
        self.soil().and_then(Component::heat_flux).unwrap_or_default()
    }

    /// Updates the sum of composed conductances, then the composed conductance of each
    /// component
    pub fn update_conductances(&mut self) {
        self.state_variables
            .update_sum_composed_conductances(&self.components);
        for component in self.components.iter_mut() {
            component.calc_composed_conductance(&self.state_variables);
        }
    }

    /// Updates canopy evaporative energies, then the evaporative energy of each component
    pub fn update_evaporative_energy(&mut self) {
        self.state_variables
            .update_evaporative_energy(&self.components, &self.constants);
        for component in self.components.iter_mut() {
            component.calc_evaporative_energy(&self.state_variables);
        }
    }

    /// Updates, in order, source temperature, available energy, net radiation and sensible heat
    /// flux of the canopy
    pub fn update_canopy_energy(&mut self) {
        let soil_heat_flux = self.soil_heat_flux();
        let sv = &mut self.state_variables;
        sv.update_source_temperature(&self.constants);
        sv.update_available_energy(&self.components);
        sv.update_net_radiation(soil_heat_flux);
        sv.update_sensible_heat_flux(&self.constants);
    }

    pub fn update_components_temperature(&mut self) {
        for component in self.components.iter_mut() {
            component.calc_temperature(&self.state_variables, &self.constants);
        }
    }

    /// [K] sum of the absolute temperature changes since the last damped update
    pub fn calc_temperature_error(&self) -> f64 {
        self.components
            .iter()
            .map(|c| (c.state().temperature - c.state().previous_temperature).abs())
            .sum()
    }

    pub fn update_components_previous_temperature(&mut self, step_fraction: f64) {
        for component in self.components.iter_mut() {
            component.update_temperature(step_fraction);
        }
    }

    pub fn update_aerodynamic_resistance_with_stability(&mut self) {
        self.state_variables
            .update_aerodynamic_resistance_with_stability(&self.params, &self.constants);
    }

    pub fn force_aerodynamic_resistance(&mut self) {
        self.state_variables
            .force_aerodynamic_resistance(&self.constants);
    }
}
