//! Module containing physical constants and simulation parameters.

use crate::formalisms::leaf::StomatalSensibility;
use crate::formalisms::weather::AtmosphericEmissivityModel;
use crate::imports::*;

/// Physical constants shared by every formula of the energy balance.
///
/// A single value is built once and handed to [Crop](crate::crop::Crop) and
/// [Solver](crate::solver::Solver), there is no global instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Constants {
    /// [m h-2] gravitational acceleration
    pub gravitational_acceleration: f64,
    /// [-] von Kármán constant
    pub von_karman: f64,
    /// [W m-2 K-4] Stefan-Boltzmann constant
    pub stefan_boltzmann: f64,
    /// [°C] absolute zero
    pub absolute_zero: f64,
    /// [W h g-1] latent heat for vaporization
    pub latent_heat_for_vaporization: f64,
    /// [kPa K-1] psychrometric constant
    pub psychrometric_constant: f64,
    /// [W h g-1 K-1] specific heat capacity of the air under a constant pressure
    pub air_specific_heat_capacity: f64,
    /// [-] ratio of the molecular weight of water vapor to dry air
    pub vapor_to_dry_air_molecular_weight: f64,
    /// [g m-3] density of dry air
    pub air_density: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            gravitational_acceleration: 9.81 * 3600.0_f64.powi(2),
            von_karman: 0.41,
            stefan_boltzmann: 5.67e-8,
            absolute_zero: -273.15,
            latent_heat_for_vaporization: 0.678,
            psychrometric_constant: 0.066,
            air_specific_heat_capacity: 2.8e-4,
            vapor_to_dry_air_molecular_weight: 0.622,
            air_density: 1185.0,
        }
    }
}

impl SerdeAPI for Constants {}

impl Constants {
    /// Returns the volumetric heat capacity of the air [W h m-3 K-1]
    pub fn air_volumetric_heat_capacity(&self) -> f64 {
        self.air_density * self.air_specific_heat_capacity
    }
}

/// How leaves of each layer are represented
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeavesCategory {
    /// one pseudo-leaf per layer
    #[default]
    Lumped,
    /// each layer is split into sunlit and shaded leaves
    SunlitShaded,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
#[serde(default)]
pub struct Simulation {
    pub leaves_category: LeavesCategory,
    pub stomatal_sensibility: StomatalSensibility,
    pub atmospheric_emissivity_model: AtmosphericEmissivityModel,
    /// [-] shape parameter of the Choudhury and Monteith (1988) soil aerodynamic resistance
    #[validate(range(min = 0))]
    pub soil_aerodynamic_resistance_shape_parameter: f64,
    /// [m] roughness length of the soil surface
    #[validate(range(min = 0))]
    pub soil_roughness_length_for_momentum: f64,
    /// [m] characteristic leaf length in the direction of the wind
    #[validate(range(min = 0))]
    pub leaf_characteristic_length: f64,
    /// [m s-0.5] empirical shape parameter of leaf boundary conductance
    #[validate(range(min = 0))]
    pub leaf_boundary_layer_shape_parameter: f64,
    /// [m2ground m-2leaf] extinction coefficient of wind speed inside the canopy
    #[validate(range(min = 0))]
    pub wind_speed_extinction_coef: f64,
    /// [m h-1]
    #[validate(range(min = 0))]
    pub maximum_stomatal_conductance: f64,
    /// [m h-1]
    #[validate(range(min = 0))]
    pub residual_stomatal_conductance: f64,
    #[validate(range(min = 0, max = 1))]
    pub leaf_emissivity: f64,
    #[validate(range(min = 0, max = 1))]
    pub soil_emissivity: f64,
    /// [W m-2leaf] absorbed PAR at which stomatal conductance is half its maximum
    #[validate(range(min = 0))]
    pub absorbed_par_50: f64,
    /// [-] first shape parameter of soil surface resistance
    pub soil_resistance_to_vapor_shape_parameter_1: f64,
    /// [-] second shape parameter of soil surface resistance
    pub soil_resistance_to_vapor_shape_parameter_2: f64,
    /// [-] 1 for amphistomatal leaves (stomata on both sides of the blade), otherwise 2
    #[validate(range(min = 1, max = 2))]
    pub stomatal_density_factor: f64,
    #[validate(range(min = 0, max = 1))]
    pub leaf_scattering_coefficient: f64,
    /// [m2ground m-2leaf] extinction coefficient of PAR used by lumped leaves
    #[validate(range(min = 0))]
    pub global_extinction_coefficient: f64,
    #[validate(range(min = 0, max = 1))]
    pub canopy_reflectance_to_diffuse_irradiance: f64,
    /// [-] average projection of leaves in the direction of the sun
    #[validate(range(min = 0, max = 1))]
    pub leaves_to_sun_average_projection: f64,
    /// number of sublayers used to integrate surface conductance of sunlit and shaded leaves
    #[validate(range(min = 2))]
    pub sublayers_number: usize,
    /// [-] Richardson number below which free convection prevails
    #[validate(range(max = 0))]
    pub richardson_threshold_free_convection: f64,
    /// [W m-2 K-4/3] heat transfer coefficient shape parameter under free convection
    #[validate(range(min = 0))]
    pub free_convection_shape_parameter: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            leaves_category: LeavesCategory::default(),
            stomatal_sensibility: StomatalSensibility::default(),
            atmospheric_emissivity_model: AtmosphericEmissivityModel::default(),
            soil_aerodynamic_resistance_shape_parameter: 2.5,
            soil_roughness_length_for_momentum: 0.01,
            leaf_characteristic_length: 0.01,
            leaf_boundary_layer_shape_parameter: 0.01,
            wind_speed_extinction_coef: 0.5,
            maximum_stomatal_conductance: 39.6,
            residual_stomatal_conductance: 3.0,
            leaf_emissivity: 0.98,
            soil_emissivity: 0.95,
            absorbed_par_50: 105.0,
            soil_resistance_to_vapor_shape_parameter_1: 8.206,
            soil_resistance_to_vapor_shape_parameter_2: 4.255,
            stomatal_density_factor: 1.0,
            leaf_scattering_coefficient: 0.15,
            global_extinction_coefficient: 0.45,
            canopy_reflectance_to_diffuse_irradiance: 0.057,
            leaves_to_sun_average_projection: 0.5,
            sublayers_number: 100,
            richardson_threshold_free_convection: -0.8,
            free_convection_shape_parameter: 1.52,
        }
    }
}

/// Settings of the iterative energy balance resolution
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
#[serde(default)]
pub struct NumericalResolution {
    /// [-] fraction of the temperature step applied between two iterations
    #[validate(range(min = 0.01, max = 1))]
    pub step_fraction: f64,
    /// [K] summed absolute temperature change under which the energy balance is solved
    #[validate(range(min = 0))]
    pub acceptable_temperature_error: f64,
    /// maximum number of iterations of one energy balance resolution
    #[validate(range(min = 1))]
    pub maximum_iteration_number: usize,
}

impl Default for NumericalResolution {
    fn default() -> Self {
        Self {
            step_fraction: 0.5,
            acceptable_temperature_error: 0.02,
            maximum_iteration_number: 50,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, Validate)]
#[serde(default)]
pub struct Params {
    #[validate]
    pub simulation: Simulation,
    #[validate]
    pub numerical_resolution: NumericalResolution,
}

impl SerdeAPI for Params {
    fn init(&mut self) -> anyhow::Result<()> {
        match self.validate() {
            Ok(_) => Ok(()),
            Err(e) => bail!(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationErrors;

    #[test]
    fn test_default_params_are_valid() {
        let params = Params::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.simulation.leaves_category, LeavesCategory::Lumped);
    }

    #[test]
    fn test_constants() {
        let constants = Constants::default();
        assert!((constants.air_volumetric_heat_capacity() - 0.3318).abs() < 1e-9);
        let from_yaml = Constants::from_yaml("von_karman: 0.4").unwrap();
        assert_eq!(from_yaml.von_karman, 0.4);
        assert_eq!(from_yaml.stefan_boltzmann, constants.stefan_boltzmann);
    }

    #[test]
    fn test_partial_params_file_falls_back_to_defaults() {
        let params = Params::from_yaml(
            "simulation:\n  leaves_category: sunlit_shaded\n  stomatal_sensibility:\n    model: misson\n    psi_half_aperture: -1.0\n    steepness: 2.0\nnumerical_resolution:\n  step_fraction: 0.25\n",
        )
        .unwrap();
        assert_eq!(params.simulation.leaves_category, LeavesCategory::SunlitShaded);
        assert_eq!(
            params.simulation.stomatal_sensibility,
            StomatalSensibility::Misson {
                psi_half_aperture: -1.0,
                steepness: 2.0
            }
        );
        assert_eq!(params.numerical_resolution.step_fraction, 0.25);
        assert_eq!(
            params.numerical_resolution.maximum_iteration_number,
            NumericalResolution::default().maximum_iteration_number
        );
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let params_json = r#"{
            "simulation": {"leaf_emissivity": 1.5, "sublayers_number": 1},
            "numerical_resolution": {"maximum_iteration_number": 0}
        }"#;
        // downcast anyhow::error back into validator::ValidationErrors
        let validation_errs = Params::from_json(params_json)
            .unwrap_err()
            .downcast::<ValidationErrors>()
            .unwrap();
        let bad_structs = ["simulation", "numerical_resolution"];
        assert!(validation_errs
            .errors()
            .keys()
            .all(|key| bad_structs.contains(key)));
        assert_eq!(validation_errs.errors().len(), bad_structs.len());
    }

    #[test]
    fn test_unknown_model_names_are_rejected() {
        assert!(Params::from_yaml("simulation:\n  atmospheric_emissivity_model: swinbank_1963\n").is_err());
        assert!(Params::from_yaml("simulation:\n  stomatal_sensibility:\n    model: jarvis\n").is_err());
        assert!(Params::from_yaml("simulation:\n  leaves_category: lumpy\n").is_err());
    }
}
