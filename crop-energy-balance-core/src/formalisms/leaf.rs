//! Module containing leaf-scale formulas.

use crate::imports::*;

/// Model describing stomatal closure under water stress
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum StomatalSensibility {
    /// Leuning, 1995. Plant, Cell and Environment 18, 339 - 355
    Leuning {
        /// [kPa] empirical shape parameter
        d_0: f64,
    },
    /// Misson et al., 2004. Tree Physiology 24, 529 - 541
    Misson {
        /// [MPa] soil water potential at which stomatal aperture is halved
        psi_half_aperture: f64,
        /// [-]
        steepness: f64,
    },
    /// Tuzet et al., 2003. Plant, Cell and Environment 26, 1097 - 1116
    Tuzet {
        /// [MPa-1] sensitivity parameter
        sf: f64,
        /// [MPa] reference water potential
        psi_ref: f64,
    },
}

impl Default for StomatalSensibility {
    fn default() -> Self {
        Self::Leuning { d_0: 2.8 }
    }
}

impl StomatalSensibility {
    /// Returns the stomatal closure fraction [-] due to water stress
    /// Arguments:
    /// ----------
    /// vapor_pressure_deficit: f64
    ///     vapor pressure deficit of the air at canopy source height [kPa]
    /// soil_water_potential: Option<f64>
    ///     water potential of the soil [MPa], required by soil-driven models
    pub fn calc_stomatal_sensibility(
        &self,
        vapor_pressure_deficit: f64,
        soil_water_potential: Option<f64>,
    ) -> anyhow::Result<f64> {
        match *self {
            Self::Leuning { d_0 } => {
                ensure!(d_0 != 0.0, "The value of `d_0` must be different from zero.");
                Ok(1.0 / (1.0 + vapor_pressure_deficit / d_0))
            }
            Self::Misson {
                psi_half_aperture,
                steepness,
            } => {
                ensure!(
                    psi_half_aperture != 0.0,
                    "The value of `psi_half_aperture` must be different from zero."
                );
                let psi = soil_water_potential.with_context(|| {
                    format!("{} requires soil water potential", format_dbg!(self))
                })?;
                Ok(1.0 / (1.0 + (psi / psi_half_aperture).powf(steepness)))
            }
            Self::Tuzet { sf, psi_ref } => {
                let psi = soil_water_potential.with_context(|| {
                    format!("{} requires soil water potential", format_dbg!(self))
                })?;
                Ok((1.0 + (sf * psi_ref).exp()) / (1.0 + (sf * (psi_ref - psi)).exp()))
            }
        }
    }
}

/// Returns the bulk boundary layer conductance [m h-1] (for both sides of the blade) of an
/// individual leaf
/// Arguments:
/// ----------
/// wind_speed: f64
///     local wind speed in the vicinity of the leaf [m h-1]
/// characteristic_length: f64
///     characteristic leaf length in the direction of the wind [m]
/// shape_parameter: f64
///     empirical shape parameter [m s-0.5]
pub fn calc_leaf_boundary_conductance(
    wind_speed: f64,
    characteristic_length: f64,
    shape_parameter: f64,
) -> f64 {
    3600.0 * shape_parameter * (wind_speed / 3600.0 / characteristic_length).sqrt()
}

/// Returns the stomatal conductance [m h-1] to water vapor of a unit leaf surface area
pub fn calc_stomatal_conductance(
    residual_stomatal_conductance: f64,
    maximum_stomatal_conductance: f64,
    absorbed_irradiance: f64,
    absorbed_par_50: f64,
    stomatal_sensibility: f64,
) -> f64 {
    let absorbed_irradiance = absorbed_irradiance.max(0.0);
    let sensibility_to_irradiance = absorbed_irradiance / (absorbed_par_50 + absorbed_irradiance);
    residual_stomatal_conductance
        + maximum_stomatal_conductance * sensibility_to_irradiance * stomatal_sensibility
}
