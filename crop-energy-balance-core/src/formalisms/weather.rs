//! Module containing formulas for meteorological variables.

use crate::imports::*;
use std::str::FromStr;

/// Fraction of global radiation carried by photosynthetically active radiation
pub const PAR_TO_GLOBAL_RATIO: f64 = 0.48;

/// Model used to estimate the emissivity of a clear sky
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtmosphericEmissivityModel {
    /// Brutsaert, 1975. On a derivable formula for long-wave radiation from clear skies.
    /// Water Resources Research 11, 742 - 744
    #[default]
    #[serde(rename = "brutsaert_1975")]
    Brutsaert1975,
    /// Prata, 1996. A new long-wave formula for estimating downward clear-sky radiation at
    /// the surface. Quarterly Journal of the Royal Meteorological Society 122, 1127 - 1151
    #[serde(rename = "prata_1996")]
    Prata1996,
}

impl FromStr for AtmosphericEmissivityModel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brutsaert_1975" => Ok(Self::Brutsaert1975),
            "prata_1996" => Ok(Self::Prata1996),
            _ => bail!(
                "Unknown model name {:?}, must be one of [\"brutsaert_1975\", \"prata_1996\"]",
                s
            ),
        }
    }
}

impl AtmosphericEmissivityModel {
    /// Returns the emissivity [-] of the atmosphere
    /// Arguments:
    /// ----------
    /// air_vapor_pressure: f64
    ///     vapor pressure of the air [kPa]
    /// air_temperature: f64
    ///     temperature of the air [K]
    pub fn calc_atmospheric_emissivity(&self, air_vapor_pressure: f64, air_temperature: f64) -> f64 {
        // both formulas use hPa
        let air_vapor_pressure = 10.0 * air_vapor_pressure;
        match self {
            Self::Brutsaert1975 => 1.24 * (air_vapor_pressure / air_temperature).powf(1.0 / 7.0),
            Self::Prata1996 => {
                let precipitable_water = 46.5 * air_vapor_pressure / air_temperature;
                1.0 - (1.0 + precipitable_water) * (-(1.2 + 3.0 * precipitable_water).sqrt()).exp()
            }
        }
    }
}

/// Returns the psychrometric constant [kPa K-1]
/// Arguments:
/// ----------
/// atmospheric_pressure: f64
///     atmospheric pressure [kPa]
/// air_specific_heat_capacity: f64
///     specific heat capacity of the air under a constant pressure [W h g-1 K-1]
/// latent_heat_for_vaporization: f64
///     latent heat for vaporization [W h g-1]
/// vapor_to_dry_air_molecular_weight: f64
///     ratio of the molecular weights of water vapor to dry air [-]
///
/// Allen et al. 1998, FAO Irrigation and Drainage Paper No. 56, Eq. 8
pub fn calc_psychrometric_constant(
    atmospheric_pressure: f64,
    air_specific_heat_capacity: f64,
    latent_heat_for_vaporization: f64,
    vapor_to_dry_air_molecular_weight: f64,
) -> f64 {
    air_specific_heat_capacity * atmospheric_pressure
        / (vapor_to_dry_air_molecular_weight * latent_heat_for_vaporization)
}

/// Returns the slope [kPa K-1] of the saturated vapor pressure curve at `temperature` [°C]
///
/// Allen et al. 1998, FAO Irrigation and Drainage Paper No. 56, Eq. 13
pub fn calc_vapor_pressure_slope(temperature: f64) -> f64 {
    4098.0 * calc_saturated_air_vapor_pressure(temperature) / (temperature + 237.3).powi(2)
}

/// Returns the saturated vapor pressure [kPa] at `temperature` [°C]
pub fn calc_saturated_air_vapor_pressure(temperature: f64) -> f64 {
    0.6108 * ((17.27 * temperature) / (temperature + 237.3)).exp()
}

/// Returns the vapor pressure deficit [kPa] between a leaf and the surrounding air
/// Arguments:
/// ----------
/// temperature_air: f64
///     air temperature [°C]
/// temperature_leaf: f64
///     leaf temperature [°C]
/// relative_humidity: f64
///     relative humidity of the air [%]
pub fn calc_vapor_pressure_deficit(
    temperature_air: f64,
    temperature_leaf: f64,
    relative_humidity: f64,
) -> f64 {
    (calc_saturated_air_vapor_pressure(temperature_leaf)
        - calc_saturated_air_vapor_pressure(temperature_air) * relative_humidity / 100.0)
        .max(0.0)
}

pub fn convert_kelvin_to_celsius(temperature: f64, absolute_zero: f64) -> f64 {
    temperature + absolute_zero
}

pub fn convert_celsius_to_kelvin(temperature: f64, absolute_zero: f64) -> f64 {
    temperature - absolute_zero
}

pub fn convert_photosynthetically_active_radiation_into_global_radiation(value: f64) -> f64 {
    value / PAR_TO_GLOBAL_RATIO
}

pub fn convert_global_irradiance_into_photosynthetically_active_radiation(value: f64) -> f64 {
    value * PAR_TO_GLOBAL_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Constants;
    use crate::utils::*;

    #[test]
    fn test_calc_psychrometric_constant() {
        let constants = Constants::default();
        let values: Vec<f64> = (90..102)
            .step_by(2)
            .map(|p| {
                calc_psychrometric_constant(
                    p as f64,
                    constants.air_specific_heat_capacity,
                    constants.latent_heat_for_vaporization,
                    constants.vapor_to_dry_air_molecular_weight,
                )
            })
            .collect();
        assert!(is_non_decreasing(&values));
        // close to the value used as default constant at sea level
        assert!(almost_eq_decimal(values.last().copied().unwrap(), 0.067, 2));
    }

    #[test]
    fn test_calc_atmospheric_emissivity() {
        let err = "some unknown model"
            .parse::<AtmosphericEmissivityModel>()
            .unwrap_err();
        assert!(err.to_string().starts_with("Unknown model name"));

        for model in [
            AtmosphericEmissivityModel::Brutsaert1975,
            AtmosphericEmissivityModel::Prata1996,
        ] {
            let by_vapor_pressure: Vec<f64> = (0..7)
                .map(|p| model.calc_atmospheric_emissivity(p as f64, 298.0))
                .collect();
            assert!(is_non_decreasing(&by_vapor_pressure));
            let by_temperature: Vec<f64> = (248..298)
                .step_by(10)
                .map(|t| model.calc_atmospheric_emissivity(3.0, t as f64))
                .collect();
            assert!(is_non_increasing(&by_temperature));
            let emissivity = model.calc_atmospheric_emissivity(1.5, 293.15);
            assert!(emissivity > 0.6 && emissivity < 1.0, "{emissivity}");
        }
    }

    #[test]
    fn test_emissivity_model_names_round_trip() {
        let model: AtmosphericEmissivityModel = serde_json::from_str("\"prata_1996\"").unwrap();
        assert_eq!(model, AtmosphericEmissivityModel::Prata1996);
        assert!(serde_json::from_str::<AtmosphericEmissivityModel>("\"swinbank\"").is_err());
    }

    #[test]
    fn test_calc_vapor_pressure_slope() {
        let slopes: Vec<f64> = (-25..25).map(|t| calc_vapor_pressure_slope(t as f64)).collect();
        assert!(is_non_decreasing(&slopes));
        // Allen et al., 1998, Annex 2, table 2.4
        let air_temperature = [1., 5., 10., 15., 20., 25., 30., 35., 40., 45.];
        let slope = [
            0.047, 0.061, 0.082, 0.11, 0.145, 0.189, 0.243, 0.311, 0.393, 0.493,
        ];
        for (t, s) in air_temperature.iter().zip(slope) {
            assert!(almost_eq_decimal(calc_vapor_pressure_slope(*t), s, 3));
        }
    }

    #[test]
    fn test_temperature_conversions() {
        let absolute_zero = Constants::default().absolute_zero;
        assert_eq!(convert_kelvin_to_celsius(0.0, absolute_zero), absolute_zero);
        assert_eq!(convert_celsius_to_kelvin(0.0, absolute_zero), -absolute_zero);
    }

    #[test]
    fn test_radiation_conversions() {
        assert_eq!(
            convert_photosynthetically_active_radiation_into_global_radiation(1.0),
            1.0 / 0.48
        );
        assert_eq!(
            convert_global_irradiance_into_photosynthetically_active_radiation(1.0),
            0.48
        );
    }

    #[test]
    fn test_calc_saturated_air_vapor_pressure() {
        let values: Vec<f64> = (-25..25)
            .map(|t| calc_saturated_air_vapor_pressure(t as f64))
            .collect();
        assert!(is_non_decreasing(&values));
        // Allen et al., 1998, Annex 2, table 2.3
        assert!(almost_eq_decimal(calc_saturated_air_vapor_pressure(20.0), 2.338, 3));
    }

    #[test]
    fn test_calc_vapor_pressure_deficit() {
        assert_eq!(calc_vapor_pressure_deficit(25.0, 25.0, 100.0), 0.0);
        let by_air: Vec<f64> = (25..50)
            .map(|t| calc_vapor_pressure_deficit(t as f64, 25.0, 50.0))
            .collect();
        assert!(is_non_increasing(&by_air));
        let by_leaf: Vec<f64> = (25..50)
            .map(|t| calc_vapor_pressure_deficit(25.0, t as f64, 100.0))
            .collect();
        assert!(is_non_decreasing(&by_leaf));
        let by_humidity: Vec<f64> = (0..=100)
            .step_by(10)
            .map(|rh| calc_vapor_pressure_deficit(25.0, 25.0, rh as f64))
            .collect();
        assert!(is_non_increasing(&by_humidity));
    }
}
