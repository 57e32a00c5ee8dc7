//! Module containing soil surface formulas.

use crate::formalisms::canopy::{
    calc_roughness_length_for_momentum, calc_turbulent_diffusivity, calc_zero_displacement_height,
    MINIMUM_CANOPY_HEIGHT, MINIMUM_WIND_SPEED,
};

/// Returns the bulk boundary layer resistance [h m-1] of the soil surface
/// Arguments:
/// ----------
/// canopy_height: f64
///     [m]
/// wind_speed: f64
///     wind speed at measurement height [m h-1]
/// measurement_height: f64
///     [m]
/// soil_roughness_length_for_momentum: f64
///     [m]
/// shape_parameter: f64
///     extinction coefficient of eddy diffusivity inside the canopy [-]
/// von_karman_constant: f64
///     [-]
///
/// Choudhury and Monteith, 1988. Quarterly Journal of the Royal Meteorological Society 114,
/// 373 - 398
pub fn calc_boundary_resistance(
    canopy_height: f64,
    wind_speed: f64,
    measurement_height: f64,
    soil_roughness_length_for_momentum: f64,
    shape_parameter: f64,
    von_karman_constant: f64,
) -> f64 {
    let wind_speed = wind_speed.max(MINIMUM_WIND_SPEED);
    let canopy_height = canopy_height.max(MINIMUM_CANOPY_HEIGHT);
    let d = calc_zero_displacement_height(canopy_height);
    let z0m = calc_roughness_length_for_momentum(canopy_height);
    let eddy_diffusivity = calc_turbulent_diffusivity(
        von_karman_constant,
        wind_speed,
        canopy_height,
        d,
        z0m,
        measurement_height,
    );
    let scaling_factor = (-shape_parameter * soil_roughness_length_for_momentum / canopy_height)
        .exp()
        - (-shape_parameter * (d + z0m) / canopy_height).exp();
    canopy_height * shape_parameter.exp() / (shape_parameter * eddy_diffusivity) * scaling_factor
}

/// Returns the surface resistance [h m-1] of the soil to vapor transfer
///
/// van de Griend and Owe, 1994. Water Resources Research 30, 181 - 188
pub fn calc_surface_resistance(
    soil_saturation_ratio: f64,
    shape_parameter_1: f64,
    shape_parameter_2: f64,
) -> f64 {
    (shape_parameter_1 - shape_parameter_2 * soil_saturation_ratio).exp() / 3600.0
}

/// Returns the heat flux [W m-2ground] into the soil as a fraction of the above-ground net
/// radiation
pub fn calc_heat_flux(net_above_ground_radiation: f64, is_diurnal: bool) -> f64 {
    if is_diurnal {
        0.1 * net_above_ground_radiation
    } else {
        0.5 * net_above_ground_radiation
    }
}

/// Returns the net longwave radiation [W m-2ground] at the soil surface
pub fn calc_net_longwave_radiation(
    canopy_top_net_longwave_radiation: f64,
    canopy_leaf_area_index: f64,
    diffuse_black_extinction_coefficient: f64,
    soil_emissivity: f64,
) -> f64 {
    canopy_top_net_longwave_radiation
        * (-diffuse_black_extinction_coefficient * canopy_leaf_area_index).exp()
        * soil_emissivity
}
