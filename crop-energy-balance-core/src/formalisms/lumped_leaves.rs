//! Module containing layer-scale formulas for lumped leaves.

use crate::formalisms::leaf::calc_leaf_boundary_conductance;
use crate::imports::*;

/// Returns the bulk boundary layer conductance [m h-1] (for both sides of leaves) of a leaf layer
/// Arguments:
/// ----------
/// wind_speed_at_canopy_height: f64
///     [m h-1]
/// upper_cumulative_leaf_area_index: f64
///     cumulative leaf area index at the top of the layer [m2leaf m-2ground]
/// lower_cumulative_leaf_area_index: f64
///     cumulative leaf area index at the bottom of the layer [m2leaf m-2ground]
/// wind_speed_extinction_coefficient: f64
///     extinction coefficient of wind speed inside the canopy [m2ground m-2leaf]
/// characteristic_length: f64
///     characteristic leaf length in the direction of the wind [m]
/// shape_parameter: f64
///     [m s-0.5]
pub fn calc_leaf_layer_boundary_conductance(
    wind_speed_at_canopy_height: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    wind_speed_extinction_coefficient: f64,
    characteristic_length: f64,
    shape_parameter: f64,
) -> f64 {
    let leaf_boundary_conductance = calc_leaf_boundary_conductance(
        wind_speed_at_canopy_height,
        characteristic_length,
        shape_parameter,
    );
    let scaling_factor = 2.0 / wind_speed_extinction_coefficient
        * ((-0.5 * wind_speed_extinction_coefficient * upper_cumulative_leaf_area_index).exp()
            - (-0.5 * wind_speed_extinction_coefficient * lower_cumulative_leaf_area_index).exp());
    leaf_boundary_conductance * scaling_factor
}

/// Returns the resistance [h m-1] matching a layer conductance [m h-1]
pub fn calc_leaf_layer_resistance(leaf_layer_conductance: f64) -> f64 {
    1.0 / leaf_layer_conductance.max(PRECISION)
}

/// Returns the bulk surface conductance [m h-1] of a leaf layer.
///
/// Stomatal conductance is integrated analytically over the layer assuming PAR is extinguished
/// following Beer's law with `global_extinction_coefficient`.
/// Arguments:
/// ----------
/// incident_irradiance: f64
///     PAR incident at the top of the canopy [W m-2ground]
/// stomatal_sensibility: f64
///     stomatal closure fraction due to water stress [-]
/// absorbed_par_50: f64
///     absorbed PAR at which stomatal conductance is half its maximum [W m-2leaf]
pub fn calc_leaf_layer_surface_conductance(
    incident_irradiance: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    stomatal_sensibility: f64,
    global_extinction_coefficient: f64,
    maximum_stomatal_conductance: f64,
    residual_stomatal_conductance: f64,
    absorbed_par_50: f64,
) -> f64 {
    let k = global_extinction_coefficient;
    let incident_irradiance = incident_irradiance.max(0.0);
    let thickness = lower_cumulative_leaf_area_index - upper_cumulative_leaf_area_index;
    let absorbed_at = |depth: f64| k * incident_irradiance * (-k * depth).exp();
    let irradiance_factor = 1.0 / k
        * ((absorbed_at(upper_cumulative_leaf_area_index) + absorbed_par_50)
            / (absorbed_at(lower_cumulative_leaf_area_index) + absorbed_par_50))
            .ln();
    residual_stomatal_conductance * thickness
        + maximum_stomatal_conductance * stomatal_sensibility * irradiance_factor
}

/// Returns the net longwave radiation [W m-2ground] of a leaf layer
///
/// Leuning et al. 1995. Plant, Cell and Environment 18, 1183 - 1200
pub fn calc_leaf_layer_net_longwave_radiation(
    canopy_top_net_longwave_radiation: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    diffuse_black_extinction_coefficient: f64,
    leaf_emissivity: f64,
) -> f64 {
    let kd = diffuse_black_extinction_coefficient;
    canopy_top_net_longwave_radiation
        * ((-kd * upper_cumulative_leaf_area_index).exp()
            - (-kd * lower_cumulative_leaf_area_index).exp())
        * leaf_emissivity
}
