//! Module containing formulas shared by every canopy component (leaves and soil).
//!
//! Lhomme et al. 2013. Evaporation from multi-component canopies: Generalized formulations.
//! Journal of Hydrology 486, 315 - 320.

use crate::imports::*;

/// Returns the boundary resistance [h m-1] under both forced and free convection
pub fn calc_boundary_layer_resistance(
    forced_convection_resistance: f64,
    free_convection_resistance: f64,
) -> f64 {
    1.0 / (1.0 / forced_convection_resistance.max(PRECISION)
        + 1.0 / free_convection_resistance.max(PRECISION))
}

/// Returns Lhomme's lumped boundary and surface resistance Ri [h m-1] (Eq. 8)
/// Arguments:
/// ----------
/// surface_resistance: f64
///     surface resistance to water vapor transfer [h m-1]
/// boundary_layer_resistance: f64
///     boundary layer resistance to heat transfer [h m-1]
/// vapor_pressure_slope: f64
///     [kPa K-1]
/// psychrometric_constant: f64
///     [kPa K-1]
/// stomatal_density_factor: f64
///     1 for amphistomatal leaves, otherwise 2 [-]
pub fn calc_composed_resistance(
    surface_resistance: f64,
    boundary_layer_resistance: f64,
    vapor_pressure_slope: f64,
    psychrometric_constant: f64,
    stomatal_density_factor: f64,
) -> f64 {
    surface_resistance
        + boundary_layer_resistance
            * (stomatal_density_factor + vapor_pressure_slope / psychrometric_constant)
}

/// Returns Lhomme's composed conductance Pi [m h-1] (Eq. 13)
pub fn calc_composed_conductance(
    composed_resistance: f64,
    sum_composed_conductances: f64,
    lumped_aerodynamic_resistance: f64,
) -> f64 {
    1.0 / (composed_resistance.max(PRECISION)
        * (1.0 + lumped_aerodynamic_resistance * sum_composed_conductances))
}

/// Returns the evaporative energy [W m-2ground] of one component (Eq. 11)
pub fn calc_evaporative_energy(
    available_energy: f64,
    boundary_layer_resistance: f64,
    composed_resistance: f64,
    lumped_aerodynamic_resistance: f64,
    penman_evaporative_energy: f64,
    penman_monteith_evaporative_energy: f64,
    vapor_pressure_slope: f64,
    psychrometric_constant: f64,
) -> f64 {
    let energy_driven = lumped_aerodynamic_resistance
        * (penman_evaporative_energy - penman_monteith_evaporative_energy);
    let radiation_driven =
        boundary_layer_resistance * available_energy * (vapor_pressure_slope / psychrometric_constant);
    (energy_driven + radiation_driven) / composed_resistance.max(PRECISION)
}

/// Returns the temperature [K] of one component
pub fn calc_temperature(
    source_temperature: f64,
    boundary_layer_resistance: f64,
    available_energy: f64,
    evaporative_energy: f64,
    air_volumetric_heat_capacity: f64,
) -> f64 {
    source_temperature
        + (boundary_layer_resistance / air_volumetric_heat_capacity)
            * (available_energy - evaporative_energy)
}

/// Returns the available energy [W m-2ground] of one component, `heat_flux` being the soil
/// heat flux sink (zero for leaves)
pub fn calc_available_energy(
    net_shortwave_radiation: f64,
    net_longwave_radiation: f64,
    heat_flux: f64,
) -> f64 {
    net_shortwave_radiation + net_longwave_radiation - heat_flux
}
