//! Module containing canopy-scale formulas: wind profile, aerodynamic resistance,
//! Penman-Monteith combination and Monin-Obukhov stability corrections.

use crate::imports::*;

/// [m h-1] wind speed below which the log-wind profile is not trusted
pub const MINIMUM_WIND_SPEED: f64 = 2400.0;
/// [m] canopy height below which roughness lengths degenerate
pub const MINIMUM_CANOPY_HEIGHT: f64 = 0.1;

/// Returns the zero displacement height [m]
///
/// Allen et al. 1998, FAO Irrigation and Drainage Paper No. 56, Box 4
pub fn calc_zero_displacement_height(canopy_height: f64) -> f64 {
    0.67 * canopy_height
}

/// Returns the roughness length [m] governing momentum transfer
pub fn calc_roughness_length_for_momentum(canopy_height: f64) -> f64 {
    0.123 * canopy_height
}

/// Returns the roughness length [m] governing heat and vapor transfer
pub fn calc_roughness_length_for_heat_transfer(canopy_height: f64) -> f64 {
    0.0123 * canopy_height
}

/// Returns the wind speed [m h-1] at canopy height using a logarithmic wind profile
/// Arguments:
/// ----------
/// wind_speed: f64
///     wind speed at measurement height [m h-1]
/// canopy_height: f64
///     canopy height [m]
/// measurement_height: f64
///     height at which meteorological variables are measured [m]
pub fn calc_wind_speed_at_canopy_height(
    wind_speed: f64,
    canopy_height: f64,
    measurement_height: f64,
) -> f64 {
    let wind_speed = wind_speed.max(MINIMUM_WIND_SPEED);
    let canopy_height = canopy_height.max(MINIMUM_CANOPY_HEIGHT);
    let d = calc_zero_displacement_height(canopy_height);
    let z0u = calc_roughness_length_for_momentum(canopy_height);
    (wind_speed * ((canopy_height - d) / z0u).ln() / ((measurement_height - d) / z0u).ln())
        .max(1.0e-9)
}

/// Returns the turbulent (eddy) diffusivity [m2 h-1] at canopy height
pub fn calc_turbulent_diffusivity(
    von_karman_constant: f64,
    wind_speed: f64,
    canopy_height: f64,
    zero_displacement_height: f64,
    roughness_length_for_momentum: f64,
    measurement_height: f64,
) -> f64 {
    let wind_speed = wind_speed.max(MINIMUM_WIND_SPEED);
    let canopy_height = canopy_height.max(MINIMUM_CANOPY_HEIGHT);
    (von_karman_constant.powi(2) * wind_speed * (canopy_height - zero_displacement_height))
        / ((measurement_height - zero_displacement_height) / roughness_length_for_momentum).ln()
}

/// Returns the net longwave radiation [W m-2ground] at the top of the canopy, negative when
/// the canopy loses energy to the sky
///
/// Leuning et al. 1995. Plant, Cell and Environment 18, 1183 - 1200
pub fn calc_net_longwave_radiation(
    air_temperature: f64,
    atmospheric_emissivity: f64,
    stefan_boltzmann_constant: f64,
) -> f64 {
    -(1.0 - atmospheric_emissivity) * stefan_boltzmann_constant * air_temperature.powi(4)
}

/// Returns the aerodynamic resistance [h m-1] between the source height and the reference
/// height under neutral conditions
///
/// Allen et al. 1998, FAO Irrigation and Drainage Paper No. 56, Eq. 4
pub fn calc_neutral_aerodynamic_resistance(
    wind_speed: f64,
    canopy_height: f64,
    reference_height: f64,
    von_karman_constant: f64,
) -> f64 {
    let wind_speed = wind_speed.max(MINIMUM_WIND_SPEED);
    let canopy_height = canopy_height.max(MINIMUM_CANOPY_HEIGHT);
    let d = calc_zero_displacement_height(canopy_height);
    let z0m = calc_roughness_length_for_momentum(canopy_height);
    let z0h = calc_roughness_length_for_heat_transfer(canopy_height);
    ((reference_height - d) / z0m).ln() * ((reference_height - d) / z0h).ln()
        / (wind_speed * von_karman_constant.powi(2))
}

/// Returns Lhomme's lumped aerodynamic resistance R0 = (1 + Δ/γ)·Ra [h m-1]
///
/// Lhomme et al. 2013. Journal of Hydrology 486, 315 - 320, Eq. 7
pub fn calc_lumped_aerodynamic_resistance(
    aerodynamic_resistance: f64,
    vapor_pressure_slope: f64,
    psychrometric_constant: f64,
) -> f64 {
    (1.0 + vapor_pressure_slope / psychrometric_constant) * aerodynamic_resistance
}

/// Returns the evapotranspiration energy flux density [W m-2ground] according to Penman's
/// formula
/// Arguments:
/// ----------
/// aerodynamic_resistance: f64
///     canopy aerodynamic resistance [h m-1]
/// available_energy: f64
///     canopy available energy [W m-2ground]
/// vapor_pressure_slope: f64
///     slope of the saturated vapor pressure curve [kPa K-1]
/// vapor_pressure_deficit: f64
///     air vapor pressure deficit [kPa]
/// psychrometric_constant: f64
///     [kPa K-1]
/// air_volumetric_heat_capacity: f64
///     product of air density and specific heat capacity [W h m-3 K-1]
pub fn calc_penman_evaporative_energy(
    aerodynamic_resistance: f64,
    available_energy: f64,
    vapor_pressure_slope: f64,
    vapor_pressure_deficit: f64,
    psychrometric_constant: f64,
    air_volumetric_heat_capacity: f64,
) -> f64 {
    (vapor_pressure_slope * available_energy
        + air_volumetric_heat_capacity * vapor_pressure_deficit / aerodynamic_resistance)
        / (vapor_pressure_slope + psychrometric_constant)
}

/// Returns the canopy evaporative energy [W m-2ground] of a multi-component canopy.
///
/// `composed_conductances`, `available_energies` and `boundary_resistances` must refer to the
/// same components in the same order.
///
/// Lhomme et al. 2013. Journal of Hydrology 486, 315 - 320, Eq. 12
pub fn calc_penman_monteith_evaporative_energy(
    lumped_aerodynamic_resistance: f64,
    penman_evaporative_energy: f64,
    composed_conductances: &[f64],
    available_energies: &[f64],
    boundary_resistances: &[f64],
    vapor_pressure_slope: f64,
    psychrometric_constant: f64,
) -> f64 {
    let (sum_p, sum_p_a_r) = composed_conductances
        .iter()
        .zip(available_energies)
        .zip(boundary_resistances)
        .fold((0.0, 0.0), |(sum_p, sum_p_a_r), ((p, a), r)| {
            (sum_p + p, sum_p_a_r + p * a * r)
        });
    lumped_aerodynamic_resistance * penman_evaporative_energy * sum_p
        + (vapor_pressure_slope / psychrometric_constant) * sum_p_a_r
}

/// Returns the air temperature [K] at source height
pub fn calc_temperature(
    air_temperature: f64,
    aerodynamic_resistance: f64,
    available_energy: f64,
    penman_monteith_evaporative_energy: f64,
    air_volumetric_heat_capacity: f64,
) -> f64 {
    air_temperature
        + (aerodynamic_resistance / air_volumetric_heat_capacity)
            * (available_energy - penman_monteith_evaporative_energy)
}

/// Returns the sensible heat flux density [W m-2ground] between the source height and the
/// reference height
pub fn calc_sensible_heat_flux(
    source_temperature: f64,
    air_temperature: f64,
    aerodynamic_resistance: f64,
    air_volumetric_heat_capacity: f64,
) -> f64 {
    air_volumetric_heat_capacity * (source_temperature - air_temperature) / aerodynamic_resistance
}

/// Returns the friction velocity [m h-1]
/// Arguments:
/// ----------
/// wind_speed: f64
///     wind speed at measurement height [m h-1]
/// measurement_height: f64
///     [m]
/// zero_displacement_height: f64
///     [m]
/// roughness_length_for_momentum: f64
///     [m]
/// stability_correction_for_momentum: f64
///     Monin-Obukhov correction for momentum transfer [-]
/// von_karman_constant: f64
///     [-]
pub fn calc_friction_velocity(
    wind_speed: f64,
    measurement_height: f64,
    zero_displacement_height: f64,
    roughness_length_for_momentum: f64,
    stability_correction_for_momentum: f64,
    von_karman_constant: f64,
) -> f64 {
    wind_speed * von_karman_constant
        / (((measurement_height - zero_displacement_height) / roughness_length_for_momentum).ln()
            - stability_correction_for_momentum)
}

/// Returns the Monin-Obukhov length [m]. Returns 0 when the friction velocity is null and
/// infinity (neutral atmosphere) when the sensible heat flux is null.
pub fn calc_monin_obukhov_length(
    surface_temperature: f64,
    sensible_heat_flux: f64,
    friction_velocity: f64,
    air_volumetric_heat_capacity: f64,
    gravitational_acceleration: f64,
    von_karman_constant: f64,
) -> f64 {
    if friction_velocity == 0.0 {
        return 0.0;
    }
    if sensible_heat_flux == 0.0 {
        return f64::INFINITY;
    }
    -air_volumetric_heat_capacity * friction_velocity.powi(3) * surface_temperature
        / (von_karman_constant * gravitational_acceleration * sensible_heat_flux)
}

/// Returns the Richardson number [-] estimated from the stability parameter (z - d)/L
pub fn calc_richardson_number(
    is_stable: bool,
    measurement_height: f64,
    zero_displacement_height: f64,
    monin_obukhov_length: f64,
) -> f64 {
    if monin_obukhov_length == 0.0 {
        return 0.0;
    }
    let zeta = (measurement_height - zero_displacement_height) / monin_obukhov_length;
    if is_stable {
        zeta / (1.0 + 5.0 * zeta)
    } else {
        zeta
    }
}

/// Returns the stability correction functions `(phi_m, phi_h)` [-] for momentum and heat.
///
/// Four Richardson-number bands are distinguished:
/// - `Ri < threshold` (free convection): no correction, resistance is handled separately
/// - `threshold <= Ri < -0.01` (unstable): Paulson (1970) integrated functions
/// - `-0.01 <= Ri < 0.2` (near neutral to stable): Webb (1970) linear functions
/// - `Ri >= 0.2` (strongly stable): no correction
pub fn calc_stability_correction_functions(
    monin_obukhov_length: f64,
    richardson_number: f64,
    measurement_height: f64,
    zero_displacement_height: f64,
    richardson_threshold_free_convection: f64,
) -> (f64, f64) {
    let zeta = if monin_obukhov_length == 0.0 {
        0.0
    } else {
        (measurement_height - zero_displacement_height) / monin_obukhov_length
    };
    if richardson_number < richardson_threshold_free_convection {
        (0.0, 0.0)
    } else if richardson_number < -0.01 {
        let x = (1.0 - 16.0 * zeta).max(0.0).powf(0.25);
        let phi_m = 2.0 * ((1.0 + x) / 2.0).ln() + ((1.0 + x.powi(2)) / 2.0).ln()
            - 2.0 * x.atan()
            + std::f64::consts::FRAC_PI_2;
        let phi_h = 2.0 * ((1.0 + x.powi(2)) / 2.0).ln();
        (phi_m, phi_h)
    } else if richardson_number < 0.2 {
        (-5.0 * zeta, -5.0 * zeta)
    } else {
        (0.0, 0.0)
    }
}

/// Returns the aerodynamic resistance [h m-1] corrected for atmospheric stability.
///
/// Under free convection (`Ri < threshold`) the resistance derives from the heat transfer
/// coefficient `1.52·|ΔT|^(1/3)` [W m-2 K-1], otherwise from the corrected log profile.
///
/// Webber et al. 2016. Environmental Modelling and Software 77, 143 - 155
pub fn calc_aerodynamic_resistance(
    richardson_number: f64,
    friction_velocity: f64,
    measurement_height: f64,
    zero_displacement_height: f64,
    roughness_length_for_heat: f64,
    stability_correction_for_heat: f64,
    canopy_temperature: f64,
    air_temperature: f64,
    richardson_threshold_free_convection: f64,
    von_karman_constant: f64,
    air_volumetric_heat_capacity: f64,
    free_convection_shape_parameter: f64,
) -> f64 {
    if richardson_number < richardson_threshold_free_convection {
        air_volumetric_heat_capacity
            / (free_convection_shape_parameter
                * (canopy_temperature - air_temperature)
                    .abs()
                    .max(PRECISION)
                    .powf(1.0 / 3.0))
    } else {
        let resistance = (((measurement_height - zero_displacement_height)
            / roughness_length_for_heat)
            .ln()
            - stability_correction_for_heat)
            / (von_karman_constant * friction_velocity.max(PRECISION));
        resistance.max(PRECISION)
    }
}
