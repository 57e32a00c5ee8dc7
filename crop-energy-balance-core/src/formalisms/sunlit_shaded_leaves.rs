//! Module containing layer-scale formulas for leaves split into sunlit and shaded fractions.

use crate::formalisms::irradiance::{CanopyOptics, LeafExposure};
use crate::formalisms::leaf::{calc_leaf_boundary_conductance, calc_stomatal_conductance};
use crate::formalisms::lumped_leaves;
use crate::imports::*;
use crate::utils::discretize_linearly;

/// Returns the bulk boundary layer conductance [m h-1] of the sunlit or shaded leaves of a
/// layer. Shaded leaves get what remains of the lumped layer conductance.
pub fn calc_leaf_layer_boundary_conductance(
    exposure: LeafExposure,
    wind_speed_at_canopy_height: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    direct_black_extinction_coefficient: f64,
    wind_speed_extinction_coefficient: f64,
    characteristic_length: f64,
    shape_parameter: f64,
) -> f64 {
    let leaf_boundary_conductance = calc_leaf_boundary_conductance(
        wind_speed_at_canopy_height,
        characteristic_length,
        shape_parameter,
    );
    let extinction = 0.5 * wind_speed_extinction_coefficient + direct_black_extinction_coefficient;
    let sunlit = leaf_boundary_conductance / extinction
        * ((-extinction * upper_cumulative_leaf_area_index).exp()
            - (-extinction * lower_cumulative_leaf_area_index).exp());
    match exposure {
        LeafExposure::Sunlit => sunlit,
        LeafExposure::Shaded => {
            lumped_leaves::calc_leaf_layer_boundary_conductance(
                wind_speed_at_canopy_height,
                upper_cumulative_leaf_area_index,
                lower_cumulative_leaf_area_index,
                wind_speed_extinction_coefficient,
                characteristic_length,
                shape_parameter,
            ) - sunlit
        }
    }
}

/// Returns the bulk surface conductance [m h-1] of the sunlit or shaded leaves of a layer,
/// integrated numerically over `sublayers_number` depths
pub fn calc_leaf_layer_surface_conductance(
    exposure: LeafExposure,
    optics: &CanopyOptics,
    incident_direct_irradiance: f64,
    incident_diffuse_irradiance: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    stomatal_sensibility: f64,
    maximum_stomatal_conductance: f64,
    residual_stomatal_conductance: f64,
    absorbed_par_50: f64,
    sublayers_number: usize,
) -> anyhow::Result<f64> {
    let sublayer_thickness = (lower_cumulative_leaf_area_index - upper_cumulative_leaf_area_index)
        / sublayers_number as f64;
    let depths = discretize_linearly(
        upper_cumulative_leaf_area_index,
        lower_cumulative_leaf_area_index,
        sublayers_number,
    )
    .with_context(|| format_dbg!())?;
    Ok(depths
        .into_iter()
        .map(|depth| {
            let absorbed_irradiance = optics.calc_absorbed_irradiance(
                exposure,
                incident_direct_irradiance,
                incident_diffuse_irradiance,
                depth,
            );
            calc_stomatal_conductance(
                residual_stomatal_conductance,
                maximum_stomatal_conductance,
                absorbed_irradiance,
                absorbed_par_50,
                stomatal_sensibility,
            ) * optics.calc_leaf_fraction(exposure, depth)
                * sublayer_thickness
        })
        .sum())
}

/// Returns the net longwave radiation [W m-2ground] of the sunlit or shaded leaves of a layer
pub fn calc_leaf_layer_net_longwave_radiation(
    exposure: LeafExposure,
    canopy_top_net_longwave_radiation: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    direct_black_extinction_coefficient: f64,
    diffuse_black_extinction_coefficient: f64,
    leaf_emissivity: f64,
) -> f64 {
    let kd = diffuse_black_extinction_coefficient;
    let extinction = kd + direct_black_extinction_coefficient;
    let sunlit = canopy_top_net_longwave_radiation * kd / extinction
        * ((-extinction * upper_cumulative_leaf_area_index).exp()
            - (-extinction * lower_cumulative_leaf_area_index).exp())
        * leaf_emissivity;
    match exposure {
        LeafExposure::Sunlit => sunlit,
        LeafExposure::Shaded => {
            lumped_leaves::calc_leaf_layer_net_longwave_radiation(
                canopy_top_net_longwave_radiation,
                upper_cumulative_leaf_area_index,
                lower_cumulative_leaf_area_index,
                kd,
                leaf_emissivity,
            ) - sunlit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Simulation;
    use crate::utils::*;

    fn optics() -> CanopyOptics {
        CanopyOptics::new(&Simulation::default(), 0.8, 3.0)
    }

    #[test]
    fn test_boundary_conductances_partition_lumped_layer() {
        let kb = optics().direct_black_extinction_coefficient;
        let g = |exposure: LeafExposure| {
            calc_leaf_layer_boundary_conductance(exposure, 7200.0, 0.5, 1.5, kb, 0.5, 0.01, 0.01)
        };
        let lumped =
            lumped_leaves::calc_leaf_layer_boundary_conductance(7200.0, 0.5, 1.5, 0.5, 0.01, 0.01);
        assert!(almost_eq(g(LeafExposure::Sunlit) + g(LeafExposure::Shaded), lumped, None));
        assert!(g(LeafExposure::Sunlit) > 0.0);
        assert!(g(LeafExposure::Shaded) > 0.0);
        // the top of the canopy is mostly sunlit
        let top = |exposure: LeafExposure| {
            calc_leaf_layer_boundary_conductance(exposure, 7200.0, 0.0, 0.1, kb, 0.5, 0.01, 0.01)
        };
        assert!(top(LeafExposure::Sunlit) > top(LeafExposure::Shaded));
    }

    #[test]
    fn test_calc_leaf_layer_surface_conductance() {
        let optics = optics();
        let g = |exposure: LeafExposure, direct: f64, diffuse: f64| {
            calc_leaf_layer_surface_conductance(
                exposure, &optics, direct, diffuse, 0.0, 3.0, 1.0, 39.6, 3.0, 105.0, 100,
            )
            .unwrap()
        };
        // residual conductances of sunlit and shaded leaves add up to the lumped one in the dark
        let dark = g(LeafExposure::Sunlit, 0.0, 0.0) + g(LeafExposure::Shaded, 0.0, 0.0);
        assert!(almost_eq_decimal(dark, 3.0 * 3.0, 1));
        for exposure in [LeafExposure::Sunlit, LeafExposure::Shaded] {
            let by_irradiance: Vec<f64> = (0..10)
                .map(|i| g(exposure, i as f64 * 50.0, i as f64 * 20.0))
                .collect();
            assert!(is_non_decreasing(&by_irradiance));
        }
        assert!(calc_leaf_layer_surface_conductance(
            LeafExposure::Sunlit,
            &optics,
            300.0,
            100.0,
            0.0,
            3.0,
            1.0,
            39.6,
            3.0,
            105.0,
            0
        )
        .is_err());
    }

    #[test]
    fn test_net_longwave_radiations_partition_lumped_layer() {
        let optics = optics();
        let lw = |exposure: LeafExposure| {
            calc_leaf_layer_net_longwave_radiation(
                exposure,
                -120.0,
                1.0,
                2.0,
                optics.direct_black_extinction_coefficient,
                optics.diffuse_black_extinction_coefficient,
                0.98,
            )
        };
        let lumped = lumped_leaves::calc_leaf_layer_net_longwave_radiation(
            -120.0,
            1.0,
            2.0,
            optics.diffuse_black_extinction_coefficient,
            0.98,
        );
        assert!(almost_eq(lw(LeafExposure::Sunlit) + lw(LeafExposure::Shaded), lumped, None));
        assert!(lw(LeafExposure::Sunlit) < 0.0);
        assert!(lw(LeafExposure::Shaded) < 0.0);
    }
}
