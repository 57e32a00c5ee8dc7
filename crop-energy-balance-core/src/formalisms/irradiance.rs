//! Module containing canopy optics and absorbed irradiance formulas.
//!
//! de Pury and Farquhar, 1997. Simple scaling of photosynthesis from leaves to canopies
//! without the errors of big-leaf models. Plant, Cell and Environment 20, 537 - 557.

use crate::imports::*;
use crate::params::{LeavesCategory, Simulation};
use crate::utils::discretize_linearly;

/// Weights and elevations [rad] of the three sectors of a standard overcast sky
const STANDARD_OVERCAST_SKY: [(f64, f64); 3] = [
    (0.178, 15.0 * std::f64::consts::PI / 180.0),
    (0.514, 45.0 * std::f64::consts::PI / 180.0),
    (0.308, 75.0 * std::f64::consts::PI / 180.0),
];

/// Smallest sine of solar inclination used to compute beam extinction
const MINIMUM_SINE_SOLAR_INCLINATION: f64 = 1.0e-3;

/// Sunlit or shaded share of a leaf layer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LeafExposure {
    Sunlit,
    Shaded,
}

/// Returns the extinction coefficient [m2ground m-2leaf] of direct irradiance for black leaves
pub fn calc_direct_black_extinction_coefficient(
    solar_inclination: f64,
    leaves_to_sun_average_projection: f64,
) -> f64 {
    leaves_to_sun_average_projection / solar_inclination.sin().max(MINIMUM_SINE_SOLAR_INCLINATION)
}

/// Returns the extinction coefficient [m2ground m-2leaf] of direct irradiance for scattering
/// leaves
pub fn calc_direct_extinction_coefficient(
    direct_black_extinction_coefficient: f64,
    leaf_scattering_coefficient: f64,
) -> f64 {
    direct_black_extinction_coefficient * (1.0 - leaf_scattering_coefficient).sqrt()
}

/// Returns the extinction coefficient [m2ground m-2leaf] of diffuse irradiance, integrated over
/// a standard overcast sky.
///
/// `leaf_scattering_coefficient` set to zero gives the coefficient of black leaves.
pub fn calc_diffuse_extinction_coefficient(
    leaf_area_index: f64,
    leaves_to_sun_average_projection: f64,
    leaf_scattering_coefficient: f64,
) -> f64 {
    let sector_coefficients = STANDARD_OVERCAST_SKY.iter().map(|(weight, elevation)| {
        let coefficient = calc_direct_extinction_coefficient(
            calc_direct_black_extinction_coefficient(*elevation, leaves_to_sun_average_projection),
            leaf_scattering_coefficient,
        );
        (weight, coefficient)
    });
    if leaf_area_index <= 0.0 {
        sector_coefficients.map(|(w, k)| w * k).sum()
    } else {
        let transmitted: f64 = sector_coefficients
            .map(|(w, k)| w * (-k * leaf_area_index).exp())
            .sum();
        -transmitted.ln() / leaf_area_index
    }
}

/// Returns the canopy reflectance [-] to direct irradiance
pub fn calc_canopy_reflectance_to_direct_irradiance(
    direct_black_extinction_coefficient: f64,
    leaf_scattering_coefficient: f64,
) -> f64 {
    let root = (1.0 - leaf_scattering_coefficient).sqrt();
    let horizontal_reflectance = (1.0 - root) / (1.0 + root);
    1.0 - (-2.0 * horizontal_reflectance * direct_black_extinction_coefficient
        / (1.0 + direct_black_extinction_coefficient))
        .exp()
}

/// Extinction and reflectance coefficients of a canopy at one timestep
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct CanopyOptics {
    /// [m2ground m-2leaf]
    pub direct_black_extinction_coefficient: f64,
    /// [m2ground m-2leaf]
    pub direct_extinction_coefficient: f64,
    /// [m2ground m-2leaf]
    pub diffuse_black_extinction_coefficient: f64,
    /// [m2ground m-2leaf]
    pub diffuse_extinction_coefficient: f64,
    /// [-]
    pub canopy_reflectance_to_direct_irradiance: f64,
    /// [-]
    pub canopy_reflectance_to_diffuse_irradiance: f64,
    /// [-]
    pub leaf_scattering_coefficient: f64,
}

impl CanopyOptics {
    /// Derives canopy optics from the sun position and the total leaf area index
    pub fn new(simulation: &Simulation, solar_inclination: f64, leaf_area_index: f64) -> Self {
        let direct_black_extinction_coefficient = calc_direct_black_extinction_coefficient(
            solar_inclination,
            simulation.leaves_to_sun_average_projection,
        );
        Self {
            direct_black_extinction_coefficient,
            direct_extinction_coefficient: calc_direct_extinction_coefficient(
                direct_black_extinction_coefficient,
                simulation.leaf_scattering_coefficient,
            ),
            diffuse_black_extinction_coefficient: calc_diffuse_extinction_coefficient(
                leaf_area_index,
                simulation.leaves_to_sun_average_projection,
                0.0,
            ),
            diffuse_extinction_coefficient: calc_diffuse_extinction_coefficient(
                leaf_area_index,
                simulation.leaves_to_sun_average_projection,
                simulation.leaf_scattering_coefficient,
            ),
            canopy_reflectance_to_direct_irradiance: calc_canopy_reflectance_to_direct_irradiance(
                direct_black_extinction_coefficient,
                simulation.leaf_scattering_coefficient,
            ),
            canopy_reflectance_to_diffuse_irradiance: simulation
                .canopy_reflectance_to_diffuse_irradiance,
            leaf_scattering_coefficient: simulation.leaf_scattering_coefficient,
        }
    }

    /// Returns the fraction [-] of sunlit or shaded leaves at `cumulative_leaf_area_index`
    pub fn calc_leaf_fraction(&self, exposure: LeafExposure, cumulative_leaf_area_index: f64) -> f64 {
        let sunlit =
            (-self.direct_black_extinction_coefficient * cumulative_leaf_area_index).exp();
        match exposure {
            LeafExposure::Sunlit => sunlit,
            LeafExposure::Shaded => 1.0 - sunlit,
        }
    }

    /// Returns the direct irradiance [W m-2leaf] absorbed by sunlit leaves
    pub fn calc_absorbed_direct_irradiance(&self, incident_direct_irradiance: f64) -> f64 {
        incident_direct_irradiance
            * (1.0 - self.leaf_scattering_coefficient)
            * self.direct_black_extinction_coefficient
    }

    /// Returns the diffuse irradiance [W m-2leaf] absorbed at `cumulative_leaf_area_index`
    pub fn calc_absorbed_diffuse_irradiance(
        &self,
        incident_diffuse_irradiance: f64,
        cumulative_leaf_area_index: f64,
    ) -> f64 {
        incident_diffuse_irradiance
            * (1.0 - self.canopy_reflectance_to_diffuse_irradiance)
            * self.diffuse_extinction_coefficient
            * (-self.diffuse_extinction_coefficient * cumulative_leaf_area_index).exp()
    }

    /// Returns the scattered component of direct irradiance [W m-2leaf] absorbed at
    /// `cumulative_leaf_area_index`
    pub fn calc_absorbed_scattered_irradiance(
        &self,
        incident_direct_irradiance: f64,
        cumulative_leaf_area_index: f64,
    ) -> f64 {
        incident_direct_irradiance
            * ((1.0 - self.canopy_reflectance_to_direct_irradiance)
                * self.direct_extinction_coefficient
                * (-self.direct_extinction_coefficient * cumulative_leaf_area_index).exp()
                - (1.0 - self.leaf_scattering_coefficient)
                    * self.direct_black_extinction_coefficient
                    * (-self.direct_black_extinction_coefficient * cumulative_leaf_area_index)
                        .exp())
    }

    /// Returns the irradiance [W m-2leaf] absorbed by sunlit or shaded leaves at
    /// `cumulative_leaf_area_index`
    pub fn calc_absorbed_irradiance(
        &self,
        exposure: LeafExposure,
        incident_direct_irradiance: f64,
        incident_diffuse_irradiance: f64,
        cumulative_leaf_area_index: f64,
    ) -> f64 {
        let shaded = self
            .calc_absorbed_diffuse_irradiance(incident_diffuse_irradiance, cumulative_leaf_area_index)
            + self.calc_absorbed_scattered_irradiance(
                incident_direct_irradiance,
                cumulative_leaf_area_index,
            );
        match exposure {
            LeafExposure::Sunlit => shaded + self.calc_absorbed_direct_irradiance(incident_direct_irradiance),
            LeafExposure::Shaded => shaded,
        }
    }

    /// Returns the irradiance [W m-2ground] absorbed by the sunlit or shaded leaves of a whole
    /// layer, integrated over `sublayers_number` depths
    pub fn calc_leaf_layer_absorbed_irradiance(
        &self,
        exposure: LeafExposure,
        incident_direct_irradiance: f64,
        incident_diffuse_irradiance: f64,
        upper_cumulative_leaf_area_index: f64,
        lower_cumulative_leaf_area_index: f64,
        sublayers_number: usize,
    ) -> anyhow::Result<f64> {
        let sublayer_thickness = (lower_cumulative_leaf_area_index
            - upper_cumulative_leaf_area_index)
            / sublayers_number as f64;
        Ok(discretize_linearly(
            upper_cumulative_leaf_area_index,
            lower_cumulative_leaf_area_index,
            sublayers_number,
        )?
        .into_iter()
        .map(|depth| {
            self.calc_absorbed_irradiance(
                exposure,
                incident_direct_irradiance,
                incident_diffuse_irradiance,
                depth,
            ) * self.calc_leaf_fraction(exposure, depth)
                * sublayer_thickness
        })
        .sum())
    }

    /// Returns the irradiance [W m-2ground] transmitted down to the soil
    pub fn calc_soil_absorbed_irradiance(
        &self,
        incident_direct_irradiance: f64,
        incident_diffuse_irradiance: f64,
        leaf_area_index: f64,
    ) -> f64 {
        incident_direct_irradiance
            * (1.0 - self.canopy_reflectance_to_direct_irradiance)
            * (-self.direct_extinction_coefficient * leaf_area_index).exp()
            + incident_diffuse_irradiance
                * (1.0 - self.canopy_reflectance_to_diffuse_irradiance)
                * (-self.diffuse_extinction_coefficient * leaf_area_index).exp()
    }
}

/// Returns the irradiance [W m-2ground] absorbed by a lumped leaf layer, following Beer's law
pub fn calc_lumped_leaf_layer_absorbed_irradiance(
    incident_irradiance: f64,
    upper_cumulative_leaf_area_index: f64,
    lower_cumulative_leaf_area_index: f64,
    global_extinction_coefficient: f64,
) -> f64 {
    incident_irradiance
        * ((-global_extinction_coefficient * upper_cumulative_leaf_area_index).exp()
            - (-global_extinction_coefficient * lower_cumulative_leaf_area_index).exp())
}

/// Returns the leaf exposures making up one layer for `leaves_category`
pub fn leaf_exposures(leaves_category: LeavesCategory) -> &'static [LeafExposure] {
    match leaves_category {
        LeavesCategory::Lumped => &[],
        LeavesCategory::SunlitShaded => &[LeafExposure::Sunlit, LeafExposure::Shaded],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::*;

    fn optics(solar_inclination: f64) -> CanopyOptics {
        CanopyOptics::new(&Simulation::default(), solar_inclination, 4.0)
    }

    #[test]
    fn test_extinction_coefficients() {
        let zenith = std::f64::consts::FRAC_PI_2;
        assert!(almost_eq(calc_direct_black_extinction_coefficient(zenith, 0.5), 0.5, None));
        let by_inclination: Vec<f64> = (1..90)
            .map(|deg| calc_direct_black_extinction_coefficient((deg as f64).to_radians(), 0.5))
            .collect();
        assert!(is_non_increasing(&by_inclination));
        // night time does not divide by zero
        assert!(calc_direct_black_extinction_coefficient(-0.2, 0.5).is_finite());

        let optics = optics(zenith);
        assert!(optics.direct_extinction_coefficient < optics.direct_black_extinction_coefficient);
        assert!(optics.diffuse_extinction_coefficient < optics.diffuse_black_extinction_coefficient);
        // close to the constant kd' = 0.719 used by de Pury and Farquhar (1997)
        let kd = calc_diffuse_extinction_coefficient(3.0, 0.5, 0.15);
        assert!(almost_eq_decimal(kd, 0.72, 1));
        // without leaves the sky average is used
        let kd_bare = calc_diffuse_extinction_coefficient(0.0, 0.5, 0.0);
        assert!(kd_bare > calc_diffuse_extinction_coefficient(4.0, 0.5, 0.0));
    }

    #[test]
    fn test_canopy_reflectance_to_direct_irradiance() {
        let reflectance = calc_canopy_reflectance_to_direct_irradiance(0.5, 0.15);
        assert!(reflectance > 0.0 && reflectance < 0.1);
        assert_eq!(calc_canopy_reflectance_to_direct_irradiance(0.5, 0.0), 0.0);
    }

    #[test]
    fn test_leaf_fractions() {
        let optics = optics(0.8);
        assert_eq!(optics.calc_leaf_fraction(LeafExposure::Sunlit, 0.0), 1.0);
        assert_eq!(optics.calc_leaf_fraction(LeafExposure::Shaded, 0.0), 0.0);
        for depth in [0.5, 1.0, 3.0] {
            let total = optics.calc_leaf_fraction(LeafExposure::Sunlit, depth)
                + optics.calc_leaf_fraction(LeafExposure::Shaded, depth);
            assert!(almost_eq(total, 1.0, None));
        }
    }

    #[test]
    fn test_absorbed_irradiance_decreases_with_depth() {
        let optics = optics(0.8);
        for exposure in [LeafExposure::Sunlit, LeafExposure::Shaded] {
            let by_depth: Vec<f64> = (0..40)
                .map(|l| optics.calc_absorbed_irradiance(exposure, 300.0, 100.0, l as f64 / 10.0))
                .collect();
            assert!(is_non_increasing(&by_depth));
            assert!(by_depth.iter().all(|i| *i >= 0.0));
        }
        // sunlit leaves receive the direct beam on top of what shaded leaves absorb
        assert!(
            optics.calc_absorbed_irradiance(LeafExposure::Sunlit, 300.0, 100.0, 1.0)
                > optics.calc_absorbed_irradiance(LeafExposure::Shaded, 300.0, 100.0, 1.0)
        );
        assert_eq!(optics.calc_absorbed_irradiance(LeafExposure::Shaded, 0.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_layer_absorbed_irradiance_budget() {
        let optics = optics(0.8);
        let (direct, diffuse) = (300.0, 100.0);
        let leaves: f64 = [LeafExposure::Sunlit, LeafExposure::Shaded]
            .iter()
            .map(|exposure| {
                optics
                    .calc_leaf_layer_absorbed_irradiance(*exposure, direct, diffuse, 0.0, 4.0, 100)
                    .unwrap()
            })
            .sum();
        let soil = optics.calc_soil_absorbed_irradiance(direct, diffuse, 4.0);
        // leaves and soil absorb most, but not more than, the incident irradiance
        assert!(leaves + soil < direct + diffuse);
        assert!(leaves + soil > 0.8 * (direct + diffuse), "{}", leaves + soil);
        assert!(optics
            .calc_leaf_layer_absorbed_irradiance(LeafExposure::Sunlit, direct, diffuse, 0.0, 4.0, 1)
            .is_err());
    }

    #[test]
    fn test_lumped_leaf_layer_absorbed_irradiance() {
        let upper = calc_lumped_leaf_layer_absorbed_irradiance(400.0, 0.0, 1.0, 0.45);
        let lower = calc_lumped_leaf_layer_absorbed_irradiance(400.0, 1.0, 2.0, 0.45);
        assert!(upper > lower);
        let whole = calc_lumped_leaf_layer_absorbed_irradiance(400.0, 0.0, 2.0, 0.45);
        assert!(almost_eq(upper + lower, whole, None));
    }

    #[test]
    fn test_leaf_exposures() {
        assert!(leaf_exposures(LeavesCategory::Lumped).is_empty());
        assert_eq!(
            leaf_exposures(LeavesCategory::SunlitShaded),
            &[LeafExposure::Sunlit, LeafExposure::Shaded]
        );
    }
}
