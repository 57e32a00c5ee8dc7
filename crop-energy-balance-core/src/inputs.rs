//! Module containing the per-timestep inputs of the energy balance.

use crate::imports::*;
use crate::params::LeavesCategory;

/// Index reserved for the soil component
pub const SOIL_INDEX: i32 = -1;

/// Photosynthetically active radiation [W m-2ground] incident at the top of the canopy
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default, Validate)]
pub struct IncidentIrradiance {
    #[validate(range(min = 0))]
    pub direct: f64,
    #[validate(range(min = 0))]
    pub diffuse: f64,
}

impl IncidentIrradiance {
    pub fn total(&self) -> f64 {
        self.direct + self.diffuse
    }
}

/// Photosynthetically active radiation [W m-2ground] absorbed by one canopy component
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum AbsorbedIrradiance {
    SunlitShaded { sunlit: f64, shaded: f64 },
    Lumped { lumped: f64 },
}

impl AbsorbedIrradiance {
    pub fn total(&self) -> f64 {
        match self {
            Self::SunlitShaded { sunlit, shaded } => sunlit + shaded,
            Self::Lumped { lumped } => *lumped,
        }
    }

    fn is_compatible_with(&self, leaves_category: LeavesCategory) -> bool {
        matches!(
            (self, leaves_category),
            (Self::Lumped { .. }, LeavesCategory::Lumped)
                | (Self::SunlitShaded { .. }, LeavesCategory::SunlitShaded)
        )
    }
}

/// Meteorological and structural inputs of one timestep.
///
/// Leaf layer indices must be ordered so that the youngest (topmost) layer has the highest
/// index value. Index `-1` is reserved for the soil.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
pub struct Inputs {
    /// [m] height at which meteorological variables are measured
    #[validate(range(min = 0))]
    pub measurement_height: f64,
    /// [m]
    #[validate(range(min = 0))]
    pub canopy_height: f64,
    /// [-] ratio of actual to saturated soil water content
    #[validate(range(min = 0, max = 1))]
    pub soil_saturation_ratio: f64,
    /// [°C]
    pub air_temperature: f64,
    /// [m h-1] wind speed at measurement height
    #[validate(range(min = 0))]
    pub wind_speed: f64,
    /// [%]
    #[validate(range(min = 0, max = 100))]
    pub relative_humidity: f64,
    /// [kPa]
    #[validate(range(min = 0))]
    pub vapor_pressure: f64,
    /// [kPa]
    #[validate(range(min = 0))]
    pub vapor_pressure_deficit: f64,
    /// [kPa] atmospheric pressure, the psychrometric constant defaults to its sea-level value
    /// when missing
    #[serde(default)]
    pub atmospheric_pressure: Option<f64>,
    /// [rad] angle between the solar beam and the horizon
    #[serde(default)]
    pub solar_inclination: f64,
    /// [m2leaf m-2ground] leaf area index of each leaf layer
    pub leaf_layers: BTreeMap<i32, f64>,
    #[validate]
    pub incident_irradiance: IncidentIrradiance,
    /// absorbed irradiance of each leaf layer and of the soil (`-1`)
    pub absorbed_irradiance: BTreeMap<i32, AbsorbedIrradiance>,
    /// [MPa]
    #[serde(default)]
    pub soil_water_potential: Option<f64>,
}

impl SerdeAPI for Inputs {
    fn init(&mut self) -> anyhow::Result<()> {
        if let Err(e) = self.validate() {
            bail!(e)
        }
        self.check_leaf_layers()
    }
}

impl Inputs {
    /// [m2leaf m-2ground] total leaf area index of the canopy
    pub fn leaf_area_index(&self) -> f64 {
        self.leaf_layers.values().sum()
    }

    /// Leaf layer indices sorted from the top (youngest) to the bottom (oldest) of the canopy
    pub fn leaf_layer_indices_top_down(&self) -> Vec<i32> {
        self.leaf_layers.keys().rev().copied().collect()
    }

    pub fn check_leaf_layers(&self) -> anyhow::Result<()> {
        ensure!(!self.leaf_layers.is_empty(), "`leaf_layers` must not be empty");
        for (index, thickness) in self.leaf_layers.iter() {
            ensure!(
                *index >= 0,
                "leaf layer index {} is invalid, index {} is reserved for the soil and leaf layer indices must be non-negative",
                index,
                SOIL_INDEX
            );
            ensure!(
                *thickness > 0.0,
                "leaf layer {} has a non-positive thickness ({})",
                index,
                thickness
            );
        }
        ensure!(
            self.measurement_height > self.canopy_height,
            "{} must be above {}",
            format_dbg!(self.measurement_height),
            format_dbg!(self.canopy_height)
        );
        Ok(())
    }

    /// Checks that absorbed irradiance is supplied for the soil and for every leaf layer, in
    /// the shape expected by `leaves_category`
    pub fn check_absorbed_irradiance(&self, leaves_category: LeavesCategory) -> anyhow::Result<()> {
        match self.absorbed_irradiance.get(&SOIL_INDEX) {
            Some(AbsorbedIrradiance::Lumped { .. }) => (),
            Some(other) => bail!(
                "absorbed irradiance of the soil must be lumped, got {:?}",
                other
            ),
            None => bail!("absorbed irradiance of the soil (index {}) is missing", SOIL_INDEX),
        }
        for index in self.leaf_layers.keys() {
            let absorbed = self
                .absorbed_irradiance
                .get(index)
                .with_context(|| format!("absorbed irradiance of leaf layer {} is missing", index))?;
            ensure!(
                absorbed.is_compatible_with(leaves_category),
                "absorbed irradiance of leaf layer {} does not match leaves category {:?}: {:?}",
                index,
                leaves_category,
                absorbed
            );
        }
        if let Some(index) = self
            .absorbed_irradiance
            .keys()
            .find(|index| **index != SOIL_INDEX && !self.leaf_layers.contains_key(*index))
        {
            bail!("absorbed irradiance is given for unknown leaf layer {}", index);
        }
        Ok(())
    }
}
