//! Module containing hourly weather series and their conversion into solver inputs.

use crate::formalisms::irradiance::{
    calc_lumped_leaf_layer_absorbed_irradiance, CanopyOptics, LeafExposure,
};
use crate::formalisms::weather::{
    calc_saturated_air_vapor_pressure, calc_vapor_pressure_deficit,
    convert_global_irradiance_into_photosynthetically_active_radiation,
};
use crate::imports::*;
use crate::inputs::{AbsorbedIrradiance, IncidentIrradiance, Inputs, SOIL_INDEX};
use crate::params::{Constants, LeavesCategory, Params, Simulation};
use crate::solver::Solver;
use crate::solver_vec::SolverVec;

/// Field delimiter of weather CSV files
pub const WEATHER_CSV_DELIMITER: u8 = b';';

/// [-] share of incident PAR assumed to be direct
pub const DIRECT_IRRADIANCE_FRACTION: f64 = 0.8;

/// One hour of weather
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WeatherRecord {
    /// timestamp, kept as written in the file
    pub time: String,
    /// [°C]
    pub air_temperature: f64,
    /// [m s-1]
    pub wind_speed: f64,
    /// [W m-2ground] incident global irradiance
    pub incident_global_irradiance: f64,
    /// [%]
    pub relative_humidity: f64,
    /// [kPa]
    #[serde(default)]
    pub atmospheric_pressure: Option<f64>,
    /// [rad]
    #[serde(default)]
    pub solar_inclination: Option<f64>,
}

impl WeatherRecord {
    /// Builds the inputs of this hour from `template`, which carries the canopy structure and
    /// soil state. Absorbed irradiance of every component is derived from the incident one.
    pub fn to_inputs(&self, template: &Inputs, params: &Params) -> anyhow::Result<Inputs> {
        let mut inputs = template.clone();
        inputs.air_temperature = self.air_temperature;
        inputs.wind_speed = self.wind_speed * 3600.0;
        inputs.relative_humidity = self.relative_humidity;
        inputs.vapor_pressure =
            calc_saturated_air_vapor_pressure(self.air_temperature) * self.relative_humidity / 100.0;
        inputs.vapor_pressure_deficit = calc_vapor_pressure_deficit(
            self.air_temperature,
            self.air_temperature,
            self.relative_humidity,
        );
        if self.atmospheric_pressure.is_some() {
            inputs.atmospheric_pressure = self.atmospheric_pressure;
        }
        if let Some(solar_inclination) = self.solar_inclination {
            inputs.solar_inclination = solar_inclination;
        }
        let incident_par = convert_global_irradiance_into_photosynthetically_active_radiation(
            self.incident_global_irradiance.max(0.0),
        );
        inputs.incident_irradiance = IncidentIrradiance {
            direct: DIRECT_IRRADIANCE_FRACTION * incident_par,
            diffuse: (1.0 - DIRECT_IRRADIANCE_FRACTION) * incident_par,
        };
        inputs.absorbed_irradiance = calc_absorbed_irradiance(&inputs, &params.simulation)?;
        inputs.init().with_context(|| format!("weather record {:?}", self.time))?;
        Ok(inputs)
    }
}

/// Returns the PAR [W m-2ground] absorbed by each leaf layer and by the soil, in the shape
/// expected by `simulation.leaves_category`
pub fn calc_absorbed_irradiance(
    inputs: &Inputs,
    simulation: &Simulation,
) -> anyhow::Result<BTreeMap<i32, AbsorbedIrradiance>> {
    let leaf_area_index = inputs.leaf_area_index();
    let optics = CanopyOptics::new(simulation, inputs.solar_inclination, leaf_area_index);
    let IncidentIrradiance { direct, diffuse } = inputs.incident_irradiance;

    let mut absorbed_irradiance = BTreeMap::new();
    let mut upper_cumulative_leaf_area_index = 0.0;
    for index in inputs.leaf_layer_indices_top_down() {
        let lower_cumulative_leaf_area_index =
            upper_cumulative_leaf_area_index + inputs.leaf_layers[&index];
        let layer_absorbed_irradiance = |exposure| {
            optics.calc_leaf_layer_absorbed_irradiance(
                exposure,
                direct,
                diffuse,
                upper_cumulative_leaf_area_index,
                lower_cumulative_leaf_area_index,
                simulation.sublayers_number,
            )
        };
        let absorbed = match simulation.leaves_category {
            LeavesCategory::Lumped => AbsorbedIrradiance::Lumped {
                lumped: calc_lumped_leaf_layer_absorbed_irradiance(
                    direct + diffuse,
                    upper_cumulative_leaf_area_index,
                    lower_cumulative_leaf_area_index,
                    simulation.global_extinction_coefficient,
                ),
            },
            LeavesCategory::SunlitShaded => AbsorbedIrradiance::SunlitShaded {
                sunlit: layer_absorbed_irradiance(LeafExposure::Sunlit)?,
                shaded: layer_absorbed_irradiance(LeafExposure::Shaded)?,
            },
        };
        absorbed_irradiance.insert(index, absorbed);
        upper_cumulative_leaf_area_index = lower_cumulative_leaf_area_index;
    }

    let soil = match simulation.leaves_category {
        LeavesCategory::Lumped => {
            (direct + diffuse) * (-simulation.global_extinction_coefficient * leaf_area_index).exp()
        }
        LeavesCategory::SunlitShaded => {
            optics.calc_soil_absorbed_irradiance(direct, diffuse, leaf_area_index)
        }
    };
    absorbed_irradiance.insert(SOIL_INDEX, AbsorbedIrradiance::Lumped { lumped: soil });
    Ok(absorbed_irradiance)
}

/// Hourly weather series
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WeatherData {
    pub records: Vec<WeatherRecord>,
}

impl SerdeAPI for WeatherData {
    const ACCEPTED_BYTE_FORMATS: &'static [&'static str] = &["yaml", "json", "csv"];
    const ACCEPTED_STR_FORMATS: &'static [&'static str] = &["yaml", "json", "csv"];

    fn init(&mut self) -> anyhow::Result<()> {
        ensure!(!self.records.is_empty(), "Invalid weather data; no record");
        Ok(())
    }

    fn to_writer<W: std::io::Write>(&self, wtr: W, format: &str) -> anyhow::Result<()> {
        match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::to_writer(wtr, self)?,
            "json" => serde_json::to_writer(wtr, self)?,
            "csv" => {
                let mut wtr = csv::WriterBuilder::new()
                    .delimiter(WEATHER_CSV_DELIMITER)
                    .from_writer(wtr);
                for record in self.records.iter() {
                    wtr.serialize(record)?;
                }
                wtr.flush()?
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_BYTE_FORMATS
            ),
        }
        Ok(())
    }

    fn to_str(&self, format: &str) -> anyhow::Result<String> {
        Ok(
            match format.trim_start_matches('.').to_lowercase().as_str() {
                "yaml" | "yml" => self.to_yaml()?,
                "json" => self.to_json()?,
                "csv" => {
                    let mut buf = Vec::with_capacity(self.len());
                    self.to_writer(&mut buf, "csv")?;
                    String::from_utf8(buf)?
                }
                _ => bail!(
                    "Unsupported format {format:?}, must be one of {:?}",
                    Self::ACCEPTED_STR_FORMATS
                ),
            },
        )
    }

    fn from_str<S: AsRef<str>>(contents: S, format: &str) -> anyhow::Result<Self> {
        Ok(
            match format.trim_start_matches('.').to_lowercase().as_str() {
                "yaml" | "yml" => Self::from_yaml(contents)?,
                "json" => Self::from_json(contents)?,
                "csv" => Self::from_reader(contents.as_ref().as_bytes(), "csv")?,
                _ => bail!(
                    "Unsupported format {format:?}, must be one of {:?}",
                    Self::ACCEPTED_STR_FORMATS
                ),
            },
        )
    }

    fn from_reader<R: std::io::Read>(rdr: R, format: &str) -> anyhow::Result<Self> {
        let mut deserialized = match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_reader(rdr)?,
            "json" => serde_json::from_reader(rdr)?,
            "csv" => Self::from_csv_reader(rdr, WEATHER_CSV_DELIMITER)?,
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_BYTE_FORMATS
            ),
        };
        deserialized.init()?;
        Ok(deserialized)
    }
}

impl WeatherData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn from_csv_reader<R: std::io::Read>(rdr: R, delimiter: u8) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let mut weather_data = Self::default();
        for (i, result) in rdr.deserialize().enumerate() {
            weather_data
                .records
                .push(result.with_context(|| format!("weather record idx: {}", i))?);
        }
        Ok(weather_data)
    }

    /// Load weather data from a CSV file whose fields are separated by `delimiter`
    pub fn from_csv_file<P: AsRef<Path>>(filepath: P, delimiter: u8) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let file = File::open(filepath)
            .with_context(|| format!("Could not open file: {filepath:?}"))?;
        let mut weather_data = Self::from_csv_reader(file, delimiter)?;
        weather_data.init()?;
        Ok(weather_data)
    }

    /// Builds one solver per record from `template` inputs
    pub fn to_solvers(
        &self,
        template: &Inputs,
        params: &Params,
        constants: &Constants,
    ) -> anyhow::Result<SolverVec> {
        self.records
            .iter()
            .map(|record| {
                let inputs = record.to_inputs(template, params)?;
                Solver::new(inputs, params.clone(), *constants)
                    .with_context(|| format!("weather record {:?}", record.time))
            })
            .collect()
    }
}
