use anyhow::{anyhow, Context};
use clap::{ArgGroup, Parser};

extern crate crop_energy_balance_core;
use crop_energy_balance_core::prelude::*;
use crop_energy_balance_core::weather_data::WEATHER_CSV_DELIMITER;

/// Wrapper for the crop energy balance solver.
/// After running `cargo build --release`, solve one timestep with
/// ```bash
/// ./target/release/crop-energy-balance-cli --inputs-file inputs.json --params-file params.yaml
/// ```
/// or an hourly series, using the inputs file as the canopy template, with
/// ```bash
/// ./target/release/crop-energy-balance-cli --inputs-file inputs.json --weather-file weather.csv --correct-stability
/// ```
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(group(
    ArgGroup::new("canopy")
    .required(true)
    .args(&["inputs", "inputs-file"])
))]
#[clap(group(
    ArgGroup::new("parameters")
    .args(&["params", "params-file"])
))]
struct CropEnergyBalanceApi {
    /// Inputs as json string
    #[clap(long, value_parser)]
    inputs: Option<String>,
    #[clap(long, value_parser)]
    /// Path to inputs file (json or yaml)
    inputs_file: Option<String>,
    #[clap(long, value_parser)]
    /// Params as json string, defaults are used when neither `--params` nor `--params-file` is given
    params: Option<String>,
    #[clap(long, value_parser)]
    /// Path to params file (json or yaml)
    params_file: Option<String>,
    #[clap(long, value_parser)]
    /// Path to physical constants file (json or yaml)
    constants_file: Option<String>,
    #[clap(long, value_parser)]
    /// Path to an hourly weather file (csv, `;`-separated), inputs are then used as a template
    weather_file: Option<String>,
    #[clap(long, action)]
    /// Correct aerodynamic resistance for atmospheric stability
    correct_stability: bool,
    #[clap(long, action)]
    /// Solve hourly series one timestep after the other instead of in parallel
    serial: bool,
}

pub fn main() -> anyhow::Result<()> {
    let api = CropEnergyBalanceApi::parse();

    let inputs = match (api.inputs, api.inputs_file) {
        (Some(inputs_json), _) => Inputs::from_json(inputs_json),
        (None, Some(inputs_file)) => Inputs::from_file(inputs_file),
        (None, None) => Err(anyhow!("`--inputs` or `--inputs-file` must be provided")),
    }
    .with_context(|| "Could not load inputs")?;

    let params = match (api.params, api.params_file) {
        (Some(params_json), _) => Params::from_json(params_json),
        (None, Some(params_file)) => Params::from_file(params_file),
        (None, None) => Ok(Params::default()),
    }
    .with_context(|| "Could not load params")?;

    let constants = match api.constants_file {
        Some(constants_file) => Constants::from_file(constants_file)?,
        None => Constants::default(),
    };

    if let Some(weather_file) = api.weather_file {
        let weather = WeatherData::from_csv_file(&weather_file, WEATHER_CSV_DELIMITER)?;
        let mut solvers = weather.to_solvers(&inputs, &params, &constants)?;
        solvers.run(api.correct_stability, Some(!api.serial))?;
        println!("{}", serde_json::to_string(&solvers.outputs()?)?);
    } else {
        let mut solver = Solver::new(inputs, params, constants)?;
        solver.run(api.correct_stability)?;
        println!("{}", solver.outputs()?.to_json()?);
    }
    Ok(())
}
