use crop_energy_balance_core::prelude::*;
use crop_energy_balance_core::solver::MAXIMUM_STABILITY_ITERATION_NUMBER;
use crop_energy_balance_core::utils::almost_eq;

const BIG_LEAF_INPUTS: &str = include_str!("assets/big_leaf_inputs.json");
const LAYERED_INPUTS: &str = include_str!("assets/layered_inputs.yaml");
const SUNLIT_SHADED_PARAMS: &str = include_str!("assets/sunlit_shaded_params.yaml");
const WEATHER: &str = include_str!("assets/weather.csv");

fn assert_physically_plausible(solver: &Solver) {
    let air_temperature = solver.crop.state_variables.air_temperature;
    let outputs = solver.outputs().unwrap();
    assert!((outputs.source_temperature - air_temperature).abs() < 15.0);
    for temperature in outputs.temperatures() {
        assert!((temperature - air_temperature).abs() < 15.0);
    }
    assert!(outputs.energy_balance.abs() <= solver.energy_balance_tolerance());
    // net radiation is split into latent, sensible and soil heat
    assert!(almost_eq(
        outputs.net_radiation,
        outputs.evaporative_energy + outputs.sensible_heat_flux + outputs.soil_heat_flux,
        Some(1e-6)
    ));
}

#[test]
fn test_big_leaf_scenario() {
    let inputs = Inputs::from_json(BIG_LEAF_INPUTS).unwrap();
    let mut solver = Solver::new(inputs, Params::default(), Constants::default()).unwrap();
    solver.run(false).unwrap();
    assert_eq!(solver.status, Some(ConvergenceStatus::Converged));
    assert!(solver.iterations_number > 0);
    assert_physically_plausible(&solver);
}

#[test]
fn test_layered_lumped_scenario() {
    let mut inputs = Inputs::from_json(BIG_LEAF_INPUTS).unwrap();
    inputs.leaf_layers = [(0, 1.0), (1, 1.5), (2, 1.5)].into_iter().collect();
    inputs.absorbed_irradiance = [
        (-1, AbsorbedIrradiance::Lumped { lumped: 20.0 }),
        (0, AbsorbedIrradiance::Lumped { lumped: 60.0 }),
        (1, AbsorbedIrradiance::Lumped { lumped: 100.0 }),
        (2, AbsorbedIrradiance::Lumped { lumped: 150.0 }),
    ]
    .into_iter()
    .collect();
    let mut solver = Solver::new(inputs, Params::default(), Constants::default()).unwrap();
    solver.run(false).unwrap();
    assert_eq!(solver.status, Some(ConvergenceStatus::Converged));

    let outputs = solver.outputs().unwrap();
    let layers: Vec<(i32, ComponentKind)> =
        outputs.components.iter().map(|c| (c.index, c.kind)).collect();
    assert_eq!(
        layers,
        vec![
            (2, ComponentKind::LumpedLeaf),
            (1, ComponentKind::LumpedLeaf),
            (0, ComponentKind::LumpedLeaf),
            (-1, ComponentKind::Soil),
        ]
    );
    assert_physically_plausible(&solver);

    solver.run(true).unwrap();
    let outputs = solver.outputs().unwrap();
    assert_ne!(outputs.status, ConvergenceStatus::ExceededMaxIterations);
    assert!(outputs.source_temperature.is_finite());
}

#[test]
fn test_layered_sunlit_shaded_scenario() {
    let inputs = Inputs::from_yaml(LAYERED_INPUTS).unwrap();
    let params = Params::from_yaml(SUNLIT_SHADED_PARAMS).unwrap();
    let mut solver = Solver::new(inputs, params, Constants::default()).unwrap();
    solver.run(false).unwrap();
    assert_eq!(solver.status, Some(ConvergenceStatus::Converged));

    let outputs = solver.outputs().unwrap();
    let kinds: Vec<ComponentKind> = outputs.components.iter().map(|c| c.kind).collect();
    assert_eq!(kinds.len(), 7);
    assert_eq!(kinds.last(), Some(&ComponentKind::Soil));
    assert_eq!(
        kinds.iter().filter(|k| **k == ComponentKind::SunlitLeaf).count(),
        3
    );
    assert_physically_plausible(&solver);
}

#[test]
fn test_layered_inputs_need_sunlit_shaded_params() {
    let inputs = Inputs::from_yaml(LAYERED_INPUTS).unwrap();
    let err = Solver::new(inputs, Params::default(), Constants::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("does not match leaves category"));
}

#[test]
fn test_stability_corrected_scenario() {
    let inputs = Inputs::from_yaml(LAYERED_INPUTS).unwrap();
    let params = Params::from_yaml(SUNLIT_SHADED_PARAMS).unwrap();
    let mut solver = Solver::new(inputs, params, Constants::default()).unwrap();
    solver.run(true).unwrap();
    let outputs = solver.outputs().unwrap();
    assert_ne!(outputs.status, ConvergenceStatus::ExceededMaxIterations);
    assert!(outputs.stability_iterations_number >= 1);
    assert!(outputs.stability_iterations_number <= MAXIMUM_STABILITY_ITERATION_NUMBER);
    assert!(outputs.source_temperature.is_finite());
    assert!(outputs.aerodynamic_resistance > 0.0);
}

#[test]
fn test_hourly_batch() {
    let weather = WeatherData::from_str(WEATHER, "csv").unwrap();
    let template = Inputs::from_yaml(LAYERED_INPUTS).unwrap();
    let params = Params::from_yaml(SUNLIT_SHADED_PARAMS).unwrap();
    let mut solvers = weather
        .to_solvers(&template, &params, &Constants::default())
        .unwrap();
    assert_eq!(solvers.len(), weather.len());
    solvers.run(false, None).unwrap();
    let outputs = solvers.outputs().unwrap();
    assert!(outputs
        .iter()
        .all(|o| o.status == ConvergenceStatus::Converged));
    // no shortwave at midnight: the canopy loses energy
    assert!(outputs[0].net_radiation < 0.0);
    // more available energy at noon than early in the morning
    assert!(outputs[3].available_energy > outputs[1].available_energy);
}

#[test]
fn test_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let params = Params::from_yaml(SUNLIT_SHADED_PARAMS).unwrap();
    let params_file = dir.path().join("params.json");
    params.to_file(&params_file).unwrap();
    assert_eq!(Params::from_file(&params_file).unwrap(), params);

    let inputs = Inputs::from_yaml(LAYERED_INPUTS).unwrap();
    let inputs_file = dir.path().join("inputs.yaml");
    inputs.to_file(&inputs_file).unwrap();
    assert_eq!(Inputs::from_file(&inputs_file).unwrap(), inputs);

    let mut solver = Solver::new(inputs, params, Constants::default()).unwrap();
    solver.run(false).unwrap();
    let outputs = solver.outputs().unwrap();
    let outputs_file = dir.path().join("outputs.json");
    outputs.to_file(&outputs_file).unwrap();
    let loaded = SolverOutputs::from_file(&outputs_file).unwrap();
    assert_eq!(loaded.status, outputs.status);
    assert!(loaded.temperatures().approx_eq(&outputs.temperatures(), 1e-9));

    assert!(Params::from_file(dir.path().join("params.toml")).is_err());
}
