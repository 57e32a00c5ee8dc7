use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::predicate;

fn asset(name: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../crop-energy-balance-core/tests/assets")
        .join(name);
    assert!(path.exists(), "{:?}", path);
    path
}

#[test]
fn test_that_cli_app_produces_result() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("crop-energy-balance-cli")?;
    cmd.arg("--inputs-file").arg(asset("big_leaf_inputs.json"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"converged\""))
        .stdout(predicate::str::contains("\"kind\":\"soil\""));
    Ok(())
}

#[test]
fn test_that_cli_app_solves_hourly_series() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("crop-energy-balance-cli")?;
    cmd.arg("--inputs-file")
        .arg(asset("layered_inputs.yaml"))
        .arg("--params-file")
        .arg(asset("sunlit_shaded_params.yaml"))
        .arg("--weather-file")
        .arg(asset("weather.csv"))
        .arg("--correct-stability")
        .arg("--serial");
    let output = cmd.output()?;
    assert!(output.status.success());
    let outputs: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(outputs.as_array().map(|a| a.len()), Some(6));
    Ok(())
}

#[test]
fn test_that_cli_app_accepts_json_strings() -> Result<(), Box<dyn std::error::Error>> {
    let inputs = std::fs::read_to_string(asset("big_leaf_inputs.json"))?;
    let mut cmd = Command::cargo_bin("crop-energy-balance-cli")?;
    cmd.args([
        "--inputs",
        &inputs,
        "--params",
        r#"{"numerical_resolution": {"maximum_iteration_number": 1}}"#,
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("exceeded_max_iterations"));
    Ok(())
}

#[test]
fn test_that_cli_app_reports_configuration_errors() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("crop-energy-balance-cli")?;
    cmd.arg("--inputs-file")
        .arg(asset("layered_inputs.yaml"))
        .arg("--params")
        .arg(r#"{"simulation": {"leaves_category": "lumped"}}"#);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not match leaves category"));

    let mut cmd = Command::cargo_bin("crop-energy-balance-cli")?;
    cmd.assert().failure();
    Ok(())
}
