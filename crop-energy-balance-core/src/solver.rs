//! Module containing the multi-source energy balance solver of one timestep.

use crate::component::{ComponentKind, CropComponent};
use crate::crop::Crop;
use crate::imports::*;
use crate::inputs::Inputs;
use crate::params::{Constants, Params};

/// Maximum number of attempts of the stability correction loop
pub const MAXIMUM_STABILITY_ITERATION_NUMBER: usize = 100;

/// How the last resolution ended
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// every resolution met the temperature tolerance (and the sensible heat tolerance when
    /// stability is corrected)
    Converged,
    /// the stability correction did not settle and the aerodynamic resistance was forced
    ForcedFallback,
    /// at least one resolution stopped at `maximum_iteration_number`
    ExceededMaxIterations,
}

/// Solves the energy balance of one crop at one timestep.
///
/// The inner loop iterates component temperatures to a fixed point (Lhomme et al., 2013). When
/// stability correction is requested, an outer loop updates the aerodynamic resistance from
/// Monin-Obukhov similarity and resolves the inner loop until the sensible heat flux settles.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Solver {
    pub crop: Crop,
    /// total number of inner iterations of the last run
    pub iterations_number: usize,
    /// number of stability correction attempts of the last run, counted from 1
    pub stability_iterations_number: usize,
    /// [K] summed absolute temperature change of the last inner iteration
    pub error_temperature: f64,
    /// [W m-2ground] absolute sensible heat flux change of the last stability iteration
    pub error_sensible_heat_flux: f64,
    /// [W m-2ground] net radiation minus the sum of evaporative, sensible and soil heat fluxes
    pub energy_balance: f64,
    pub is_forced_aerodynamic_resistance: bool,
    pub is_maximum_iteration_number_exceeded: bool,
    /// `None` until `run` has been called
    pub status: Option<ConvergenceStatus>,
}

impl SerdeAPI for Solver {}

impl Solver {
    pub fn new(inputs: Inputs, params: Params, constants: Constants) -> anyhow::Result<Self> {
        Ok(Self {
            crop: Crop::new(inputs, params, constants)?,
            iterations_number: 0,
            stability_iterations_number: 0,
            error_temperature: 0.0,
            error_sensible_heat_flux: 0.0,
            energy_balance: 0.0,
            is_forced_aerodynamic_resistance: false,
            is_maximum_iteration_number_exceeded: false,
            status: None,
        })
    }

    /// Solves the energy balance, optionally correcting the aerodynamic resistance for
    /// atmospheric stability. Every run starts from the neutral state of construction.
    /// Arguments:
    /// ----------
    /// correct_stability: bool
    ///     whether to run the Monin-Obukhov correction loop after the neutral resolution
    pub fn run(&mut self, correct_stability: bool) -> anyhow::Result<()> {
        self.crop.reset_state_variables()?;
        self.iterations_number = 0;
        self.stability_iterations_number = 0;
        self.error_temperature = 0.0;
        self.error_sensible_heat_flux = 0.0;
        self.energy_balance = 0.0;
        self.is_forced_aerodynamic_resistance = false;
        self.is_maximum_iteration_number_exceeded = false;
        self.status = None;

        self.solve_transient_energy_balance();
        if correct_stability {
            self.correct_stability(MAXIMUM_STABILITY_ITERATION_NUMBER);
        }
        self.set_post_scalars()
    }

    /// Iterates component temperatures until their summed change falls below
    /// `acceptable_temperature_error` or `maximum_iteration_number` is reached.
    /// Returns whether the tolerance was met.
    pub fn solve_transient_energy_balance(&mut self) -> bool {
        let step_fraction = self.crop.params.numerical_resolution.step_fraction;
        let maximum_iteration_number = self
            .crop
            .params
            .numerical_resolution
            .maximum_iteration_number;
        let mut iterations_number: usize = 0;
        loop {
            iterations_number += 1;
            self.iterations_number += 1;

            self.crop.update_conductances();
            self.crop.update_evaporative_energy();
            self.crop.update_canopy_energy();
            self.crop.update_components_temperature();
            self.calc_error();
            self.crop.update_components_previous_temperature(step_fraction);
            self.calc_energy_balance();
            log::debug!(
                "iteration {}: temperature error {:.5}",
                iterations_number,
                self.error_temperature
            );

            if self.is_converged() {
                return true;
            }
            if iterations_number >= maximum_iteration_number {
                self.is_maximum_iteration_number_exceeded = true;
                log::warn!(
                    "temperature error {:.5} exceeds tolerance of {:.5} after {} iterations",
                    self.error_temperature,
                    self.crop.params.numerical_resolution.acceptable_temperature_error,
                    iterations_number
                );
                return false;
            }
        }
    }

    /// Updates and returns the summed absolute change [K] between the actual and the retained
    /// temperature of every component
    pub fn calc_error(&mut self) -> f64 {
        self.error_temperature = self.crop.calc_temperature_error();
        self.error_temperature
    }

    pub fn is_converged(&self) -> bool {
        self.error_temperature <= self.crop.params.numerical_resolution.acceptable_temperature_error
    }

    pub fn calc_energy_balance(&mut self) {
        let sv = &self.crop.state_variables;
        self.energy_balance = sv.net_radiation
            - (sv.penman_monteith_evaporative_energy
                + sv.sensible_heat_flux
                + self.crop.soil_heat_flux());
    }

    /// [W m-2ground] flux equivalent of `acceptable_temperature_error` across the aerodynamic
    /// resistance
    pub fn energy_balance_tolerance(&self) -> f64 {
        self.crop.constants.air_volumetric_heat_capacity()
            * self.crop.params.numerical_resolution.acceptable_temperature_error
            / self.crop.state_variables.aerodynamic_resistance
    }

    /// Resolves the energy balance with stability-corrected aerodynamic resistance until the
    /// sensible heat flux settles (to 2 decimal places) or `maximum_stability_iteration_number`
    /// attempts were made, in which case the aerodynamic resistance is forced
    pub fn correct_stability(&mut self, maximum_stability_iteration_number: usize) {
        let mut is_acceptable_error = false;
        while !is_acceptable_error
            && self.stability_iterations_number < maximum_stability_iteration_number
        {
            self.stability_iterations_number += 1;
            let sensible_heat_flux = self.crop.state_variables.sensible_heat_flux;
            self.crop.update_aerodynamic_resistance_with_stability();
            self.solve_transient_energy_balance();
            self.error_sensible_heat_flux =
                (self.crop.state_variables.sensible_heat_flux - sensible_heat_flux).abs();
            log::debug!(
                "stability iteration {}: sensible heat flux error {:.5}",
                self.stability_iterations_number,
                self.error_sensible_heat_flux
            );
            is_acceptable_error = (self.error_sensible_heat_flux * 100.0).round() / 100.0 == 0.0;
        }

        if !is_acceptable_error {
            log::warn!(
                "sensible heat flux error {:.5} remains after {} stability iterations, forcing aerodynamic resistance",
                self.error_sensible_heat_flux,
                self.stability_iterations_number
            );
            self.force_aerodynamic_resistance();
            self.solve_transient_energy_balance();
        }
    }

    /// Replaces the aerodynamic resistance by the scaled neutral one
    pub fn force_aerodynamic_resistance(&mut self) {
        self.crop.force_aerodynamic_resistance();
        self.is_forced_aerodynamic_resistance = true;
    }

    fn set_post_scalars(&mut self) -> anyhow::Result<()> {
        ensure!(
            self.crop.state_variables.source_temperature.is_finite(),
            "{}",
            format_dbg!(self.crop.state_variables.source_temperature)
        );
        let tolerance = self.energy_balance_tolerance();
        if self.energy_balance.abs() > tolerance {
            log::warn!(
                "energy balance residual {:.5} exceeds tolerance of {:.5}",
                self.energy_balance,
                tolerance
            );
        }
        self.status = Some(if self.is_maximum_iteration_number_exceeded {
            ConvergenceStatus::ExceededMaxIterations
        } else if self.is_forced_aerodynamic_resistance {
            ConvergenceStatus::ForcedFallback
        } else {
            ConvergenceStatus::Converged
        });
        Ok(())
    }

    /// Collects canopy and component results of the last run
    pub fn outputs(&self) -> anyhow::Result<SolverOutputs> {
        let status = self
            .status
            .with_context(|| "solver has not been run, call `run` first")?;
        let sv = &self.crop.state_variables;
        Ok(SolverOutputs {
            status,
            iterations_number: self.iterations_number,
            stability_iterations_number: self.stability_iterations_number,
            error_temperature: self.error_temperature,
            error_sensible_heat_flux: self.error_sensible_heat_flux,
            energy_balance: self.energy_balance,
            is_forced_aerodynamic_resistance: self.is_forced_aerodynamic_resistance,
            is_maximum_iteration_number_exceeded: self.is_maximum_iteration_number_exceeded,
            source_temperature: sv.source_temperature,
            aerodynamic_resistance: sv.aerodynamic_resistance,
            net_radiation: sv.net_radiation,
            available_energy: sv.available_energy,
            sensible_heat_flux: sv.sensible_heat_flux,
            evaporative_energy: sv.penman_monteith_evaporative_energy,
            soil_heat_flux: self.crop.soil_heat_flux(),
            components: self
                .crop
                .extract_all_components()
                .iter()
                .map(|c| {
                    let state = c.state();
                    ComponentOutputs {
                        index: state.index,
                        kind: c.kind(),
                        temperature: state.temperature,
                        available_energy: state.available_energy,
                        evaporative_energy: state.evaporative_energy,
                        surface_resistance: state.surface_resistance,
                        boundary_resistance: state.boundary_resistance,
                        composed_resistance: state.composed_resistance,
                        heat_flux: c.heat_flux(),
                    }
                })
                .collect(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ComponentOutputs {
    pub index: i32,
    pub kind: ComponentKind,
    /// [K]
    pub temperature: f64,
    /// [W m-2ground]
    pub available_energy: f64,
    /// [W m-2ground]
    pub evaporative_energy: f64,
    /// [h m-1]
    pub surface_resistance: f64,
    /// [h m-1]
    pub boundary_resistance: f64,
    /// [h m-1]
    pub composed_resistance: f64,
    /// [W m-2ground] soil only
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heat_flux: Option<f64>,
}

/// Results of one solved timestep
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolverOutputs {
    /// `ExceededMaxIterations` wins over `ForcedFallback`, both flags below are always reported
    pub status: ConvergenceStatus,
    pub iterations_number: usize,
    pub stability_iterations_number: usize,
    /// [K]
    pub error_temperature: f64,
    /// [W m-2ground]
    pub error_sensible_heat_flux: f64,
    /// [W m-2ground]
    pub energy_balance: f64,
    pub is_forced_aerodynamic_resistance: bool,
    pub is_maximum_iteration_number_exceeded: bool,
    /// [K]
    pub source_temperature: f64,
    /// [h m-1]
    pub aerodynamic_resistance: f64,
    /// [W m-2ground]
    pub net_radiation: f64,
    /// [W m-2ground]
    pub available_energy: f64,
    /// [W m-2ground]
    pub sensible_heat_flux: f64,
    /// [W m-2ground] total evapotranspirative energy of the canopy
    pub evaporative_energy: f64,
    /// [W m-2ground]
    pub soil_heat_flux: f64,
    /// in the construction order of the crop (top leaf layer first, soil last)
    pub components: Vec<ComponentOutputs>,
}

impl SerdeAPI for SolverOutputs {}

impl SolverOutputs {
    /// [K] temperature of every component, in output order
    pub fn temperatures(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.temperature).collect()
    }
}
