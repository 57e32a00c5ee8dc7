//! Convenience module for exposing the most commonly used structs

pub use crate::component::{Component, ComponentKind, CropComponent};
pub use crate::crop::{CanopyStateVariables, Crop};
pub use crate::inputs::{AbsorbedIrradiance, IncidentIrradiance, Inputs};
pub use crate::params::{Constants, LeavesCategory, NumericalResolution, Params, Simulation};
pub use crate::solver::{ConvergenceStatus, Solver, SolverOutputs};
pub use crate::solver_vec::SolverVec;
pub use crate::traits::*;
pub use crate::weather_data::{WeatherData, WeatherRecord};
