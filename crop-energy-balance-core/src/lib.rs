#![allow(clippy::too_many_arguments)]

//! Crate containing a multi-source energy balance solver for crop canopies.
//!
//! A canopy is split into components (soil plus one or more leaf layers, each optionally
//! divided into sunlit and shaded leaves). The [solver](solver::Solver) resolves the
//! temperature of every component and partitions net radiation into sensible, latent and
//! soil heat fluxes, optionally correcting the aerodynamic resistance for atmospheric
//! stability.

#[macro_use]
pub mod macros;

pub mod component;
pub mod crop;
pub mod formalisms;
pub mod imports;
pub mod inputs;
pub mod params;
pub mod prelude;
pub mod solver;
pub mod solver_vec;
pub mod traits;
pub mod utils;
pub mod weather_data;
