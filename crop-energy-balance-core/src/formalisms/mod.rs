//! Pure physical formulas called by canopy components and the solver.
//!
//! Units follow the conventions of the whole crate: temperatures in K (unless stated in °C),
//! wind speeds in m h-1, resistances in h m-1, conductances in m h-1, energy flux densities in
//! W m-2ground and pressures in kPa.

pub mod canopy;
pub mod component;
pub mod irradiance;
pub mod leaf;
pub mod lumped_leaves;
pub mod soil;
pub mod sunlit_shaded_leaves;
pub mod weather;
