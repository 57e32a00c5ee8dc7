//! Module containing a batch of independent solvers (one per timestep or scenario) with
//! parallel and serial iteration methods
use crate::imports::*;
use crate::solver::{Solver, SolverOutputs};
use rayon::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SolverVec(pub Vec<Solver>);

impl SolverVec {
    /// Calls `run` for each solver in vec.
    /// # Arguments:
    /// * correct_stability: whether to correct aerodynamic resistance for atmospheric stability
    /// * parallelize: whether to parallelize `run` calls, defaults to `true`
    pub fn run(&mut self, correct_stability: bool, parallelize: Option<bool>) -> anyhow::Result<()> {
        let parallelize = parallelize.unwrap_or(true);
        if parallelize {
            self.0.par_iter_mut().enumerate().try_for_each(|(i, solver)| {
                solver
                    .run(correct_stability)
                    .with_context(|| format!("solver idx: {}", i))
            })?;
        } else {
            self.0.iter_mut().enumerate().try_for_each(|(i, solver)| {
                solver
                    .run(correct_stability)
                    .with_context(|| format!("solver idx: {}", i))
            })?;
        }
        Ok(())
    }

    /// Collects the outputs of every solver, in vec order
    pub fn outputs(&self) -> anyhow::Result<Vec<SolverOutputs>> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, solver)| solver.outputs().with_context(|| format!("solver idx: {}", i)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, solver: Solver) {
        self.0.push(solver);
    }

    pub fn pop(&mut self) -> Option<Solver> {
        self.0.pop()
    }

    pub fn remove(&mut self, idx: usize) {
        self.0.remove(idx);
    }

    pub fn insert(&mut self, idx: usize, solver: Solver) {
        self.0.insert(idx, solver);
    }
}

impl FromIterator<Solver> for SolverVec {
    fn from_iter<I: IntoIterator<Item = Solver>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl SerdeAPI for SolverVec {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::tests::big_leaf_inputs;
    use crate::params::{Constants, Params};

    fn solvers() -> SolverVec {
        (0..4)
            .map(|hour| {
                let mut inputs = big_leaf_inputs();
                inputs.air_temperature += hour as f64;
                Solver::new(inputs, Params::default(), Constants::default()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_parallel_and_serial_runs_agree() {
        let mut parallel = solvers();
        parallel.run(false, None).unwrap();
        let mut serial = solvers();
        serial.run(false, Some(false)).unwrap();
        let parallel_outputs = parallel.outputs().unwrap();
        let serial_outputs = serial.outputs().unwrap();
        assert_eq!(parallel_outputs.len(), 4);
        for (p, s) in parallel_outputs.iter().zip(serial_outputs.iter()) {
            assert!(p.temperatures().approx_eq(&s.temperatures(), 1e-12));
            assert_eq!(p.status, s.status);
        }
    }

    #[test]
    fn test_outputs_name_the_solver_not_run() {
        let mut solvers = solvers();
        solvers.0[..2]
            .iter_mut()
            .for_each(|solver| solver.run(false).unwrap());
        let err = solvers.outputs().unwrap_err();
        assert!(format!("{:?}", err).contains("solver idx: 2"));
    }

    #[test]
    fn test_vec_helpers() {
        let mut solvers = solvers();
        assert_eq!(solvers.len(), 4);
        let last = solvers.pop().unwrap();
        solvers.insert(0, last.clone());
        assert_eq!(solvers.0[0], last);
        solvers.remove(0);
        solvers.push(last);
        assert_eq!(solvers.len(), 4);
        assert!(!solvers.is_empty());
        assert!(SolverVec::default().is_empty());
    }
}
