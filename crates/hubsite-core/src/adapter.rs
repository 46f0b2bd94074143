//! The boundary between the encoder/extractor and whatever performs the search.

use hubsite_solver::{Solver, SolutionStatus};
use tracing::debug;

use crate::encoder::EncodedProblem;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// No verdict: limits, timeouts or an unavailable backend
    Unknown,
}

/// What a backend hands back for an encoded problem
#[derive(Debug, Clone, PartialEq)]
pub struct RawAssignment {
    pub status: SolveStatus,
    /// One value per variable of the encoded model; may be empty unless `Optimal`
    pub values: Vec<f64>,
    /// Objective the backend claims for `values`, if it reports one
    pub objective_value: Option<f64>,
}

impl RawAssignment {
    pub fn optimal(values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values,
            objective_value: Some(objective_value),
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            values: Vec::new(),
            objective_value: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            status: SolveStatus::Unknown,
            values: Vec::new(),
            objective_value: None,
        }
    }
}

/// A blocking minimization oracle.
///
/// When `status` is `Optimal` the returned values must satisfy every constraint of
/// `problem.model()`; the extractor verifies the parts it relies on.
pub trait SolverAdapter {
    fn solve(&self, problem: &EncodedProblem) -> RawAssignment;
}

impl<A: SolverAdapter + ?Sized> SolverAdapter for &A {
    fn solve(&self, problem: &EncodedProblem) -> RawAssignment {
        (**self).solve(problem)
    }
}

impl<A: SolverAdapter + ?Sized> SolverAdapter for Box<A> {
    fn solve(&self, problem: &EncodedProblem) -> RawAssignment {
        (**self).solve(problem)
    }
}

/// The bundled branch-and-bound backend
impl SolverAdapter for Solver {
    fn solve(&self, problem: &EncodedProblem) -> RawAssignment {
        let solution = Solver::solve(self, problem.model());
        debug!(status = ?solution.status, nodes = solution.nodes, "branch-and-bound returned");

        let status = match solution.status {
            SolutionStatus::Optimal => SolveStatus::Optimal,
            SolutionStatus::Infeasible => SolveStatus::Infeasible,
            SolutionStatus::Unbounded => SolveStatus::Unbounded,
            SolutionStatus::Unknown => SolveStatus::Unknown,
        };
        let objective_value = solution.objective_value.is_finite().then_some(solution.objective_value);

        RawAssignment {
            status,
            values: solution.values,
            objective_value,
        }
    }
}
