use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::problem::LpProblem;
use crate::simplex::{LpOutcome, Simplex};
use crate::solution::Solution;

/// Branch-and-bound solver for problems with binary and continuous variables.
///
/// Each node solves the simplex relaxation with some binaries pinned; the tree is
/// explored depth first, branching on the most fractional binary.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Minimum simplex pivot budget per phase at each node; scaled up with the tableau size
    max_iterations: usize,
    /// Tolerance for floating point comparisons inside the simplex
    tolerance: f64,
    /// Maximum number of nodes to explore
    max_nodes: usize,
    /// Distance from 0 or 1 under which a binary counts as integral
    integrality_tolerance: f64,
    /// Wall-clock budget for the whole search
    time_limit: Option<Duration>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            tolerance: 1e-9,
            max_nodes: 100_000,
            integrality_tolerance: 1e-6,
            time_limit: None,
        }
    }
}

struct Incumbent {
    values: Vec<f64>,
    objective_value: f64,
    /// Objective in minimization sense
    score: f64,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn solve(&self, problem: &LpProblem) -> Solution {
        let simplex = Simplex::new(self.max_iterations, self.tolerance);
        let binaries: Vec<usize> = problem.binary_variables().collect();
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };
        let started = Instant::now();

        let mut stack: Vec<Vec<(usize, f64)>> = vec![Vec::new()];
        let mut incumbent: Option<Incumbent> = None;
        let mut nodes = 0;
        let mut complete = true;

        while let Some(fixings) = stack.pop() {
            if nodes >= self.max_nodes || self.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                debug!(nodes, open = stack.len() + 1, "search limit reached");
                complete = false;
                break;
            }
            nodes += 1;

            let (values, objective_value) = match simplex.solve(problem, &fixings) {
                LpOutcome::Optimal {
                    values,
                    objective_value,
                } => (values, objective_value),
                LpOutcome::Infeasible => continue,
                LpOutcome::Unbounded => {
                    debug!(nodes, "relaxation unbounded");
                    return Solution::unbounded(nodes);
                }
                LpOutcome::IterationLimit => {
                    warn!(nodes, depth = fixings.len(), "simplex iteration limit hit; node dropped");
                    complete = false;
                    continue;
                }
            };

            let score = sense * objective_value;
            if let Some(best) = &incumbent {
                if score >= best.score - self.integrality_tolerance {
                    continue;
                }
            }

            match self.most_fractional(&binaries, &values) {
                Some((var, value)) => {
                    // Depth first: the nearer rounding is pushed last so it is explored first
                    let (far, near) = if value >= 0.5 { (0.0, 1.0) } else { (1.0, 0.0) };
                    for pin in [far, near] {
                        let mut child = fixings.clone();
                        child.push((var, pin));
                        stack.push(child);
                    }
                }
                None => {
                    let values = self.snap_binaries(&binaries, values);
                    let violations = problem.violations(&values, self.integrality_tolerance.max(1e-6));
                    if let Some(worst) = violations.first() {
                        warn!(nodes, constraint = %worst.constraint, "integral relaxation rejected: {}", worst.description);
                        complete = false;
                        continue;
                    }
                    debug!(nodes, objective_value, "new incumbent");
                    incumbent = Some(Incumbent {
                        values,
                        objective_value,
                        score,
                    });
                }
            }
        }

        debug!(nodes, complete, found = incumbent.is_some(), "branch-and-bound finished");

        match (incumbent, complete) {
            (Some(best), true) => Solution::optimal(best.values, best.objective_value, nodes),
            (None, true) => Solution::infeasible(nodes),
            (best, false) => Solution::unknown(best.map(|b| (b.values, b.objective_value)), nodes),
        }
    }

    /// Binary variable farthest from integrality, if any
    fn most_fractional(&self, binaries: &[usize], values: &[f64]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64, f64)> = None;
        for &j in binaries {
            let value = values[j];
            let distance = (value - value.round()).abs();
            if distance <= self.integrality_tolerance {
                continue;
            }
            if best.is_none_or(|(_, _, d)| distance > d) {
                best = Some((j, value, distance));
            }
        }
        best.map(|(j, value, _)| (j, value))
    }

    fn snap_binaries(&self, binaries: &[usize], mut values: Vec<f64>) -> Vec<f64> {
        for &j in binaries {
            values[j] = values[j].round();
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ConstraintOp, VariableKind};
    use crate::solution::SolutionStatus;

    #[test]
    fn test_knapsack() {
        // Maximize 5a + 4b + 3c subject to 2a + 3b + c <= 4, binaries
        // LP relaxation is fractional; optimum a=1, c=1, obj=8
        let mut problem = LpProblem::new();
        let a = problem.add_variable("a", VariableKind::Binary);
        let b = problem.add_variable("b", VariableKind::Binary);
        let c = problem.add_variable("c", VariableKind::Binary);
        problem.set_objective(vec![(a, 5.0), (b, 4.0), (c, 3.0)], false);
        problem.add_constraint("weight", vec![(a, 2.0), (b, 3.0), (c, 1.0)], ConstraintOp::Le, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.values, vec![1.0, 0.0, 1.0]);
        assert!((solution.objective_value - 8.0).abs() < 1e-6, "obj = {}", solution.objective_value);
    }

    #[test]
    fn test_mixed_binary_continuous() {
        // Minimize 10y + z subject to z >= 3 - 5y, z >= 0, y binary
        // y=0 -> 3, y=1 -> 10; optimum y=0, z=3
        let mut problem = LpProblem::new();
        let y = problem.add_variable("y", VariableKind::Binary);
        let z = problem.add_variable("z", VariableKind::Continuous);
        problem.set_objective(vec![(y, 10.0), (z, 1.0)], true);
        problem.add_constraint("cover", vec![(z, 1.0), (y, 5.0)], ConstraintOp::Ge, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!(solution.values[0].abs() < 1e-9);
        assert!((solution.values[1] - 3.0).abs() < 1e-6);
        assert!((solution.objective_value - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_integer_infeasible() {
        // a + b = 1.5 has no binary solution though its relaxation does
        let mut problem = LpProblem::new();
        let a = problem.add_variable("a", VariableKind::Binary);
        let b = problem.add_variable("b", VariableKind::Binary);
        problem.set_objective(vec![(a, 1.0), (b, 1.0)], true);
        problem.add_constraint("half", vec![(a, 1.0), (b, 1.0)], ConstraintOp::Eq, 1.5);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_node_limit_reports_unknown() {
        let mut problem = LpProblem::new();
        let a = problem.add_variable("a", VariableKind::Binary);
        let b = problem.add_variable("b", VariableKind::Binary);
        problem.set_objective(vec![(a, 1.0), (b, 1.0)], true);
        problem.add_constraint("half", vec![(a, 1.0), (b, 1.0)], ConstraintOp::Eq, 1.5);

        let solution = Solver::new().with_max_nodes(1).solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unknown);
        assert_eq!(solution.nodes, 1);
    }

    #[test]
    fn test_zero_time_limit_reports_unknown() {
        let mut problem = LpProblem::new();
        let a = problem.add_variable("a", VariableKind::Binary);
        problem.set_objective(vec![(a, 1.0)], true);

        let solution = Solver::new().with_time_limit(Duration::ZERO).solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unknown);
        assert_eq!(solution.nodes, 0);
    }
}
