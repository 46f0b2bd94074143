use crate::problem::{ConstraintOp, LpProblem, Term, VariableKind};

/// Residual above which an artificial variable left in the basis proves infeasibility
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Pivots allowed per phase for each tableau row and column
const PIVOTS_PER_DIMENSION: usize = 1_000;

/// Two-phase tableau simplex for the continuous relaxation of an `LpProblem`.
///
/// Binary variables are relaxed to `0 <= v <= 1`; every variable is non-negative.
/// Extra `fixings` pin individual variables to a value, which is how branch-and-bound
/// describes a node.
#[derive(Debug, Clone)]
pub(crate) struct Simplex {
    /// Minimum pivot budget per phase; large tableaus get more
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

#[derive(Debug, Clone)]
pub(crate) enum LpOutcome {
    Optimal { values: Vec<f64>, objective_value: f64 },
    Infeasible,
    Unbounded,
    IterationLimit,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

struct Row {
    coefficients: Vec<f64>,
    op: ConstraintOp,
    rhs: f64,
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn rhs_col(&self) -> usize {
        self.data[0].len() - 1
    }

    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    fn artificial_start(&self) -> usize {
        self.n_vars + self.n_slack
    }
}

impl Simplex {
    pub(crate) fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    pub(crate) fn solve(&self, problem: &LpProblem, fixings: &[(usize, f64)]) -> LpOutcome {
        let rows = self.collect_rows(problem, fixings);
        let mut tableau = self.build_tableau(problem, &rows);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau) {
                Some(true) => {}
                Some(false) => return LpOutcome::Infeasible,
                None => return LpOutcome::IterationLimit,
            }
        }
        self.load_objective(&mut tableau, problem);

        // Phase 2: Optimize
        match self.phase2(&mut tableau) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return LpOutcome::Unbounded,
            SimplexResult::IterationLimit => return LpOutcome::IterationLimit,
        }

        let values = self.extract_values(&tableau);
        let objective_value = problem.objective_value(&values);
        LpOutcome::Optimal {
            values,
            objective_value,
        }
    }

    /// Problem constraints, binary upper bounds and node fixings as dense rows with rhs >= 0
    fn collect_rows(&self, problem: &LpProblem, fixings: &[(usize, f64)]) -> Vec<Row> {
        let n_vars = problem.num_variables();
        let dense = |terms: &[Term]| {
            let mut coefficients = vec![0.0; n_vars];
            for &(j, coef) in terms {
                if j < n_vars {
                    coefficients[j] += coef;
                }
            }
            coefficients
        };
        let unit = |j: usize| {
            let mut coefficients = vec![0.0; n_vars];
            coefficients[j] = 1.0;
            coefficients
        };

        let mut rows: Vec<Row> = problem
            .constraints
            .iter()
            .map(|c| Row {
                coefficients: dense(&c.terms),
                op: c.op,
                rhs: c.rhs,
            })
            .collect();

        for (j, var) in problem.variables.iter().enumerate() {
            if var.kind == VariableKind::Binary {
                rows.push(Row {
                    coefficients: unit(j),
                    op: ConstraintOp::Le,
                    rhs: 1.0,
                });
            }
        }

        // x = 0 only needs an upper bound and x = 1 only a lower one, since 0 <= x <= 1 already holds
        for &(j, value) in fixings {
            if j >= n_vars {
                continue;
            }
            let op = if value <= 0.0 { ConstraintOp::Le } else { ConstraintOp::Ge };
            rows.push(Row {
                coefficients: unit(j),
                op,
                rhs: value.max(0.0),
            });
        }

        for row in &mut rows {
            if row.rhs < 0.0 {
                row.rhs = -row.rhs;
                row.op = row.op.flipped();
                for coef in &mut row.coefficients {
                    *coef = -*coef;
                }
            }
        }

        rows
    }

    fn build_tableau(&self, problem: &LpProblem, rows: &[Row]) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = rows.len();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for row in rows {
            match row.op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, row) in rows.iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&row.coefficients);
            tableau.data[i][total_cols - 1] = row.rhs;

            match row.op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        tableau
    }

    /// Minimize the sum of artificials. `None` when the iteration limit is hit,
    /// otherwise whether a feasible basis was found.
    fn phase1(&self, tableau: &mut Tableau) -> Option<bool> {
        let obj_row = tableau.obj_row();
        let n_cols = tableau.data[0].len();
        let art_start = tableau.artificial_start();
        let art_end = art_start + tableau.n_artificial;

        // Maximize -sum(artificials); the row stores reduced costs, positive = improving
        tableau.data[obj_row].iter_mut().for_each(|v| *v = 0.0);
        for j in art_start..art_end {
            tableau.data[obj_row][j] = -1.0;
        }
        for i in 0..obj_row {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, art_end) {
            SimplexResult::Optimal => {}
            // Phase 1 is bounded below by zero
            SimplexResult::Unbounded => return Some(false),
            SimplexResult::IterationLimit => return None,
        }

        let rhs_col = tableau.rhs_col();
        for i in 0..obj_row {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > FEASIBILITY_TOLERANCE {
                return Some(false);
            }
        }

        // Artificials still basic sit at zero; swap them for any structural column in their row
        for i in 0..obj_row {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let replacement = (0..art_start)
                .filter(|&j| tableau.data[i][j].abs() > self.tolerance)
                .max_by(|&a, &b| {
                    tableau.data[i][a]
                        .abs()
                        .partial_cmp(&tableau.data[i][b].abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(col) = replacement {
                self.pivot(tableau, i, col);
            }
        }

        Some(true)
    }

    /// Install the real objective and price out the current basis
    fn load_objective(&self, tableau: &mut Tableau, problem: &LpProblem) {
        let obj_row = tableau.obj_row();
        let n_cols = tableau.data[0].len();

        // Simplex maximizes, so for minimization we negate the coefficients
        let mut row = vec![0.0; n_cols];
        for &(j, coef) in &problem.objective.terms {
            if j < tableau.n_vars {
                row[j] += if problem.objective.minimize { -coef } else { coef };
            }
        }
        tableau.data[obj_row] = row;

        for i in 0..obj_row {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[obj_row][basic];
            if ratio != 0.0 {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }
    }

    fn phase2(&self, tableau: &mut Tableau) -> SimplexResult {
        // Artificial columns never re-enter
        let exclude_from = tableau.artificial_start();
        self.iterate(tableau, exclude_from)
    }

    fn iterate(&self, tableau: &mut Tableau, exclude_from: usize) -> SimplexResult {
        for _ in 0..self.iteration_limit(tableau) {
            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };
            self.pivot(tableau, pivot_row, pivot_col);
        }
        SimplexResult::IterationLimit
    }

    /// Pivot budget per phase: the configured floor or a multiple of the tableau size
    fn iteration_limit(&self, tableau: &Tableau) -> usize {
        let dimensions = tableau.data.len() + tableau.rhs_col();
        self.max_iterations.max(PIVOTS_PER_DIMENSION.saturating_mul(dimensions))
    }

        /// Bland's rule: lowest-index column with a positive reduced cost
    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize) -> Option<usize> {
        let obj_row = tableau.obj_row();
        (0..exclude_from).find(|&j| tableau.data[obj_row][j] > self.tolerance)
    }

    /// Minimum ratio test, ties broken by the lowest basic variable index
    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs_col = tableau.rhs_col();

        let mut best: Option<(usize, f64)> = None;
        for i in 0..tableau.obj_row() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = (tableau.data[i][rhs_col] / val).max(0.0);
            best = match best {
                None => Some((i, ratio)),
                Some((row, min_ratio)) => {
                    if ratio < min_ratio - self.tolerance
                        || (ratio <= min_ratio + self.tolerance && tableau.basic_vars[i] < tableau.basic_vars[row])
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, min_ratio))
                    }
                }
            };
        }

        best.map(|(row, _)| row)
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i == row {
                continue;
            }
            let factor = tableau.data[i][col];
            if factor == 0.0 {
                continue;
            }
            for (cell, &p) in tableau.data[i].iter_mut().zip(&pivot_row) {
                *cell -= factor * p;
            }
        }
    }

    fn extract_values(&self, tableau: &Tableau) -> Vec<f64> {
        let rhs_col = tableau.rhs_col();
        let mut values = vec![0.0; tableau.n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < tableau.n_vars {
                values[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::LpProblem;

    fn simplex() -> Simplex {
        Simplex::new(10_000, 1e-9)
    }

    fn optimal(outcome: LpOutcome) -> (Vec<f64>, f64) {
        match outcome {
            LpOutcome::Optimal {
                values,
                objective_value,
            } => (values, objective_value),
            other => panic!("expected optimal, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        let y = problem.add_variable("y", VariableKind::Continuous);
        problem.set_objective(vec![(x, 3.0), (y, 2.0)], false);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![(y, 1.0)], ConstraintOp::Le, 3.0);

        let (values, obj) = optimal(simplex().solve(&problem, &[]));

        assert!((values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", values[1]);
        assert!((obj - 11.0).abs() < 1e-6, "obj = {} (expected 11)", obj);
    }

    #[test]
    fn test_iteration_budget_scales_with_tableau() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        let y = problem.add_variable("y", VariableKind::Continuous);
        problem.set_objective(vec![(x, 3.0), (y, 2.0)], false);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);

        // A zero floor still leaves a budget proportional to the tableau
        let simplex = Simplex::new(0, 1e-9);
        let tableau = simplex.build_tableau(&problem, &simplex.collect_rows(&problem, &[]));
        assert_eq!(simplex.iteration_limit(&tableau), PIVOTS_PER_DIMENSION * (3 + 4));

        let (_, obj) = optimal(simplex.solve(&problem, &[]));
        assert!((obj - 11.0).abs() < 1e-6, "obj = {}", obj);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        let y = problem.add_variable("y", VariableKind::Continuous);
        problem.set_objective(vec![(x, 2.0), (y, 3.0)], true);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![(y, 1.0)], ConstraintOp::Le, 3.0);

        let (values, obj) = optimal(simplex().solve(&problem, &[]));

        assert!((values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", values[0]);
        assert!((values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", values[1]);
        assert!((obj - 9.0).abs() < 1e-6, "obj = {} (expected 9)", obj);
    }

    #[test]
    fn test_negative_rhs_is_normalized() {
        // Minimize x subject to -x <= -2  (x >= 2)
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        problem.set_objective(vec![(x, 1.0)], true);
        problem.add_constraint("lower", vec![(x, -1.0)], ConstraintOp::Le, -2.0);

        let (values, obj) = optimal(simplex().solve(&problem, &[]));
        assert!((values[0] - 2.0).abs() < 1e-6);
        assert!((obj - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_binary_relaxation_and_fixings() {
        // Maximize x + y with binaries relaxed to [0, 1]
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Binary);
        let y = problem.add_variable("y", VariableKind::Binary);
        problem.set_objective(vec![(x, 1.0), (y, 1.0)], false);

        let (values, obj) = optimal(simplex().solve(&problem, &[]));
        assert!((obj - 2.0).abs() < 1e-6, "obj = {}", obj);
        assert!((values[0] - 1.0).abs() < 1e-6);

        let (values, obj) = optimal(simplex().solve(&problem, &[(y, 0.0)]));
        assert!((obj - 1.0).abs() < 1e-6, "obj = {}", obj);
        assert!(values[1].abs() < 1e-6);
    }

    #[test]
    fn test_redundant_equalities() {
        // Duplicate equality rows leave an artificial basic at zero after phase 1
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        let y = problem.add_variable("y", VariableKind::Continuous);
        problem.set_objective(vec![(x, 1.0), (y, 2.0)], true);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Eq, 2.0);
        problem.add_constraint("sum_again", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Eq, 2.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 1.5);

        let (values, obj) = optimal(simplex().solve(&problem, &[]));
        assert!((values[0] - 1.5).abs() < 1e-6, "x = {}", values[0]);
        assert!((values[1] - 0.5).abs() < 1e-6, "y = {}", values[1]);
        assert!((obj - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        problem.set_objective(vec![(x, 1.0)], true);
        problem.add_constraint("lower", vec![(x, 1.0)], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![(x, 1.0)], ConstraintOp::Le, 3.0);

        assert!(matches!(simplex().solve(&problem, &[]), LpOutcome::Infeasible));
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", VariableKind::Continuous);
        problem.set_objective(vec![(x, 1.0)], false);
        problem.add_constraint("lower", vec![(x, 1.0)], ConstraintOp::Ge, 1.0);

        assert!(matches!(simplex().solve(&problem, &[]), LpOutcome::Unbounded));
    }
}
