use crate::solution::ConstraintViolation;

/// A sparse linear term: (variable index, coefficient)
pub type Term = (usize, f64);

/// Represents a mixed binary/continuous linear programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    /// Decision variables, addressed by position
    pub variables: Vec<Variable>,
    /// Objective function
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Takes the value 0 or 1
    Binary,
    /// Any non-negative real
    Continuous,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// Non-zero coefficients
    pub terms: Vec<Term>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            minimize: true,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Non-zero coefficients
    pub terms: Vec<Term>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    /// The operator obtained by multiplying both sides by -1
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        }
    }
}

impl LpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable and return its index
    pub fn add_variable(&mut self, name: impl Into<String>, kind: VariableKind) -> usize {
        self.variables.push(Variable {
            name: name.into(),
            kind,
        });
        self.variables.len() - 1
    }

    pub fn set_objective(&mut self, terms: Vec<Term>, minimize: bool) {
        self.objective = Objective { terms, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, terms: Vec<Term>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Indices of all binary variables, ascending
    pub fn binary_variables(&self) -> impl Iterator<Item = usize> + '_ {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == VariableKind::Binary)
            .map(|(j, _)| j)
    }

    /// Objective value of an assignment
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        evaluate(&self.objective.terms, values)
    }

    /// Constraints (and variable domains) broken by `values`, worst first
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for (j, var) in self.variables.iter().enumerate() {
            let value = values.get(j).copied().unwrap_or(0.0);
            let out_of_domain = match var.kind {
                VariableKind::Binary => value < -tolerance || value > 1.0 + tolerance,
                VariableKind::Continuous => value < -tolerance,
            };
            if out_of_domain {
                let (required, amount) = if value < 0.0 { (0.0, -value) } else { (1.0, value - 1.0) };
                violations.push(ConstraintViolation {
                    constraint: var.name.clone(),
                    required,
                    actual: value,
                    violation_amount: amount,
                    description: format!("{} = {:.4} is outside its domain", var.name, value),
                });
            }
        }

        for c in &self.constraints {
            let lhs = evaluate(&c.terms, values);

            let violated = match c.op {
                ConstraintOp::Le if lhs > c.rhs + tolerance => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - tolerance => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > tolerance => {
                    let amt = (lhs - c.rhs).abs();
                    Some((amt, format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs)))
                }
                _ => None,
            };

            if let Some((violation_amount, description)) = violated {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Sort by violation amount (worst first)
        violations.sort_by(|a, b| {
            b.violation_amount
                .partial_cmp(&a.violation_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        violations
    }
}

/// Evaluate a sparse linear expression; indices past the end of `values` read as zero
pub fn evaluate(terms: &[Term], values: &[f64]) -> f64 {
    terms
        .iter()
        .map(|&(j, coef)| coef * values.get(j).copied().unwrap_or(0.0))
        .sum()
}
