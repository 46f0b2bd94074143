/// Outcome of a branch-and-bound run
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    /// Values for each variable (best incumbent when the search was cut short)
    pub values: Vec<f64>,
    /// Objective value of `values`
    pub objective_value: f64,
    /// Branch-and-bound nodes whose relaxation was solved
    pub nodes: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Search tree exhausted with an incumbent
    Optimal,
    /// Search tree exhausted without any integral point
    Infeasible,
    /// A relaxation had no finite optimum
    Unbounded,
    /// A node, iteration or time limit stopped the search before optimality was proven
    Unknown,
}

/// A row or variable domain that a candidate point fails
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint (or variable) name
    pub constraint: String,
    /// Right-hand side, or the nearest domain bound
    pub required: f64,
    /// Left-hand side evaluated at the point
    pub actual: f64,
    pub violation_amount: f64,
    /// e.g. `"cap exceeds maximum of 2.00 by 0.50"`
    pub description: String,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, nodes: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            nodes,
        }
    }

    pub fn infeasible(nodes: usize) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::INFINITY,
            nodes,
        }
    }

    pub fn unbounded(nodes: usize) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::NEG_INFINITY,
            nodes,
        }
    }

    /// Search stopped early; keeps the incumbent if one was found
    pub fn unknown(incumbent: Option<(Vec<f64>, f64)>, nodes: usize) -> Self {
        let (values, objective_value) = incumbent.unwrap_or((Vec::new(), f64::NAN));
        Self {
            status: SolutionStatus::Unknown,
            values,
            objective_value,
            nodes,
        }
    }
}
