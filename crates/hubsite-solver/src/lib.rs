mod branch;
mod problem;
mod simplex;
mod solution;

pub use branch::Solver;
pub use problem::{evaluate, Constraint, ConstraintOp, LpProblem, Objective, Term, Variable, VariableKind};
pub use solution::{ConstraintViolation, Solution, SolutionStatus};
