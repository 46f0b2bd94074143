use std::path::Path;

use thiserror::Error;
use tracing::{info, info_span};

use crate::adapter::{SolveStatus, SolverAdapter};
use crate::encoder::{encode, EncodingError, ObjectiveMode};
use crate::extract::{extract, AssignmentSolution, ContractViolation};
use crate::instance::Instance;
use crate::parser::{ParseError, Parser};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Solver contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Encoding,
    ContractViolation,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Parse(_) => ErrorKind::Parse,
            PipelineError::Encoding(_) => ErrorKind::Encoding,
            PipelineError::ContractViolation(_) => ErrorKind::ContractViolation,
        }
    }
}

/// How a well-formed instance ended
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Solved(AssignmentSolution),
    /// The backend proved no assignment exists
    Infeasible,
    /// The backend gave no verdict (limit, timeout, unavailable)
    Unknown,
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&AssignmentSolution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Solved(_) => SolveStatus::Optimal,
            SolveOutcome::Infeasible => SolveStatus::Infeasible,
            SolveOutcome::Unknown => SolveStatus::Unknown,
        }
    }
}

/// Encode, solve and extract one instance at a time
#[derive(Debug, Clone)]
pub struct Pipeline<A> {
    adapter: A,
    mode: ObjectiveMode,
    /// Relative tolerance for cross-checking the backend
    tolerance: f64,
}

impl<A: SolverAdapter> Pipeline<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            mode: ObjectiveMode::default(),
            tolerance: 1e-6,
        }
    }

    pub fn with_mode(mut self, mode: ObjectiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn mode(&self) -> ObjectiveMode {
        self.mode
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn solve(&self, instance: &Instance) -> Result<SolveOutcome, PipelineError> {
        let _span = info_span!("solve", instance = instance.name(), mode = ?self.mode).entered();

        let problem = encode(instance, self.mode)?;
        let raw = self.adapter.solve(&problem);

        let outcome = match raw.status {
            SolveStatus::Optimal => SolveOutcome::Solved(extract(instance, &problem, &raw, self.tolerance)?),
            SolveStatus::Infeasible => SolveOutcome::Infeasible,
            SolveStatus::Unknown => SolveOutcome::Unknown,
            // Both objectives are bounded below by zero
            SolveStatus::Unbounded => {
                return Err(ContractViolation::UnexpectedStatus(SolveStatus::Unbounded).into());
            }
        };

        match &outcome {
            SolveOutcome::Solved(solution) => info!(
                centers = ?solution.centers,
                objective = solution.objective_value,
                "solved"
            ),
            other => info!(status = ?other.status(), "no solution"),
        }
        Ok(outcome)
    }

    /// Parse instance text, then solve it
    pub fn solve_source(&self, name: &str, source: &str) -> Result<SolveOutcome, PipelineError> {
        let instance = Parser::parse(source)?.into_instance(name)?;
        self.solve(&instance)
    }

    /// Read and parse an instance file, then solve it
    pub fn solve_file(&self, path: impl AsRef<Path>) -> Result<SolveOutcome, PipelineError> {
        let path = path.as_ref();
        let instance = Parser::parse_file(path)?.into_instance(path.display().to_string())?;
        self.solve(&instance)
    }
}
