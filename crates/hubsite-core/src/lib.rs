pub mod adapter;
pub mod batch;
pub mod distance;
pub mod encoder;
pub mod extract;
pub mod instance;
pub mod parser;
pub mod pipeline;

pub use adapter::{RawAssignment, SolveStatus, SolverAdapter};
pub use batch::{run_batch, run_batch_files, BatchEntry, BatchSummary};
pub use distance::DistanceMatrix;
pub use encoder::{encode, validate, EncodedProblem, EncodingError, ObjectiveMode, VariableLayout};
pub use extract::{
    extract, AssignmentExtreme, AssignmentSolution, CenterLoad, ContractViolation, Extremes, LoadBalance, LoadBound,
};
pub use instance::{Instance, Location};
pub use parser::{InstanceFile, ParseError, Parser};
pub use pipeline::{ErrorKind, Pipeline, PipelineError, SolveOutcome};
