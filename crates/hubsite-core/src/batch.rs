//! Run many instances through one pipeline, isolating failures per instance.

use std::path::Path;

use tracing::{info, warn};

use crate::adapter::SolverAdapter;
use crate::pipeline::{Pipeline, PipelineError, SolveOutcome};

/// Result for one instance of a batch, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub name: String,
    pub result: Result<SolveOutcome, PipelineError>,
}

impl BatchEntry {
    pub fn is_solved(&self) -> bool {
        matches!(self.result, Ok(SolveOutcome::Solved(_)))
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub solved: usize,
    pub infeasible: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match &entry.result {
                Ok(SolveOutcome::Solved(_)) => summary.solved += 1,
                Ok(SolveOutcome::Infeasible) => summary.infeasible += 1,
                Ok(SolveOutcome::Unknown) => summary.unknown += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.solved + self.infeasible + self.unknown + self.failed
    }
}

/// Solve `(name, source text)` pairs; a failing instance never stops the rest
pub fn run_batch<'a, A, I>(pipeline: &Pipeline<A>, sources: I) -> Vec<BatchEntry>
where
    A: SolverAdapter,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let entries: Vec<BatchEntry> = sources
        .into_iter()
        .map(|(name, source)| record(name.to_string(), pipeline.solve_source(name, source)))
        .collect();
    log_summary(&entries);
    entries
}

/// Solve instance files; unreadable files are reported as parse failures
pub fn run_batch_files<A, I, P>(pipeline: &Pipeline<A>, paths: I) -> Vec<BatchEntry>
where
    A: SolverAdapter,
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let entries: Vec<BatchEntry> = paths
        .into_iter()
        .map(|path| {
            let path = path.as_ref();
            record(path.display().to_string(), pipeline.solve_file(path))
        })
        .collect();
    log_summary(&entries);
    entries
}

fn record(name: String, result: Result<SolveOutcome, PipelineError>) -> BatchEntry {
    if let Err(e) = &result {
        warn!(instance = %name, kind = ?e.kind(), "{}", e);
    }
    BatchEntry { name, result }
}

fn log_summary(entries: &[BatchEntry]) {
    let summary = BatchSummary::from_entries(entries);
    info!(
        solved = summary.solved,
        infeasible = summary.infeasible,
        unknown = summary.unknown,
        failed = summary.failed,
        "batch finished"
    );
}
