use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::adapter::{RawAssignment, SolveStatus};
use crate::encoder::{EncodedProblem, ObjectiveMode};
use crate::instance::Instance;

/// Threshold above which a binary decision counts as taken
const DECISION_THRESHOLD: f64 = 0.5;

/// A raw assignment that breaks what an optimal solve guarantees
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractViolation {
    #[error("Solver returned status {0:?} where an optimal assignment was required")]
    UnexpectedStatus(SolveStatus),
    #[error("Expected {expected} variable values, found {found}")]
    ValueCount { expected: usize, found: usize },
    #[error("Variable {variable} has non-finite value {value}")]
    NonFiniteValue { variable: String, value: f64 },
    #[error("Expected {expected} selected centers, found {found}")]
    CenterCount { expected: usize, found: usize },
    #[error("Location {center} is selected as a center but is not eligible")]
    IneligibleCenter { center: usize },
    #[error("Location {location} is not served by any selected center")]
    Unassigned { location: usize },
    #[error("Solver reported objective {reported} but the assignment evaluates to {recomputed}")]
    ObjectiveMismatch { reported: f64, recomputed: f64 },
    #[error("Solver reported {bound} load {reported} but the assignment gives {recomputed}")]
    LoadMismatch {
        bound: LoadBound,
        reported: f64,
        recomputed: f64,
    },
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBound {
    Max,
    Min,
}

impl fmt::Display for LoadBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBound::Max => write!(f, "maximum"),
            LoadBound::Min => write!(f, "minimum"),
        }
    }
}

/// A verified assignment of every location to one of exactly `k` eligible centers
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSolution {
    pub mode: ObjectiveMode,
    /// Selected centers, ascending
    pub centers: Vec<usize>,
    /// `assignment[location]` is the serving center
    pub assignment: Vec<usize>,
    /// Objective recomputed from the assignment (total weighted distance or load spread)
    pub objective_value: f64,
    pub total_weighted_distance: f64,
    /// One entry per selected center, in `centers` order
    pub center_loads: Vec<CenterLoad>,
    /// Load of every location as a candidate center; zero unless selected
    pub candidate_loads: Vec<f64>,
    pub extremes: Extremes,
    /// Present in balance mode only; carries the backend's own bound values
    pub balance: Option<LoadBalance>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CenterLoad {
    pub center: usize,
    /// Sum of distance × demand over the locations it serves
    pub load: f64,
    /// Served locations, ascending; includes the center itself
    pub served: Vec<usize>,
}

/// A single (center, location) pair and the measured value
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentExtreme {
    pub center: usize,
    pub location: usize,
    pub value: f64,
}

/// Longest and shortest assignments, ignoring centers serving themselves
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extremes {
    pub max_distance: Option<AssignmentExtreme>,
    pub min_distance: Option<AssignmentExtreme>,
    pub max_weighted: Option<AssignmentExtreme>,
    pub min_weighted: Option<AssignmentExtreme>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadBalance {
    pub max_load: f64,
    pub min_load: f64,
    /// `max_load - min_load`
    pub spread: f64,
}

impl AssignmentSolution {
    /// Center serving `location`
    pub fn center_of(&self, location: usize) -> usize {
        self.assignment[location]
    }

    pub fn load_of(&self, center: usize) -> Option<&CenterLoad> {
        self.center_loads.iter().find(|c| c.center == center)
    }
}

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
}

/// Turn an optimal raw assignment into a verified solution.
///
/// Binary values are thresholded at 0.5. Every figure is recomputed from the
/// thresholded decisions and the instance's distances; the backend's own
/// objective and load variables are only compared against, within `tolerance`
/// (relative to `max(1, |value|)`).
pub fn extract(
    instance: &Instance,
    problem: &EncodedProblem,
    raw: &RawAssignment,
    tolerance: f64,
) -> Result<AssignmentSolution, ContractViolation> {
    if raw.status != SolveStatus::Optimal {
        return Err(ContractViolation::UnexpectedStatus(raw.status));
    }

    let layout = problem.layout();
    let model = problem.model();
    if raw.values.len() != layout.len() {
        return Err(ContractViolation::ValueCount {
            expected: layout.len(),
            found: raw.values.len(),
        });
    }
    if let Some(j) = raw.values.iter().position(|v| !v.is_finite()) {
        return Err(ContractViolation::NonFiniteValue {
            variable: model.variables[j].name.clone(),
            value: raw.values[j],
        });
    }

    let n = instance.len();
    let decided = |index: usize| raw.values[index] > DECISION_THRESHOLD;

    let centers: Vec<usize> = (0..n).filter(|&i| decided(layout.selection(i))).collect();
    if centers.len() != problem.centers() {
        return Err(ContractViolation::CenterCount {
            expected: problem.centers(),
            found: centers.len(),
        });
    }
    if let Some(&center) = centers.iter().find(|&&c| !instance.location(c).eligible) {
        return Err(ContractViolation::IneligibleCenter { center });
    }

    let mut assignment = Vec::with_capacity(n);
    for location in 0..n {
        let mut claims = centers.iter().filter(|&&c| decided(layout.assignment(c, location)));
        let Some(&center) = claims.next() else {
            return Err(ContractViolation::Unassigned { location });
        };
        let extra = claims.count();
        if extra > 0 {
            warn!(
                instance = instance.name(),
                location,
                center,
                claims = extra + 1,
                "location claimed by several centers; keeping the lowest index"
            );
        }
        assignment.push(center);
    }

    let mut candidate_loads = vec![0.0; n];
    for (location, &center) in assignment.iter().enumerate() {
        if center != location {
            candidate_loads[center] += instance.weighted_distance(center, location);
        }
    }
    let total_weighted_distance: f64 = candidate_loads.iter().sum();

    let center_loads: Vec<CenterLoad> = centers
        .iter()
        .map(|&center| CenterLoad {
            center,
            load: candidate_loads[center],
            served: (0..n).filter(|&l| assignment[l] == center).collect(),
        })
        .collect();

    let extremes = find_extremes(instance, &center_loads);

    let (objective_value, balance) = match problem.mode() {
        ObjectiveMode::MinTotalWeightedDistance => (total_weighted_distance, None),
        ObjectiveMode::MinMaxBalance => {
            let balance = check_balance(problem, raw, &candidate_loads, tolerance)?;
            (load_spread(&candidate_loads), Some(balance))
        }
    };

    if let Some(reported) = raw.objective_value {
        if !within(reported, objective_value, tolerance) {
            return Err(ContractViolation::ObjectiveMismatch {
                reported,
                recomputed: objective_value,
            });
        }
    }

    Ok(AssignmentSolution {
        mode: problem.mode(),
        centers,
        assignment,
        objective_value,
        total_weighted_distance,
        center_loads,
        candidate_loads,
        extremes,
        balance,
    })
}

/// Scan centers ascending, then their served locations ascending; first occurrence wins ties
fn find_extremes(instance: &Instance, center_loads: &[CenterLoad]) -> Extremes {
    let mut extremes = Extremes::default();

    let pairs = center_loads
        .iter()
        .flat_map(|c| c.served.iter().map(move |&l| (c.center, l)))
        .filter(|&(center, location)| center != location);

    for (center, location) in pairs {
        let distance = instance.distances().get(center, location);
        let weighted = instance.weighted_distance(center, location);
        let at = |value| AssignmentExtreme {
            center,
            location,
            value,
        };

        if extremes.max_distance.is_none_or(|e| distance > e.value) {
            extremes.max_distance = Some(at(distance));
        }
        if extremes.min_distance.is_none_or(|e| distance < e.value) {
            extremes.min_distance = Some(at(distance));
        }
        if extremes.max_weighted.is_none_or(|e| weighted > e.value) {
            extremes.max_weighted = Some(at(weighted));
        }
        if extremes.min_weighted.is_none_or(|e| weighted < e.value) {
            extremes.min_weighted = Some(at(weighted));
        }
    }

    extremes
}

/// Largest minus smallest candidate load
fn load_spread(candidate_loads: &[f64]) -> f64 {
    let max = candidate_loads.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = candidate_loads.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// Compare the backend's max/min load variables with the loads implied by the assignment
fn check_balance(
    problem: &EncodedProblem,
    raw: &RawAssignment,
    candidate_loads: &[f64],
    tolerance: f64,
) -> Result<LoadBalance, ContractViolation> {
    let layout = problem.layout();
    let (Some(max_index), Some(min_index)) = (layout.max_load(), layout.min_load()) else {
        return Err(ContractViolation::ValueCount {
            expected: layout.len() + 2,
            found: raw.values.len(),
        });
    };

    let recomputed_max = candidate_loads.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let recomputed_min = candidate_loads.iter().copied().fold(f64::INFINITY, f64::min);
    let max_load = raw.values[max_index];
    let min_load = raw.values[min_index];

    if !within(max_load, recomputed_max, tolerance) {
        return Err(ContractViolation::LoadMismatch {
            bound: LoadBound::Max,
            reported: max_load,
            recomputed: recomputed_max,
        });
    }
    if !within(min_load, recomputed_min, tolerance) {
        return Err(ContractViolation::LoadMismatch {
            bound: LoadBound::Min,
            reported: min_load,
            recomputed: recomputed_min,
        });
    }

    Ok(LoadBalance {
        max_load,
        min_load,
        spread: max_load - min_load,
    })
}
