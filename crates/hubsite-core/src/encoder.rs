use hubsite_solver::{ConstraintOp, LpProblem, Term, VariableKind};
use thiserror::Error;
use tracing::debug;

use crate::instance::Instance;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Instance has no locations")]
    NoLocations,
    #[error("At least one center is required")]
    ZeroCenters,
    #[error("Requested {requested} centers but only {eligible} locations are eligible")]
    TooManyCenters { requested: usize, eligible: usize },
    #[error("Location {index} has negative demand {demand}")]
    NegativeDemand { index: usize, demand: f64 },
    #[error("Location {index} has a non-finite demand")]
    NonFiniteDemand { index: usize },
    #[error("Location {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

/// What the encoded problem optimizes
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveMode {
    /// Sum of distance × demand over every assignment
    #[default]
    MinTotalWeightedDistance,
    /// Gap between the largest and smallest per-center load
    MinMaxBalance,
}

/// Positions of the decision variables inside the encoded `LpProblem`.
///
/// Layout: `x[i][j]` row-major, then `y[i]`, then (balance mode) `load[i]`, `max_load`, `min_load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    locations: usize,
    mode: ObjectiveMode,
}

impl VariableLayout {
    pub fn new(locations: usize, mode: ObjectiveMode) -> Self {
        Self { locations, mode }
    }

    pub fn locations(&self) -> usize {
        self.locations
    }

    /// `x[center][location]`: `location` is served by `center`
    pub fn assignment(&self, center: usize, location: usize) -> usize {
        center * self.locations + location
    }

    /// `y[center]`: `center` is opened
    pub fn selection(&self, center: usize) -> usize {
        self.locations * self.locations + center
    }

    pub fn center_load(&self, center: usize) -> Option<usize> {
        self.balance_base().map(|base| base + center)
    }

    pub fn max_load(&self) -> Option<usize> {
        self.balance_base().map(|base| base + self.locations)
    }

    pub fn min_load(&self) -> Option<usize> {
        self.balance_base().map(|base| base + self.locations + 1)
    }

    /// Total number of variables
    pub fn len(&self) -> usize {
        let n = self.locations;
        match self.mode {
            ObjectiveMode::MinTotalWeightedDistance => n * n + n,
            ObjectiveMode::MinMaxBalance => n * n + 2 * n + 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn balance_base(&self) -> Option<usize> {
        match self.mode {
            ObjectiveMode::MinTotalWeightedDistance => None,
            ObjectiveMode::MinMaxBalance => Some(self.locations * self.locations + self.locations),
        }
    }
}

/// An instance translated into a linear model, ready for a solver adapter
#[derive(Debug, Clone)]
pub struct EncodedProblem {
    model: LpProblem,
    layout: VariableLayout,
    mode: ObjectiveMode,
    centers: usize,
}

impl EncodedProblem {
    pub fn model(&self) -> &LpProblem {
        &self.model
    }

    pub fn layout(&self) -> &VariableLayout {
        &self.layout
    }

    pub fn mode(&self) -> ObjectiveMode {
        self.mode
    }

    /// Required number of centers (`k`)
    pub fn centers(&self) -> usize {
        self.centers
    }
}

/// Reject instances that cannot be feasible or are malformed before building anything
pub fn validate(instance: &Instance) -> Result<(), EncodingError> {
    if instance.is_empty() {
        return Err(EncodingError::NoLocations);
    }
    if instance.centers() == 0 {
        return Err(EncodingError::ZeroCenters);
    }
    for (index, location) in instance.locations().iter().enumerate() {
        if !location.demand.is_finite() {
            return Err(EncodingError::NonFiniteDemand { index });
        }
        if location.demand < 0.0 {
            return Err(EncodingError::NegativeDemand {
                index,
                demand: location.demand,
            });
        }
    }
    let eligible = instance.eligible_count();
    if instance.centers() > eligible {
        return Err(EncodingError::TooManyCenters {
            requested: instance.centers(),
            eligible,
        });
    }
    Ok(())
}

/// Build the assignment model for `instance` under `mode`
pub fn encode(instance: &Instance, mode: ObjectiveMode) -> Result<EncodedProblem, EncodingError> {
    validate(instance)?;

    let n = instance.len();
    let layout = VariableLayout::new(n, mode);
    let mut lp = LpProblem::new();

    for i in 0..n {
        for j in 0..n {
            lp.add_variable(format!("x_{}_{}", i, j), VariableKind::Binary);
        }
    }
    for i in 0..n {
        lp.add_variable(format!("y_{}", i), VariableKind::Binary);
    }

    // Every location is served by exactly one center
    for j in 0..n {
        let terms = (0..n).map(|i| (layout.assignment(i, j), 1.0)).collect();
        lp.add_constraint(format!("coverage_{}", j), terms, ConstraintOp::Eq, 1.0);
    }

    // Exactly k centers are opened
    let terms = (0..n).map(|i| (layout.selection(i), 1.0)).collect();
    lp.add_constraint("cardinality", terms, ConstraintOp::Eq, instance.centers() as f64);

    for (i, location) in instance.locations().iter().enumerate() {
        if !location.eligible {
            lp.add_constraint(
                format!("eligibility_{}", i),
                vec![(layout.selection(i), 1.0)],
                ConstraintOp::Eq,
                0.0,
            );
        }
    }

    // x[i][j] <= y[i]
    for i in 0..n {
        for j in 0..n {
            lp.add_constraint(
                format!("link_{}_{}", i, j),
                vec![(layout.assignment(i, j), 1.0), (layout.selection(i), -1.0)],
                ConstraintOp::Le,
                0.0,
            );
        }
    }

    match mode {
        ObjectiveMode::MinTotalWeightedDistance => {
            let terms = (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .filter_map(|(i, j)| {
                    let coef = instance.weighted_distance(i, j);
                    (coef != 0.0).then_some((layout.assignment(i, j), coef))
                })
                .collect();
            lp.set_objective(terms, true);
        }
        ObjectiveMode::MinMaxBalance => encode_balance(&mut lp, instance, &layout),
    }

    debug!(
        instance = instance.name(),
        ?mode,
        variables = lp.num_variables(),
        constraints = lp.num_constraints(),
        "encoded problem"
    );

    Ok(EncodedProblem {
        model: lp,
        layout,
        mode,
        centers: instance.centers(),
    })
}

/// Per-center load variables squeezed between two free bounds whose gap is minimized
fn encode_balance(lp: &mut LpProblem, instance: &Instance, layout: &VariableLayout) {
    let n = instance.len();
    let loads: Vec<usize> = (0..n)
        .map(|i| lp.add_variable(format!("load_{}", i), VariableKind::Continuous))
        .collect();
    let max_load = lp.add_variable("max_load", VariableKind::Continuous);
    let min_load = lp.add_variable("min_load", VariableKind::Continuous);

    for (i, &load) in loads.iter().enumerate() {
        // load[i] - sum_j d[i][j] * demand[j] * x[i][j] = 0
        let mut terms: Vec<Term> = vec![(load, 1.0)];
        terms.extend((0..n).filter_map(|j| {
            let coef = instance.weighted_distance(i, j);
            (coef != 0.0).then_some((layout.assignment(i, j), -coef))
        }));
        lp.add_constraint(format!("load_{}", i), terms, ConstraintOp::Eq, 0.0);

        lp.add_constraint(
            format!("max_load_{}", i),
            vec![(load, 1.0), (max_load, -1.0)],
            ConstraintOp::Le,
            0.0,
        );
        lp.add_constraint(
            format!("min_load_{}", i),
            vec![(load, 1.0), (min_load, -1.0)],
            ConstraintOp::Ge,
            0.0,
        );
    }

    lp.set_objective(vec![(max_load, 1.0), (min_load, -1.0)], true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Location;

    fn square(eligible: [bool; 4], centers: usize) -> Instance {
        let coords = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let locations = coords
            .iter()
            .zip(eligible)
            .map(|(&(x, y), e)| Location::new(x, y, 1.0, e))
            .collect();
        Instance::new("square", locations, centers).unwrap()
    }

    #[test]
    fn test_layout_total_mode() {
        let layout = VariableLayout::new(3, ObjectiveMode::MinTotalWeightedDistance);
        assert_eq!(layout.assignment(1, 2), 5);
        assert_eq!(layout.selection(0), 9);
        assert_eq!(layout.center_load(0), None);
        assert_eq!(layout.max_load(), None);
        assert_eq!(layout.len(), 12);
    }

    #[test]
    fn test_layout_balance_mode() {
        let layout = VariableLayout::new(3, ObjectiveMode::MinMaxBalance);
        assert_eq!(layout.center_load(2), Some(14));
        assert_eq!(layout.max_load(), Some(15));
        assert_eq!(layout.min_load(), Some(16));
        assert_eq!(layout.len(), 17);
    }

    #[test]
    fn test_encode_total_mode() {
        let instance = square([true, true, false, true], 2);
        let encoded = encode(&instance, ObjectiveMode::MinTotalWeightedDistance).unwrap();
        let model = encoded.model();

        assert_eq!(model.num_variables(), 20);
        assert_eq!(model.num_variables(), encoded.layout().len());
        // coverage 4 + cardinality 1 + eligibility 1 + linking 16
        assert_eq!(model.num_constraints(), 22);
        assert!(model.objective.minimize);
        // Diagonal terms are zero and dropped
        assert_eq!(model.objective.terms.len(), 12);

        let eligibility = model
            .constraints
            .iter()
            .find(|c| c.name == "eligibility_2")
            .expect("eligibility constraint for location 2");
        assert_eq!(eligibility.terms, vec![(encoded.layout().selection(2), 1.0)]);
        assert_eq!(eligibility.op, ConstraintOp::Eq);

        let cardinality = model.constraints.iter().find(|c| c.name == "cardinality").unwrap();
        assert_eq!(cardinality.rhs, 2.0);
        assert_eq!(encoded.centers(), 2);
    }

    #[test]
    fn test_encode_balance_mode() {
        let instance = square([true; 4], 2);
        let encoded = encode(&instance, ObjectiveMode::MinMaxBalance).unwrap();
        let model = encoded.model();
        let layout = encoded.layout();

        assert_eq!(model.num_variables(), 26);
        assert_eq!(model.num_variables(), layout.len());
        // 21 assignment constraints + 3 per center
        assert_eq!(model.num_constraints(), 33);
        assert_eq!(
            model.objective.terms,
            vec![(layout.max_load().unwrap(), 1.0), (layout.min_load().unwrap(), -1.0)]
        );
        assert_eq!(model.variables[layout.max_load().unwrap()].kind, VariableKind::Continuous);

        let load = model.constraints.iter().find(|c| c.name == "load_0").unwrap();
        assert_eq!(load.op, ConstraintOp::Eq);
        assert_eq!(load.terms[0], (layout.center_load(0).unwrap(), 1.0));
        assert_eq!(load.terms.len(), 4);
    }

    #[test]
    fn test_encoded_model_accepts_a_valid_assignment() {
        let instance = square([true; 4], 2);
        let encoded = encode(&instance, ObjectiveMode::MinTotalWeightedDistance).unwrap();
        let layout = encoded.layout();

        // Centers 0 and 3; 1 -> 0, 2 -> 3
        let mut values = vec![0.0; layout.len()];
        values[layout.selection(0)] = 1.0;
        values[layout.selection(3)] = 1.0;
        for (center, location) in [(0, 0), (0, 1), (3, 2), (3, 3)] {
            values[layout.assignment(center, location)] = 1.0;
        }

        assert!(encoded.model().violations(&values, 1e-9).is_empty());
        assert!((encoded.model().objective_value(&values) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_many_centers() {
        let locations = (0..5)
            .map(|i| Location::new(i as f64, 0.0, 1.0, i < 2))
            .collect();
        let instance = Instance::new("short", locations, 3).unwrap();
        assert_eq!(
            encode(&instance, ObjectiveMode::MinTotalWeightedDistance).unwrap_err(),
            EncodingError::TooManyCenters {
                requested: 3,
                eligible: 2
            }
        );
    }

    #[test]
    fn test_no_locations() {
        let instance = Instance::new("empty", vec![], 1).unwrap();
        assert_eq!(
            encode(&instance, ObjectiveMode::MinMaxBalance).unwrap_err(),
            EncodingError::NoLocations
        );
    }

    #[test]
    fn test_zero_centers() {
        let instance = square([true; 4], 0);
        assert_eq!(validate(&instance), Err(EncodingError::ZeroCenters));
    }

    #[test]
    fn test_negative_demand() {
        let locations = vec![Location::new(0.0, 0.0, 1.0, true), Location::new(1.0, 0.0, -2.0, true)];
        let instance = Instance::new("neg", locations, 1).unwrap();
        assert_eq!(
            validate(&instance),
            Err(EncodingError::NegativeDemand { index: 1, demand: -2.0 })
        );
    }
}
