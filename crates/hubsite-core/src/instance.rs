use crate::distance::DistanceMatrix;
use crate::encoder::EncodingError;

/// A demand point. Its identifier is its position in the owning [`Instance`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    /// Number of deliveries
    pub demand: f64,
    /// Whether this location may become a center
    pub eligible: bool,
}

impl Location {
    pub fn new(x: f64, y: f64, demand: f64, eligible: bool) -> Self {
        Self { x, y, demand, eligible }
    }

    pub fn distance_to(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A siting problem: locations, the number of centers to open, and the
/// pairwise distances computed once at construction.
#[derive(Debug, Clone)]
pub struct Instance {
    name: String,
    locations: Vec<Location>,
    centers: usize,
    distances: DistanceMatrix,
}

impl Instance {
    /// Fails only when a coordinate is NaN or infinite; center count and demand
    /// are validated when the instance is encoded.
    pub fn new(name: impl Into<String>, locations: Vec<Location>, centers: usize) -> Result<Self, EncodingError> {
        let distances = DistanceMatrix::from_locations(&locations)?;
        Ok(Self {
            name: name.into(),
            locations,
            centers,
            distances,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, index: usize) -> &Location {
        &self.locations[index]
    }

    /// Number of locations
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Required number of centers (`k`)
    pub fn centers(&self) -> usize {
        self.centers
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Indices of locations allowed to become centers, ascending
    pub fn eligible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.locations
            .iter()
            .enumerate()
            .filter(|(_, l)| l.eligible)
            .map(|(i, _)| i)
    }

    pub fn eligible_count(&self) -> usize {
        self.locations.iter().filter(|l| l.eligible).count()
    }

    /// Distance from `center` to `location` multiplied by the location's demand
    pub fn weighted_distance(&self, center: usize, location: usize) -> f64 {
        self.distances.get(center, location) * self.locations[location].demand
    }
}
