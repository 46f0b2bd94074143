//! Pairwise Euclidean distances.

use crate::encoder::EncodingError;
use crate::instance::Location;

/// A dense n×n distance matrix stored in row-major order.
///
/// Built only from location coordinates, so it is always symmetric with a zero
/// diagonal: each pair is computed once and mirrored.
///
/// # Examples
///
/// ```
/// use hubsite_core::{DistanceMatrix, Location};
///
/// let locations = vec![
///     Location::new(0.0, 0.0, 1.0, true),
///     Location::new(3.0, 4.0, 1.0, true),
/// ];
/// let dm = DistanceMatrix::from_locations(&locations).unwrap();
/// assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
/// assert_eq!(dm.size(), 2);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Computes the Euclidean distance matrix of `locations`.
    ///
    /// Returns [`EncodingError::NonFiniteCoordinate`] for the first location whose
    /// x or y is NaN or infinite.
    pub fn from_locations(locations: &[Location]) -> Result<Self, EncodingError> {
        if let Some(index) = locations.iter().position(|l| !l.x.is_finite() || !l.y.is_finite()) {
            return Err(EncodingError::NonFiniteCoordinate { index });
        }

        let size = locations.len();
        let mut data = vec![0.0; size * size];
        for i in 0..size {
            for j in (i + 1)..size {
                let d = locations[i].distance_to(&locations[j]);
                data[i * size + j] = d;
                data[j * size + i] = d;
            }
        }
        Ok(Self { data, size })
    }

    /// Returns the distance between locations `from` and `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Distances from `from` to every location
    pub fn row(&self, from: usize) -> &[f64] {
        &self.data[from * self.size..(from + 1) * self.size]
    }

    /// Number of locations in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    pub fn has_zero_diagonal(&self) -> bool {
        (0..self.size).all(|i| self.get(i, i) == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Location> {
        vec![
            Location::new(0.0, 0.0, 1.0, true),
            Location::new(10.0, 0.0, 1.0, true),
            Location::new(0.0, 10.0, 1.0, true),
            Location::new(10.0, 10.0, 1.0, true),
        ]
    }

    #[test]
    fn test_from_locations() {
        let dm = DistanceMatrix::from_locations(&square()).unwrap();
        assert_eq!(dm.size(), 4);
        assert!((dm.get(0, 1) - 10.0).abs() < 1e-10);
        assert!((dm.get(0, 3) - 200f64.sqrt()).abs() < 1e-10);
        assert_eq!(dm.row(2), &[10.0, dm.get(2, 1), 0.0, 10.0]);
    }

    #[test]
    fn test_symmetric_zero_diagonal() {
        let dm = DistanceMatrix::from_locations(&square()).unwrap();
        assert!(dm.is_symmetric(0.0));
        assert!(dm.has_zero_diagonal());
    }

    #[test]
    fn test_empty() {
        let dm = DistanceMatrix::from_locations(&[]).unwrap();
        assert_eq!(dm.size(), 0);
        assert!(dm.is_symmetric(0.0));
    }

    #[test]
    fn test_rejects_infinite_coordinate() {
        let mut locations = square();
        locations[2].y = f64::INFINITY;
        assert_eq!(
            DistanceMatrix::from_locations(&locations),
            Err(EncodingError::NonFiniteCoordinate { index: 2 })
        );
    }
}
