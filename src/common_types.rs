//! This module contains the data structures shared by the KD-tree and the classifier.

use num_traits::{AsPrimitive, Float};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a single point in feature space, with an optional class label.
///
/// - `F`: The type of the features (e.g., `f64`, `f32`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialPoint<F = f64> {
    pub features: Vec<F>,
    pub label: Option<String>,
}

impl<F> SpatialPoint<F> {
    pub fn new(features: Vec<F>, label: Option<String>) -> Self {
        SpatialPoint { features, label }
    }

    /// A point without a label, e.g. a query.
    pub fn unlabeled(features: Vec<F>) -> Self {
        SpatialPoint { features, label: None }
    }

    pub fn labeled(features: Vec<F>, label: impl Into<String>) -> Self {
        SpatialPoint { features, label: Some(label.into()) }
    }

    pub fn dimensions(&self) -> usize {
        self.features.len()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }
}

/// A collection of points plus the column header it was read with.
///
/// `threshold` is carried along with the data as-is; nothing in the library interprets it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialDataset<F = f64> {
    pub points: Vec<SpatialPoint<F>>,
    pub header: Vec<String>,
    pub threshold: f64,
}

impl<F> SpatialDataset<F> {
    pub fn new(points: Vec<SpatialPoint<F>>, header: Vec<String>, threshold: f64) -> Self {
        SpatialDataset { points, header, threshold }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Dimensionality of the first point, or 0 for an empty dataset.
    pub fn dimensions(&self) -> usize {
        self.points.first().map_or(0, |p| p.features.len())
    }
}

/// Calculates the Euclidean distance between two feature vectors.
pub fn euclidean_distance<F>(a: &[F], b: &[F]) -> f64
where
    F: Float + AsPrimitive<f64>,
{
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff: f64 = (x - y).as_();
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_distance() {
        assert_relative_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_relative_eq!(euclidean_distance(&[1.5f32], &[1.5f32]), 0.0);
    }

    #[test]
    fn test_dataset_dimensions() {
        let empty: SpatialDataset = SpatialDataset::default();
        assert_eq!(empty.dimensions(), 0);
        assert!(empty.is_empty());

        let ds = SpatialDataset::new(
            vec![SpatialPoint::labeled(vec![1.0, 2.0, 3.0], "Habitable")],
            vec!["a".into(), "b".into(), "c".into(), "label".into()],
            0.1,
        );
        assert_eq!(ds.dimensions(), 3);
        assert!(ds.points[0].has_label("Habitable"));
        assert!(!SpatialPoint::unlabeled(vec![0.0]).has_label("Habitable"));
    }
}
