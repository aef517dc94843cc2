//! Nearest-neighbor classification of habitable planets over a k-d tree.

// Declare kd_tree.rs as a submodule of the `knn` module (defined by this mod.rs file)
pub mod heap_utils;
pub mod kd_tree;

use num_traits::{AsPrimitive, Float};
use tracing::info;

use crate::common_types::{SpatialDataset, SpatialPoint};
use crate::error::KnnError;
use kd_tree::{KdTree, Neighbor};

/// Label counted as a positive vote.
pub const POSITIVE_LABEL: &str = "Habitable";

/// Per-feature z-score scaling learned from a training set.
///
/// Uses the population standard deviation. A feature with zero spread carries no
/// information, so every value of it scales to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

impl Standardizer {
    pub fn fit<F>(points: &[SpatialPoint<F>]) -> Result<Self, KnnError>
    where
        F: Float + AsPrimitive<f64>,
    {
        let first = points.first().ok_or(KnnError::EmptyDataset)?;
        let dimensions = first.features.len();
        if dimensions == 0 {
            return Err(KnnError::ZeroDimensions);
        }
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| p.features.len() != dimensions) {
            return Err(KnnError::InconsistentDimensions { index, expected: dimensions, found: p.features.len() });
        }

        let n = points.len() as f64;
        let column = |j: usize| points.iter().map(move |p| -> f64 { p.features[j].as_() });
        let means: Vec<f64> = (0..dimensions).map(|j| column(j).sum::<f64>() / n).collect();
        let std_devs = means
            .iter()
            .enumerate()
            .map(|(j, mean)| (column(j).map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt())
            .collect();

        Ok(Standardizer { means, std_devs })
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn std_devs(&self) -> &[f64] {
        &self.std_devs
    }

    pub fn dimensions(&self) -> usize {
        self.means.len()
    }

    pub fn transform<F>(&self, features: &[F]) -> Result<Vec<F>, KnnError>
    where
        F: Float + AsPrimitive<f64>,
    {
        if features.len() != self.dimensions() {
            return Err(KnnError::DimensionMismatch { expected: self.dimensions(), found: features.len() });
        }
        Ok(features
            .iter()
            .zip(self.means.iter().zip(&self.std_devs))
            .map(|(&value, (&mean, &std_dev))| {
                let scaled = if std_dev == 0.0 { 0.0 } else { (value.as_() - mean) / std_dev };
                F::from(scaled).unwrap_or_else(F::zero)
            })
            .collect())
    }

    /// Scales every point's features, keeping labels.
    pub fn transform_points<F>(&self, points: &[SpatialPoint<F>]) -> Result<Vec<SpatialPoint<F>>, KnnError>
    where
        F: Float + AsPrimitive<f64>,
    {
        points
            .iter()
            .map(|p| Ok(SpatialPoint::new(self.transform(&p.features)?, p.label.clone())))
            .collect()
    }
}

/// The K-Nearest Neighbors Classifier.
///
/// Predicts 1 when any of the `k` nearest training points is labelled [`POSITIVE_LABEL`],
/// 0 otherwise. This is an "any match" rule, not a majority vote: a single positive
/// neighbor is enough regardless of `k` or distance.
#[derive(Debug)]
pub struct NearestNeighborClassifier<F = f64> {
    k: usize,
    leaf_capacity: usize,
    tree: Option<KdTree<F>>,
    standardizer: Option<Standardizer>,
}

impl<F> NearestNeighborClassifier<F>
where
    F: Float + AsPrimitive<f64>,
{
    pub const DEFAULT_K: usize = 5;

    pub fn new(k: usize, leaf_capacity: usize) -> Result<Self, KnnError> {
        if k == 0 {
            return Err(KnnError::ZeroNeighbors);
        }
        Ok(Self { k, leaf_capacity, tree: None, standardizer: None })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn is_trained(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&KdTree<F>> {
        self.tree.as_ref()
    }

    pub fn standardizer(&self) -> Option<&Standardizer> {
        self.standardizer.as_ref()
    }

    /// Standardizes the training set and builds the search tree over it.
    /// Any previous training is replaced.
    pub fn train(&mut self, dataset: &SpatialDataset<F>) -> Result<(), KnnError> {
        self.tree = None;
        self.standardizer = None;

        let standardizer = Standardizer::fit(&dataset.points)?;
        let scaled = standardizer.transform_points(&dataset.points)?;
        let tree = KdTree::with_leaf_capacity(scaled, self.leaf_capacity)?;
        info!(
            points = tree.len(),
            dimensions = tree.dimensions(),
            depth = tree.depth(),
            k = self.k,
            "Trained nearest-neighbor classifier"
        );

        self.tree = Some(tree);
        self.standardizer = Some(standardizer);
        Ok(())
    }

    /// The `k` nearest training points (in standardized space) to a raw query.
    pub fn neighbors(&self, features: &[F]) -> Result<Vec<Neighbor<F>>, KnnError> {
        let (Some(tree), Some(standardizer)) = (&self.tree, &self.standardizer) else {
            return Err(KnnError::NotTrained);
        };
        let query = standardizer.transform(features)?;
        Ok(tree.nearest_neighbors(&query, self.k))
    }

    pub fn predict(&self, features: &[F]) -> Result<u8, KnnError> {
        let neighbors = self.neighbors(features)?;
        let positive = neighbors.iter().any(|n| n.point.has_label(POSITIVE_LABEL));
        Ok(u8::from(positive))
    }

    pub fn predict_batch(&self, test_data: &[Vec<F>]) -> Result<Vec<u8>, KnnError> {
        test_data.iter().map(|features| self.predict(features)).collect()
    }

    /// Fraction of labelled points whose prediction matches `label == POSITIVE_LABEL`.
    /// Unlabelled points are ignored.
    pub fn accuracy(&self, dataset: &SpatialDataset<F>) -> Result<f64, KnnError> {
        let mut total = 0usize;
        let mut correct = 0usize;
        for point in dataset.points.iter().filter(|p| p.label.is_some()) {
            let expected = u8::from(point.has_label(POSITIVE_LABEL));
            total += 1;
            if self.predict(&point.features)? == expected {
                correct += 1;
            }
        }
        if total == 0 {
            return Err(KnnError::EmptyDataset);
        }
        Ok(correct as f64 / total as f64)
    }
}
