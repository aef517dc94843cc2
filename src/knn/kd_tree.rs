//! This module contains the k-d tree used for nearest-neighbor queries.

use num_traits::{AsPrimitive, Float};
use tracing::{debug, warn};

use super::heap_utils::KBestNeighbors; // Import shared heap utilities
use crate::common_types::{SpatialDataset, SpatialPoint, euclidean_distance};
use crate::error::KnnError;

/// A k-d tree node.
///
/// Subsets small enough to fit the tree's leaf capacity are stored as a bucket; anything
/// larger is split at the exact median of `split_dimension`, and the median point itself
/// lives in the internal node.
#[derive(Debug)]
pub enum KdNode<F> {
    Internal {
        split_dimension: usize,
        split_value: F,
        point: SpatialPoint<F>,
        left: Option<Box<KdNode<F>>>,
        right: Option<Box<KdNode<F>>>,
    },
    Leaf {
        points: Vec<SpatialPoint<F>>,
    },
}

/// A point returned by a neighbor query, with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<F> {
    pub point: SpatialPoint<F>,
    pub distance: f64,
}

#[derive(Debug)]
pub struct KdTree<F = f64> {
    root: Option<Box<KdNode<F>>>,
    dimensions: usize,
    len: usize,
    leaf_capacity: usize,
}

impl<F> KdTree<F>
where
    F: Float + AsPrimitive<f64>,
{
    /// One point per leaf: every split stores exactly one median point.
    pub const DEFAULT_LEAF_CAPACITY: usize = 1;

    pub fn build(points: Vec<SpatialPoint<F>>) -> Result<Self, KnnError> {
        Self::with_leaf_capacity(points, Self::DEFAULT_LEAF_CAPACITY)
    }

    pub fn from_dataset(dataset: &SpatialDataset<F>, leaf_capacity: usize) -> Result<Self, KnnError> {
        Self::with_leaf_capacity(dataset.points.clone(), leaf_capacity)
    }

    /// Builds the tree, turning subsets of at most `leaf_capacity` points into leaves.
    /// A capacity of 0 is treated as 1.
    ///
    /// An empty input yields an empty tree. Points must all have the same, non-zero number
    /// of features.
    pub fn with_leaf_capacity(points: Vec<SpatialPoint<F>>, leaf_capacity: usize) -> Result<Self, KnnError> {
        let leaf_capacity = leaf_capacity.max(1);
        let len = points.len();
        let Some(first) = points.first() else {
            return Ok(KdTree { root: None, dimensions: 0, len: 0, leaf_capacity });
        };

        let dimensions = first.features.len();
        if dimensions == 0 {
            return Err(KnnError::ZeroDimensions);
        }
        if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| p.features.len() != dimensions) {
            return Err(KnnError::InconsistentDimensions { index, expected: dimensions, found: p.features.len() });
        }

        let root = Self::build_recursive(points, dimensions, 0, leaf_capacity);
        let tree = KdTree { root, dimensions, len, leaf_capacity };
        debug!(points = len, dimensions, depth = tree.depth(), "Built k-d tree");
        Ok(tree)
    }

    fn build_recursive(
        mut points: Vec<SpatialPoint<F>>,
        dimensions: usize,
        depth: usize,
        leaf_capacity: usize,
    ) -> Option<Box<KdNode<F>>> {
        if points.is_empty() {
            return None;
        }
        if points.len() <= leaf_capacity {
            return Some(Box::new(KdNode::Leaf { points }));
        }

        let split_dimension = depth % dimensions;
        let median_idx = points.len() / 2;

        // Linear-time selection: everything before the median is <= it, everything after >= it.
        points.select_nth_unstable_by(median_idx, |a, b| {
            axis_value(a, split_dimension).total_cmp(&axis_value(b, split_dimension))
        });

        let right_points = points.split_off(median_idx + 1);
        let point = points.pop()?;
        let split_value = point.features[split_dimension];

        let left = Self::build_recursive(points, dimensions, depth + 1, leaf_capacity);
        let right = Self::build_recursive(right_points, dimensions, depth + 1, leaf_capacity);

        Some(Box::new(KdNode::Internal { split_dimension, split_value, point, left, right }))
    }

    pub fn root(&self) -> Option<&KdNode<F>> {
        self.root.as_deref()
    }

    /// Number of points stored across internal nodes and leaves.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// Number of node levels; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        fn depth_of<F>(node: Option<&KdNode<F>>) -> usize {
            match node {
                None => 0,
                Some(KdNode::Leaf { .. }) => 1,
                Some(KdNode::Internal { left, right, .. }) => {
                    1 + depth_of(left.as_deref()).max(depth_of(right.as_deref()))
                }
            }
        }
        depth_of(self.root())
    }

    /// Every stored point, internal nodes before their subtrees.
    pub fn points(&self) -> Vec<&SpatialPoint<F>> {
        fn collect<'a, F>(node: Option<&'a KdNode<F>>, out: &mut Vec<&'a SpatialPoint<F>>) {
            match node {
                None => {}
                Some(KdNode::Leaf { points }) => out.extend(points),
                Some(KdNode::Internal { point, left, right, .. }) => {
                    out.push(point);
                    collect(left.as_deref(), out);
                    collect(right.as_deref(), out);
                }
            }
        }
        let mut out = Vec::with_capacity(self.len);
        collect(self.root(), &mut out);
        out
    }

    /// Finds up to `n_neighbors` points closest to `target_features`, nearest first.
    /// Equal distances keep the order in which the search met them.
    pub fn nearest_neighbors(&self, target_features: &[F], n_neighbors: usize) -> Vec<Neighbor<F>> {
        if n_neighbors == 0 || self.is_empty() {
            return Vec::new();
        }
        if target_features.len() != self.dimensions {
            warn!(
                found = target_features.len(),
                expected = self.dimensions,
                "Query dimensionality does not match the tree"
            );
            return Vec::new();
        }

        let mut best_n = KBestNeighbors::new(n_neighbors);
        Self::search_recursive(self.root(), target_features, &mut best_n);
        best_n
            .into_sorted()
            .into_iter()
            .map(|(distance, point)| Neighbor { point: point.clone(), distance })
            .collect()
    }

    /// Recursive helper function for nearest neighbor search.
    fn search_recursive<'a>(
        node: Option<&'a KdNode<F>>,
        target_features: &[F],
        best_n: &mut KBestNeighbors<&'a SpatialPoint<F>>,
    ) {
        match node {
            None => {}
            Some(KdNode::Leaf { points }) => {
                let mut scored: Vec<(f64, &SpatialPoint<F>)> = points
                    .iter()
                    .map(|p| (euclidean_distance(target_features, &p.features), p))
                    .collect();
                scored.sort_by(|a, b| a.0.total_cmp(&b.0)); // Stable: equal distances keep bucket order
                for (distance, point) in scored {
                    best_n.add(distance, point);
                }
            }
            Some(KdNode::Internal { split_dimension, split_value, point, left, right }) => {
                let target_coord = target_features[*split_dimension];

                // Visit the side of the split the query falls on first.
                let (primary_child, secondary_child) = if target_coord < *split_value {
                    (left, right)
                } else {
                    (right, left)
                };

                Self::search_recursive(primary_child.as_deref(), target_features, best_n);
                best_n.add(euclidean_distance(target_features, &point.features), point);

                let dist_to_hyperplane: f64 = (target_coord - *split_value).abs().as_();
                if best_n.current_farthest_distance().is_none_or(|radius| dist_to_hyperplane < radius) {
                    Self::search_recursive(secondary_child.as_deref(), target_features, best_n);
                }
            }
        }
    }
}

fn axis_value<F: AsPrimitive<f64>>(point: &SpatialPoint<F>, dimension: usize) -> f64 {
    point.features[dimension].as_()
}

#[cfg(test)]
mod tests {
    use super::{KdNode, KdTree};
    use crate::common_types::{SpatialPoint, euclidean_distance};
    use crate::error::KnnError;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Helper to create a labelled point for tests
    fn make_dp(features: Vec<f64>, label: &str) -> SpatialPoint<f64> {
        SpatialPoint::labeled(features, label)
    }

    fn random_points(seed: u64, count: usize, dimensions: usize) -> Vec<SpatialPoint<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                // Coarse grid so equal coordinates and equal distances actually occur.
                let features = (0..dimensions).map(|_| rng.gen_range(0..20) as f64 / 2.0).collect();
                make_dp(features, &i.to_string())
            })
            .collect()
    }

    fn brute_force_distances(points: &[SpatialPoint<f64>], query: &[f64], k: usize) -> Vec<f64> {
        let mut distances: Vec<f64> = points.iter().map(|p| euclidean_distance(query, &p.features)).collect();
        distances.sort_by(f64::total_cmp);
        distances.truncate(k);
        distances
    }

    // Helper to check node properties
    fn check_internal(node: Option<&KdNode<f64>>, expected_features: &[f64], expected_dim: usize) {
        match node {
            Some(KdNode::Internal { point, split_dimension, split_value, .. }) => {
                assert_eq!(point.features, expected_features, "Node point features mismatch");
                assert_eq!(*split_dimension, expected_dim, "Node splitting dimension mismatch");
                assert_eq!(*split_value, expected_features[expected_dim]);
            }
            other => panic!("expected internal node, got {other:?}"),
        }
    }

    fn check_leaf(node: Option<&KdNode<f64>>, expected_features: &[f64]) {
        match node {
            Some(KdNode::Leaf { points }) => {
                assert_eq!(points.len(), 1);
                assert_eq!(points[0].features, expected_features);
            }
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    fn children(node: Option<&KdNode<f64>>) -> (Option<&KdNode<f64>>, Option<&KdNode<f64>>) {
        match node {
            Some(KdNode::Internal { left, right, .. }) => (left.as_deref(), right.as_deref()),
            other => panic!("expected internal node, got {other:?}"),
        }
    }

    /// Returns every point under `node`, checking split invariants on the way.
    fn checked_points(node: Option<&KdNode<f64>>, depth: usize, dimensions: usize) -> Vec<SpatialPoint<f64>> {
        match node {
            None => Vec::new(),
            Some(KdNode::Leaf { points }) => points.clone(),
            Some(KdNode::Internal { split_dimension, split_value, point, left, right }) => {
                assert_eq!(*split_dimension, depth % dimensions, "split dimension must follow depth");
                let lower = checked_points(left.as_deref(), depth + 1, dimensions);
                let upper = checked_points(right.as_deref(), depth + 1, dimensions);
                assert!(lower.iter().all(|p| p.features[*split_dimension] <= *split_value));
                assert!(upper.iter().all(|p| p.features[*split_dimension] >= *split_value));
                let mut all = lower;
                all.push(point.clone());
                all.extend(upper);
                all
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let tree = KdTree::<f64>::build(vec![]).expect("empty input is not an error");
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.depth(), 0);
        assert!(tree.nearest_neighbors(&[1.0, 2.0], 3).is_empty());
    }

    #[test]
    fn test_zero_dimensionality_points() {
        let points = vec![SpatialPoint::<f64>::unlabeled(vec![])];
        assert_eq!(KdTree::build(points).unwrap_err(), KnnError::ZeroDimensions);
    }

    #[test]
    fn test_inconsistent_dimensionality() {
        let points = vec![make_dp(vec![1.0, 2.0], "a"), make_dp(vec![3.0], "b")];
        assert_eq!(
            KdTree::build(points).unwrap_err(),
            KnnError::InconsistentDimensions { index: 1, expected: 2, found: 1 }
        );
    }

    #[test]
    fn test_single_point_tree_is_a_leaf() {
        let tree = KdTree::build(vec![make_dp(vec![1.0, 2.0], "a")]).unwrap();
        check_leaf(tree.root(), &[1.0, 2.0]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_exact_median_construction_2d() {
        let points = vec![
            make_dp(vec![2.0, 3.0], "P1"),
            make_dp(vec![5.0, 4.0], "P2"),
            make_dp(vec![9.0, 6.0], "P3"),
            make_dp(vec![4.0, 7.0], "P4"),
            make_dp(vec![8.0, 1.0], "P5"),
            make_dp(vec![7.0, 2.0], "P6"),
        ];
        let tree = KdTree::build(points).expect("Exact median tree creation failed");

        // Root: P6(7,2), x split
        check_internal(tree.root(), &[7.0, 2.0], 0);
        let (left, right) = children(tree.root());

        // Left half {P1, P2, P4} splits on y at P2(5,4)
        check_internal(left, &[5.0, 4.0], 1);
        let (ll, lr) = children(left);
        check_leaf(ll, &[2.0, 3.0]);
        check_leaf(lr, &[4.0, 7.0]);

        // Right half {P3, P5} splits on y at P3(9,6); P5 goes left, nothing right
        check_internal(right, &[9.0, 6.0], 1);
        let (rl, rr) = children(right);
        check_leaf(rl, &[8.0, 1.0]);
        assert!(rr.is_none());
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_three_points_one_dimension() {
        let points = vec![make_dp(vec![3.0], "c"), make_dp(vec![1.0], "a"), make_dp(vec![2.0], "b")];
        let tree = KdTree::build(points).unwrap();
        check_internal(tree.root(), &[2.0], 0);
        let (left, right) = children(tree.root());
        check_leaf(left, &[1.0]);
        check_leaf(right, &[3.0]);
    }

    #[test]
    fn test_leaf_buckets() {
        let points = random_points(5, 3, 2);
        let tree = KdTree::with_leaf_capacity(points.clone(), 4).unwrap();
        match tree.root() {
            Some(KdNode::Leaf { points: bucket }) => assert_eq!(bucket.len(), 3),
            other => panic!("three points should fit in one bucket, got {other:?}"),
        }

        let zero = KdTree::with_leaf_capacity(points, 0).unwrap();
        assert_eq!(zero.leaf_capacity(), 1);
    }

    #[test]
    fn test_every_point_kept_once_and_splits_hold() {
        for (seed, capacity) in [(1, 1), (2, 3), (3, 8)] {
            let points = random_points(seed, 257, 3);
            let tree = KdTree::with_leaf_capacity(points.clone(), capacity).unwrap();
            assert_eq!(tree.len(), points.len());
            assert_eq!(tree.points().len(), points.len());

            let mut stored: Vec<String> = checked_points(tree.root(), 0, 3)
                .into_iter()
                .filter_map(|p| p.label)
                .collect();
            let mut expected: Vec<String> = points.into_iter().filter_map(|p| p.label).collect();
            stored.sort();
            expected.sort();
            assert_eq!(stored, expected, "seed {seed}: points lost or duplicated");
        }
    }

    #[test]
    fn test_two_nearest_scenario() {
        let points = vec![
            make_dp(vec![1.0, 1.0], "a"),
            make_dp(vec![2.0, 2.0], "b"),
            make_dp(vec![3.0, 3.0], "c"),
            make_dp(vec![10.0, 10.0], "d"),
        ];
        let tree = KdTree::build(points).unwrap();
        let neighbors = tree.nearest_neighbors(&[2.1, 2.1], 2);

        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].point.features, vec![2.0, 2.0]);
        assert_relative_eq!(neighbors[0].distance, 0.1414, epsilon = 1e-4);
        assert_eq!(neighbors[1].point.features, vec![3.0, 3.0]);
        assert_relative_eq!(neighbors[1].distance, 1.2728, epsilon = 1e-4);
    }

    #[test]
    fn test_matches_brute_force() {
        for (seed, capacity) in [(10, 1), (11, 2), (12, 5)] {
            let points = random_points(seed, 120, 3);
            let tree = KdTree::with_leaf_capacity(points.clone(), capacity).unwrap();
            let queries = random_points(seed + 1000, 15, 3);

            for query in &queries {
                for k in [1, 2, 7, 30, points.len()] {
                    let found: Vec<f64> = tree
                        .nearest_neighbors(&query.features, k)
                        .iter()
                        .map(|n| n.distance)
                        .collect();
                    let expected = brute_force_distances(&points, &query.features, k);
                    assert_eq!(found.len(), expected.len());
                    for (a, b) in found.iter().zip(&expected) {
                        assert_relative_eq!(*a, *b, epsilon = 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_k_larger_than_tree_returns_everything_sorted() {
        let points = random_points(21, 9, 2);
        let tree = KdTree::build(points).unwrap();
        let neighbors = tree.nearest_neighbors(&[0.0, 0.0], 50);
        assert_eq!(neighbors.len(), 9);
        assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_repeated_queries_are_deterministic() {
        let points = random_points(30, 64, 2);
        let tree = KdTree::with_leaf_capacity(points, 3).unwrap();
        let first = tree.nearest_neighbors(&[4.0, 4.0], 10);
        let second = tree.nearest_neighbors(&[4.0, 4.0], 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_k_or_wrong_dimensions_returns_nothing() {
        let tree = KdTree::build(random_points(4, 10, 2)).unwrap();
        assert!(tree.nearest_neighbors(&[1.0, 1.0], 0).is_empty());
        assert!(tree.nearest_neighbors(&[1.0, 1.0, 1.0], 3).is_empty());
    }

    #[test]
    fn test_f32_features() {
        let points = vec![
            SpatialPoint::labeled(vec![0.0f32, 0.0], "origin"),
            SpatialPoint::labeled(vec![5.0f32, 5.0], "far"),
        ];
        let tree = KdTree::build(points).unwrap();
        let neighbors = tree.nearest_neighbors(&[1.0f32, 1.0], 1);
        assert_eq!(neighbors[0].point.label.as_deref(), Some("origin"));
        assert_relative_eq!(neighbors[0].distance, 2f64.sqrt(), epsilon = 1e-6);
    }
}
