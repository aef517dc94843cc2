//! Python bindings for the sector indexes and the habitability classifier.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::common_types::{self, SpatialDataset, SpatialPoint};
use crate::error::{InputError, KnnError};
use crate::input;
use crate::knn::NearestNeighborClassifier;
use crate::knn::kd_tree::KdTree;
use crate::sectors::{BalancedSectorIndex, Sector, SectorIndex, TraversalOrder, UnbalancedSectorIndex};

const DEFAULT_K: usize = NearestNeighborClassifier::<f64>::DEFAULT_K;
const DEFAULT_LEAF_CAPACITY: usize = KdTree::<f64>::DEFAULT_LEAF_CAPACITY;

fn knn_error(err: KnnError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn input_error(err: InputError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn traversal_order(order: &str) -> PyResult<TraversalOrder> {
    match order {
        "inorder" | "in_order" => Ok(TraversalOrder::InOrder),
        "preorder" | "pre_order" => Ok(TraversalOrder::PreOrder),
        "postorder" | "post_order" => Ok(TraversalOrder::PostOrder),
        other => Err(PyValueError::new_err(format!("unknown traversal order: {other}"))),
    }
}

fn path_codes<'a>(path: impl IntoIterator<Item = &'a Sector>) -> Vec<String> {
    path.into_iter().map(|s| s.code.clone()).collect()
}

/// Sector index kept as a plain binary search tree.
#[pyclass(name = "UnbalancedSectorIndex")]
#[derive(Default)]
pub struct PyUnbalancedSectorIndex {
    index: UnbalancedSectorIndex,
}

#[pymethods]
impl PyUnbalancedSectorIndex {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        let mut index = UnbalancedSectorIndex::new();
        index.extend_from_coordinates(input::read_sector_file(path).map_err(input_error)?);
        Ok(Self { index })
    }

    fn insert(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.index.insert(x, y, z)
    }

    fn delete(&mut self, code: &str) -> bool {
        self.index.delete(code).is_some()
    }

    fn stellar_path(&self, code: &str) -> Vec<String> {
        path_codes(self.index.stellar_path(code))
    }

    #[pyo3(signature = (order = "inorder"))]
    fn codes(&self, order: &str) -> PyResult<Vec<String>> {
        Ok(self.index.codes(traversal_order(order)?))
    }

    fn __contains__(&self, code: &str) -> bool {
        self.index.contains_code(code)
    }

    fn __len__(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.index.clear();
    }
}

/// Sector index kept as a left-leaning red-black tree.
#[pyclass(name = "BalancedSectorIndex")]
#[derive(Default)]
pub struct PyBalancedSectorIndex {
    index: BalancedSectorIndex,
}

#[pymethods]
impl PyBalancedSectorIndex {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        let mut index = BalancedSectorIndex::new();
        index.extend_from_coordinates(input::read_sector_file(path).map_err(input_error)?);
        Ok(Self { index })
    }

    fn insert(&mut self, x: i32, y: i32, z: i32) -> bool {
        self.index.insert(x, y, z)
    }

    fn delete(&mut self, code: &str) -> bool {
        self.index.delete(code).is_some()
    }

    fn stellar_path(&self, code: &str) -> Vec<String> {
        path_codes(self.index.stellar_path(code))
    }

    #[pyo3(signature = (order = "inorder"))]
    fn codes(&self, order: &str) -> PyResult<Vec<String>> {
        Ok(self.index.codes(traversal_order(order)?))
    }

    /// `(code, "RED" | "BLACK")` pairs in the requested order.
    #[pyo3(signature = (order = "inorder"))]
    fn colored_codes(&self, order: &str) -> PyResult<Vec<(String, String)>> {
        Ok(self
            .index
            .traverse(traversal_order(order)?)
            .into_iter()
            .map(|node| (node.code().to_string(), node.color().to_string()))
            .collect())
    }

    fn __contains__(&self, code: &str) -> bool {
        self.index.contains_code(code)
    }

    fn __len__(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.index.clear();
    }
}

#[pyclass(name = "KnnClassifier")]
pub struct PyKnnClassifier {
    classifier: NearestNeighborClassifier<f64>,
}

#[pymethods]
impl PyKnnClassifier {
    #[new]
    #[pyo3(signature = (k = DEFAULT_K, leaf_capacity = DEFAULT_LEAF_CAPACITY))]
    fn new(k: usize, leaf_capacity: usize) -> PyResult<Self> {
        let classifier = NearestNeighborClassifier::new(k, leaf_capacity).map_err(knn_error)?;
        Ok(Self { classifier })
    }

    /// Trains on `(features, label)` pairs.
    fn fit(&mut self, training_data: Vec<(Vec<f64>, String)>) -> PyResult<()> {
        let points = training_data
            .into_iter()
            .map(|(features, label)| SpatialPoint::labeled(features, label))
            .collect();
        self.classifier
            .train(&SpatialDataset::new(points, Vec::new(), 0.0))
            .map_err(knn_error)
    }

    #[pyo3(signature = (path, threshold = 0.0))]
    fn fit_file(&mut self, path: &str, threshold: f64) -> PyResult<()> {
        let dataset = input::read_dataset_file(path, threshold).map_err(input_error)?;
        self.classifier.train(&dataset).map_err(knn_error)
    }

    fn predict_single(&self, features: Vec<f64>) -> PyResult<u8> {
        self.classifier.predict(&features).map_err(knn_error)
    }

    fn predict(&self, test_data: Vec<Vec<f64>>) -> PyResult<Vec<u8>> {
        self.classifier.predict_batch(&test_data).map_err(knn_error)
    }

    #[getter]
    fn k(&self) -> usize {
        self.classifier.k()
    }

    #[getter]
    fn is_trained(&self) -> bool {
        self.classifier.is_trained()
    }
}

#[pyfunction]
fn euclidean_distance(a: Vec<f64>, b: Vec<f64>) -> PyResult<f64> {
    if a.len() != b.len() {
        return Err(PyValueError::new_err("Input vectors must have the same length."));
    }
    Ok(common_types::euclidean_distance(&a, &b))
}

/// The name of this function must match the `lib.name` in `Cargo.toml`.
#[pymodule]
fn stellar_cartography(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(euclidean_distance, m)?)?;
    m.add_class::<PyUnbalancedSectorIndex>()?;
    m.add_class::<PyBalancedSectorIndex>()?;
    m.add_class::<PyKnnClassifier>()?;
    Ok(())
}
