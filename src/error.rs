//! Error types for the input readers and the nearest-neighbor stack.
//!
//! Sector lookups never fail with an error: a missing code is an empty result.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures while reading a CSV input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Input has no header line")]
    MissingHeader,
}

/// Failures while building a KD-tree or classifying with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnnError {
    #[error("Dataset contains no points")]
    EmptyDataset,

    #[error("Points must have at least one feature")]
    ZeroDimensions,

    #[error("Point {index} has {found} features, expected {expected}")]
    InconsistentDimensions {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Query has {found} features, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("k must be greater than 0")]
    ZeroNeighbors,

    #[error("Classifier has not been trained")]
    NotTrained,
}

/// A structural property of a sector index that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invariant violated: {0}")]
pub struct InvariantViolation(pub String);
