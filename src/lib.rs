//! Sector cartography and planet habitability classification.
//!
//! - [`sectors`]: two ordered indexes of 3-D sectors (plain BST and left-leaning red-black tree)
//!   with stellar-path queries from the reference sector `0SSS`.
//! - [`knn`]: a k-d tree with bounded nearest-neighbor search and the classifier built on it.
//! - [`input`]: CSV readers for both.

pub mod common_types;
pub mod error;
pub mod input;
pub mod knn;
pub mod sectors;

#[cfg(feature = "python")]
mod python;

pub use common_types::{SpatialDataset, SpatialPoint, euclidean_distance};
pub use error::{InputError, InvariantViolation, KnnError};
pub use knn::kd_tree::{KdTree, Neighbor};
pub use knn::{NearestNeighborClassifier, POSITIVE_LABEL, Standardizer};
pub use sectors::{BalancedSectorIndex, Color, REFERENCE_CODE, Sector, SectorIndex, TraversalOrder, UnbalancedSectorIndex};
