//! Local Getis-Ord hotspot statistics on weighted kNN graphs.
//!
//! Samples (cells) positioned in a feature space are connected to their
//! nearest neighbours with Gaussian kernel weights. For every variable (gene)
//! and sample the local Getis-Ord G_i then tests whether the neighbourhood of
//! the sample is enriched or depleted relative to the global distribution of
//! the variable.

pub mod core;
pub mod error;
pub mod single_cell;
pub mod utils;

pub use crate::core::base::stats::{
    gi_to_pval, gi_to_pval_labelled, gi_to_pval_mat, TestAlternative,
};
pub use crate::core::data::labelled::LabelledMatrix;
pub use crate::core::data::sparse_structures::CompressedSparseData;
pub use crate::core::graph::kernel::compute_weights;
pub use crate::core::graph::knn::{BruteForceSearch, KdTree, KnnResult, NearestNeighbourSearch};
pub use crate::core::graph::neighbours::{
    neighbours_and_weights, neighbours_and_weights_with, NeighbourGraph,
};
pub use crate::error::{HotspotError, Result};
pub use crate::single_cell::getis_ord::{compute_gi_batched, compute_gi_labelled, compute_gi_single};
pub use crate::single_cell::hotspot::{run_hotspot, HotspotParams, HotspotResult};
