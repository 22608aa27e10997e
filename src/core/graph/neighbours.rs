use std::time::Instant;
use tracing::debug;

use crate::core::data::labelled::{label_permutation, LabelledMatrix};
use crate::core::data::sparse_structures::CompressedSparseData;
use crate::core::graph::kernel::{compute_weights, radius_index};
use crate::core::graph::knn::{KdTree, NearestNeighbourSearch};
use crate::ensure_dim;
use crate::error::{HotspotError, Result};

/// Default number of neighbours per sample
pub const DEFAULT_N_NEIGHBOURS: usize = 30;

////////////////
// Structures //
////////////////

/// Weighted kNN graph in neighbour-table form
///
/// ### Fields
///
/// * `labels` - Sample labels, row `i` of the tables belongs to `labels[i]`.
/// * `indices` - Neighbour positions (into `labels`) per sample, nearest
///   first.
/// * `weights` - Kernel weight of every neighbour relation, same shape as
///   `indices`.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighbourGraph {
    pub labels: Vec<String>,
    pub indices: Vec<Vec<usize>>,
    pub weights: Vec<Vec<f64>>,
}

impl NeighbourGraph {
    /// Generate a new graph from its tables
    ///
    /// ### Params
    ///
    /// * `labels` - Sample labels.
    /// * `indices` - Neighbour table (samples x neighbours).
    /// * `weights` - Weight table (samples x neighbours).
    ///
    /// ### Returns
    ///
    /// The graph, or a `ShapeMismatch` if the tables disagree in shape, are
    /// ragged or point to non-existing samples.
    pub fn new(
        labels: Vec<String>,
        indices: Vec<Vec<usize>>,
        weights: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let graph = Self {
            labels,
            indices,
            weights,
        };
        graph.validate()?;

        Ok(graph)
    }

    /// Check the table invariants
    pub fn validate(&self) -> Result<()> {
        let n = self.labels.len();
        ensure_dim!("neighbour table rows", n, self.indices.len());
        ensure_dim!("weight table rows", n, self.weights.len());

        let width = self.n_neighbours();
        for (idx, w) in self.indices.iter().zip(self.weights.iter()) {
            ensure_dim!("neighbour table width", width, idx.len());
            ensure_dim!("weight table width", width, w.len());
            if let Some(&bad) = idx.iter().find(|&&j| j >= n) {
                return Err(HotspotError::ShapeMismatch {
                    what: "neighbour index",
                    expected: n,
                    found: bad,
                });
            }
        }

        Ok(())
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// Width of the neighbour table
    pub fn n_neighbours(&self) -> usize {
        self.indices.first().map_or(0, |r| r.len())
    }

    /// Per-sample sum of the weights (`W_i`)
    pub fn weight_sums(&self) -> Vec<f64> {
        self.weights.iter().map(|r| r.iter().sum()).collect()
    }

    /// Per-sample sum of the squared weights (`S1_i`)
    pub fn squared_weight_sums(&self) -> Vec<f64> {
        self.weights
            .iter()
            .map(|r| r.iter().map(|w| w * w).sum())
            .collect()
    }

    /// Assemble the samples x samples sparse weight matrix
    ///
    /// Entry `(i, j)` holds the weight sample `i` gives to neighbour `j`.
    /// Repeated neighbours within a row are summed.
    pub fn to_sparse(&self) -> Result<CompressedSparseData<f64>> {
        let n = self.n_samples();
        let nnz: usize = self.indices.iter().map(|r| r.len()).sum();

        let mut rows = Vec::with_capacity(nnz);
        let mut cols = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        for (i, (idx, w)) in self.indices.iter().zip(self.weights.iter()).enumerate() {
            ensure_dim!("weight table width", idx.len(), w.len());
            for (&j, &w_ij) in idx.iter().zip(w.iter()) {
                rows.push(i);
                cols.push(j);
                values.push(w_ij);
            }
        }

        CompressedSparseData::from_triplets(&rows, &cols, &values, (n, n))
    }

    /// Reorder the graph to follow another label order
    ///
    /// Rows are permuted and neighbour indices are remapped so that they keep
    /// pointing to the same samples.
    ///
    /// ### Params
    ///
    /// * `target` - The wanted sample order. Needs to hold exactly the labels
    ///   of the graph.
    ///
    /// ### Returns
    ///
    /// The reordered graph, or a `LabelMismatch` / `ShapeMismatch` if the
    /// labels cannot be aligned.
    pub fn align_to(&self, target: &[String]) -> Result<Self> {
        if self.labels.as_slice() == target {
            return Ok(self.clone());
        }

        let perm = label_permutation(&self.labels, target)?;
        let mut new_position = vec![0_usize; perm.len()];
        for (p, &src) in perm.iter().enumerate() {
            new_position[src] = p;
        }

        let indices = perm
            .iter()
            .map(|&src| {
                self.indices[src]
                    .iter()
                    .map(|&j| new_position[j])
                    .collect()
            })
            .collect();
        let weights = perm.iter().map(|&src| self.weights[src].clone()).collect();

        Ok(Self {
            labels: target.to_vec(),
            indices,
            weights,
        })
    }
}

////////////////////
// Main functions //
////////////////////

/// Neighbours and kernel weights from any nearest neighbour oracle
///
/// The oracle is asked for `n_neighbours + 1` hits and the first hit of every
/// sample is dropped by position, as it is the sample itself for distinct
/// points. With duplicated points the dropped hit may be a twin with a lower
/// index and the sample then shows up among its own neighbours.
///
/// ### Params
///
/// * `oracle` - The nearest neighbour search over the samples.
/// * `labels` - Sample labels in the order of the oracle's samples.
/// * `n_neighbours` - Number of neighbours per sample.
/// * `neighbourhood_factor` - Controls the kernel bandwidth, see
///   [`compute_weights`].
///
/// ### Returns
///
/// The `NeighbourGraph`
pub fn neighbours_and_weights_with<S>(
    oracle: &S,
    labels: &[String],
    n_neighbours: usize,
    neighbourhood_factor: f64,
) -> Result<NeighbourGraph>
where
    S: NearestNeighbourSearch + ?Sized,
{
    let n_samples = oracle.n_samples();
    ensure_dim!("sample labels", n_samples, labels.len());

    if n_neighbours == 0 {
        return Err(HotspotError::invalid_parameter(
            "n_neighbours",
            n_neighbours,
            "needs to be at least 1",
        ));
    }
    if !(neighbourhood_factor.is_finite() && neighbourhood_factor > 0.0) {
        return Err(HotspotError::invalid_parameter(
            "neighbourhood_factor",
            neighbourhood_factor,
            "needs to be a positive number",
        ));
    }
    if radius_index(n_neighbours, neighbourhood_factor) > n_neighbours {
        return Err(HotspotError::invalid_parameter(
            "neighbourhood_factor",
            neighbourhood_factor,
            "bandwidth rank exceeds the number of neighbours",
        ));
    }
    if n_neighbours + 1 > n_samples {
        return Err(HotspotError::invalid_parameter(
            "n_neighbours",
            n_neighbours,
            format!("needs to be smaller than the number of samples ({})", n_samples),
        ));
    }

    let start = Instant::now();
    let knn = oracle.k_nearest(n_neighbours + 1);
    debug!(
        "kNN search for {} samples with k = {}: {:.2?}",
        n_samples,
        n_neighbours + 1,
        start.elapsed()
    );

    let indices: Vec<Vec<usize>> = knn.indices.into_iter().map(|r| r[1..].to_vec()).collect();
    let distances: Vec<Vec<f64>> = knn
        .distances
        .into_iter()
        .map(|r| r[1..].to_vec())
        .collect();

    let weights = compute_weights(&distances, neighbourhood_factor);

    NeighbourGraph::new(labels.to_vec(), indices, weights)
}

/// Neighbours and kernel weights from sample coordinates
///
/// Uses an exact k-d tree under Euclidean distance on the rows of
/// `coordinates`.
///
/// ### Params
///
/// * `coordinates` - Samples x features, row labels identify the samples.
/// * `n_neighbours` - Number of neighbours per sample (default 30).
/// * `neighbourhood_factor` - Controls the kernel bandwidth (default 3).
///
/// ### Returns
///
/// The `NeighbourGraph` aligned to the rows of `coordinates`
pub fn neighbours_and_weights(
    coordinates: &LabelledMatrix,
    n_neighbours: usize,
    neighbourhood_factor: f64,
) -> Result<NeighbourGraph> {
    let start = Instant::now();
    let tree = KdTree::new(coordinates.as_ref());
    debug!(
        "k-d tree over {} samples x {} features: {:.2?}",
        coordinates.nrows(),
        coordinates.ncols(),
        start.elapsed()
    );

    neighbours_and_weights_with(
        &tree,
        &coordinates.row_labels,
        n_neighbours,
        neighbourhood_factor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::labelled::default_labels;
    use crate::core::graph::knn::BruteForceSearch;
    use faer::Mat;
    use rand::prelude::*;
    use std::collections::BTreeSet;

    fn line_coords(n: usize) -> LabelledMatrix {
        LabelledMatrix::with_default_labels(Mat::from_fn(n, 1, |i, _| i as f64))
    }

    fn random_coords(n: usize, seed: u64) -> LabelledMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = Mat::from_fn(n, 3, |_, _| rng.random_range(0.0..50.0));
        LabelledMatrix::new(
            data,
            (0..n).map(|i| format!("cell_{}", i)).collect(),
            default_labels(3),
        )
        .unwrap()
    }

    #[test]
    fn test_line_of_five() {
        let graph = neighbours_and_weights(&line_coords(5), 2, 3.0).unwrap();

        assert_eq!(graph.n_samples(), 5);
        assert_eq!(graph.n_neighbours(), 2);
        assert_eq!(graph.indices[0], vec![1, 2]);
        assert_eq!(graph.indices[2], vec![1, 3]);
        assert_eq!(graph.indices[4], vec![3, 2]);

        for (i, row) in graph.weights.iter().enumerate() {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            assert!(!graph.indices[i].contains(&i));
        }
        // interior samples see both neighbours at distance 1
        for row in &graph.weights[1..4] {
            assert!((row[0] - row[1]).abs() < 1e-12);
        }
        assert!(graph.weights[0][0] > graph.weights[0][1]);
    }

    #[test]
    fn test_graph_invariants_random() {
        let coords = random_coords(120, 7);
        let graph = neighbours_and_weights(&coords, 10, 3.0).unwrap();

        assert_eq!(graph.labels, coords.row_labels);
        assert!(graph.validate().is_ok());
        for (i, (idx, w)) in graph.indices.iter().zip(graph.weights.iter()).enumerate() {
            assert_eq!(idx.len(), 10);
            assert!(!idx.contains(&i));
            let unique: BTreeSet<usize> = idx.iter().copied().collect();
            assert_eq!(unique.len(), 10);
            assert!(w.iter().all(|&x| x >= 0.0));
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_idempotent() {
        let coords = random_coords(80, 11);
        let a = neighbours_and_weights(&coords, 8, 3.0).unwrap();
        let b = neighbours_and_weights(&coords, 8, 3.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_oracles_agree() {
        let coords = random_coords(90, 3);
        let brute = BruteForceSearch::new(coords.as_ref());

        let from_tree = neighbours_and_weights(&coords, 6, 2.0).unwrap();
        let from_brute =
            neighbours_and_weights_with(&brute, &coords.row_labels, 6, 2.0).unwrap();

        assert_eq!(from_tree, from_brute);
    }

    #[test]
    fn test_positional_self_drop_with_duplicates() {
        // samples 0 and 1 share a position
        let coords = LabelledMatrix::with_default_labels(Mat::from_fn(5, 1, |i, _| {
            [0.0, 0.0, 1.0, 3.0, 6.0][i]
        }));
        let graph = neighbours_and_weights(&coords, 2, 3.0).unwrap();

        // sample 0 drops itself
        assert_eq!(graph.indices[0], vec![1, 2]);
        // sample 1 drops its twin (sample 0) and keeps itself
        assert_eq!(graph.indices[1], vec![1, 2]);
        // the self hit sits at distance 0 which collapses the bandwidth
        assert_eq!(graph.weights[1], vec![0.0, 0.0]);
        assert_eq!(graph.weight_sums()[1], 0.0);
    }

    #[test]
    fn test_invalid_parameters() {
        let coords = line_coords(5);
        assert!(matches!(
            neighbours_and_weights(&coords, 0, 3.0),
            Err(HotspotError::InvalidParameter { name: "n_neighbours", .. })
        ));
        assert!(matches!(
            neighbours_and_weights(&coords, 5, 3.0),
            Err(HotspotError::InvalidParameter { name: "n_neighbours", .. })
        ));
        assert!(matches!(
            neighbours_and_weights(&coords, 2, 0.0),
            Err(HotspotError::InvalidParameter { name: "neighbourhood_factor", .. })
        ));
        assert!(matches!(
            neighbours_and_weights(&coords, 2, 0.5),
            Err(HotspotError::InvalidParameter { name: "neighbourhood_factor", .. })
        ));
        assert!(neighbours_and_weights(&coords, 4, 3.0).is_ok());

        let tree = KdTree::new(coords.as_ref());
        assert!(matches!(
            neighbours_and_weights_with(&tree, &default_labels(4), 2, 3.0),
            Err(HotspotError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_sparse_round_trip() {
        let coords = random_coords(60, 5);
        let graph = neighbours_and_weights(&coords, 7, 3.0).unwrap();
        let sparse = graph.to_sparse().unwrap();

        assert_eq!(sparse.shape(), (60, 60));
        assert_eq!(sparse.get_nnz(), 60 * 7);

        let dense = sparse.to_dense_matrix();
        for i in 0..60 {
            assert_eq!(dense[(i, i)], 0.0);

            let mut expected: Vec<(usize, f64)> = graph.indices[i]
                .iter()
                .copied()
                .zip(graph.weights[i].iter().copied())
                .collect();
            expected.sort_by_key(|&(j, _)| j);
            let found: Vec<(usize, f64)> = sparse.row_entries(i).collect();

            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_sparse_sums_repeated_neighbours() {
        let graph = NeighbourGraph::new(
            default_labels(3),
            vec![vec![1, 1], vec![0, 2], vec![0, 1]],
            vec![vec![0.25, 0.75], vec![0.5, 0.5], vec![0.9, 0.1]],
        )
        .unwrap();
        let sparse = graph.to_sparse().unwrap();

        assert_eq!(sparse.row_entries(0).collect::<Vec<_>>(), vec![(1, 1.0)]);
        assert_eq!(sparse.row_sums(), graph.weight_sums());
    }

    #[test]
    fn test_new_rejects_bad_tables() {
        assert!(NeighbourGraph::new(
            default_labels(2),
            vec![vec![1], vec![0]],
            vec![vec![1.0], vec![1.0, 0.0]],
        )
        .is_err());
        assert!(NeighbourGraph::new(
            default_labels(2),
            vec![vec![1], vec![2]],
            vec![vec![1.0], vec![1.0]],
        )
        .is_err());
        assert!(NeighbourGraph::new(default_labels(3), vec![vec![1]], vec![vec![1.0]]).is_err());
    }

    #[test]
    fn test_align_to_permutation() {
        let coords = random_coords(40, 9);
        let graph = neighbours_and_weights(&coords, 5, 3.0).unwrap();

        let mut target = coords.row_labels.clone();
        target.reverse();
        let aligned = graph.align_to(&target).unwrap();

        assert_eq!(aligned.labels, target);
        for (p, label) in target.iter().enumerate() {
            let src = graph.labels.iter().position(|l| l == label).unwrap();
            assert_eq!(aligned.weights[p], graph.weights[src]);
            let orig: Vec<&String> = graph.indices[src]
                .iter()
                .map(|&j| &graph.labels[j])
                .collect();
            let new: Vec<&String> = aligned.indices[p]
                .iter()
                .map(|&j| &aligned.labels[j])
                .collect();
            assert_eq!(orig, new);
        }

        assert_eq!(graph.align_to(&graph.labels).unwrap(), graph);
        assert!(graph.align_to(&default_labels(40)).is_err());
    }

    #[test]
    fn test_weight_sums() {
        let graph = NeighbourGraph::new(
            default_labels(3),
            vec![vec![1, 2], vec![0, 2], vec![0, 1]],
            vec![vec![0.5, 0.5], vec![1.0, 0.0], vec![0.0, 0.0]],
        )
        .unwrap();
        assert_eq!(graph.weight_sums(), vec![1.0, 1.0, 0.0]);
        assert_eq!(graph.squared_weight_sums(), vec![0.5, 1.0, 0.0]);
    }
}
