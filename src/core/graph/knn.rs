use faer::MatRef;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

///////////////////////
// Oracle definition //
///////////////////////

/// Result of a k-nearest neighbour query
///
/// ### Fields
///
/// * `indices` - Per sample the indices of the nearest samples, sorted by
///   ascending distance. The sample itself is part of the result.
/// * `distances` - The corresponding Euclidean distances.
#[derive(Clone, Debug, PartialEq)]
pub struct KnnResult {
    pub indices: Vec<Vec<usize>>,
    pub distances: Vec<Vec<f64>>,
}

/// Exact nearest neighbour search over a fixed set of samples
///
/// Every indexed sample is queried against the index itself, hence the sample
/// will (usually) be its own first hit at distance `0`. Ties in distance are
/// broken by the sample index.
pub trait NearestNeighbourSearch {
    /// Number of indexed samples
    fn n_samples(&self) -> usize;

    /// The `k` nearest samples of every indexed sample
    ///
    /// ### Params
    ///
    /// * `k` - Number of neighbours to return (self included). Needs to be
    ///   `<= n_samples()`.
    fn k_nearest(&self, k: usize) -> KnnResult;
}

/// Helper struct for the kNN heap
///
/// Ordered by squared distance first and index second, so the top of a
/// `BinaryHeap` is the current worst candidate.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    dist_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keep `candidate` if it beats the current worst of a full heap
#[inline]
fn offer(heap: &mut BinaryHeap<Candidate>, k: usize, candidate: Candidate) {
    if heap.len() < k {
        heap.push(candidate);
    } else if let Some(worst) = heap.peek() {
        if candidate < *worst {
            heap.pop();
            heap.push(candidate);
        }
    }
}

/// Turn a heap into the sorted (indices, distances) pair
fn heap_to_sorted(heap: BinaryHeap<Candidate>) -> (Vec<usize>, Vec<f64>) {
    heap.into_sorted_vec()
        .into_iter()
        .map(|c| (c.index, c.dist_sq.sqrt()))
        .unzip()
}

/// Squared Euclidean distance
#[inline]
fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Copy the rows of the matrix into owned vectors
fn matrix_to_points(mat: MatRef<f64>) -> Vec<Vec<f64>> {
    (0..mat.nrows())
        .map(|i| mat.row(i).iter().copied().collect())
        .collect()
}

/// Collect the per-sample query results into a `KnnResult`
fn collect_results(res: Vec<(Vec<usize>, Vec<f64>)>) -> KnnResult {
    let (indices, distances) = res.into_iter().unzip();
    KnnResult { indices, distances }
}

/////////////////
// Brute force //
/////////////////

/// Exact search by comparing every sample against every other one
///
/// ### Fields
///
/// * `points` - The samples (rows of the input matrix)
pub struct BruteForceSearch {
    points: Vec<Vec<f64>>,
}

impl BruteForceSearch {
    /// Generate the search structure
    ///
    /// ### Params
    ///
    /// * `mat` - Matrix with rows = samples and columns = features.
    pub fn new(mat: MatRef<f64>) -> Self {
        Self {
            points: matrix_to_points(mat),
        }
    }
}

impl NearestNeighbourSearch for BruteForceSearch {
    fn n_samples(&self) -> usize {
        self.points.len()
    }

    fn k_nearest(&self, k: usize) -> KnnResult {
        let res: Vec<(Vec<usize>, Vec<f64>)> = self
            .points
            .par_iter()
            .map(|query| {
                let mut heap = BinaryHeap::with_capacity(k + 1);
                for (index, point) in self.points.iter().enumerate() {
                    let candidate = Candidate {
                        dist_sq: squared_euclidean(query, point),
                        index,
                    };
                    offer(&mut heap, k, candidate);
                }
                heap_to_sorted(heap)
            })
            .collect();

        collect_results(res)
    }
}

/////////////
// k-d tree //
/////////////

/// Node of the k-d tree
///
/// ### Fields
///
/// * `point_idx` - Index of the sample stored in this node.
/// * `split_dim` - Feature along which the node splits.
/// * `left` - Child with values `<=` the split value.
/// * `right` - Child with values `>=` the split value.
#[derive(Debug)]
struct KdNode {
    point_idx: usize,
    split_dim: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Exact k-d tree for Euclidean k-nearest neighbour queries
///
/// Construction splits at the median of the cycling feature dimension. Queries
/// visit the nearer side first and only descend into the far side when the
/// splitting plane is not further away than the current k-th candidate.
///
/// ### Fields
///
/// * `nodes` - The tree nodes, index 0 is the root.
/// * `points` - The samples (rows of the input matrix).
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<Vec<f64>>,
}

impl KdTree {
    /// Build a k-d tree from the rows of a matrix
    ///
    /// ### Params
    ///
    /// * `mat` - Matrix with rows = samples and columns = features.
    ///
    /// ### Returns
    ///
    /// The initialised tree ready for querying
    pub fn new(mat: MatRef<f64>) -> Self {
        let points = matrix_to_points(mat);
        let mut nodes = Vec::with_capacity(points.len());
        let mut indices: Vec<usize> = (0..points.len()).collect();

        if !points.is_empty() {
            Self::build_node(&points, &mut indices, 0, &mut nodes);
        }

        Self { nodes, points }
    }

    /// Recursively builds the tree nodes
    ///
    /// ### Params
    ///
    /// * `points` - All samples.
    /// * `items` - The sample indices to place below this node.
    /// * `depth` - Current depth (defines the split dimension).
    /// * `nodes` - Growing list of tree nodes.
    ///
    /// ### Returns
    ///
    /// Index of the created node
    fn build_node(
        points: &[Vec<f64>],
        items: &mut [usize],
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> usize {
        let dim = points[0].len().max(1);
        let split_dim = depth % dim;
        let mid = items.len() / 2;

        // feature-less data still builds a (degenerate) tree
        if points[0].is_empty() {
            items.sort_unstable();
        } else {
            items.select_nth_unstable_by(mid, |&a, &b| {
                points[a][split_dim]
                    .total_cmp(&points[b][split_dim])
                    .then_with(|| a.cmp(&b))
            });
        }

        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx: items[mid],
            split_dim,
            left: None,
            right: None,
        });

        let (left_items, rest) = items.split_at_mut(mid);
        let right_items = &mut rest[1..];

        let left = if left_items.is_empty() {
            None
        } else {
            Some(Self::build_node(points, left_items, depth + 1, nodes))
        };
        let right = if right_items.is_empty() {
            None
        } else {
            Some(Self::build_node(points, right_items, depth + 1, nodes))
        };

        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        node_idx
    }

    /// The k nearest samples to an arbitrary query point
    ///
    /// ### Params
    ///
    /// * `query` - The query point (same number of features as the index).
    /// * `k` - Number of neighbours.
    ///
    /// ### Returns
    ///
    /// Tuple of `(indices, distances)` sorted by ascending distance
    pub fn query(&self, query: &[f64], k: usize) -> (Vec<usize>, Vec<f64>) {
        if self.nodes.is_empty() || k == 0 {
            return (Vec::new(), Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.knn_recursive(0, query, k, &mut heap);

        heap_to_sorted(heap)
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        query: &[f64],
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_idx];
        let point = &self.points[node.point_idx];

        offer(
            heap,
            k,
            Candidate {
                dist_sq: squared_euclidean(query, point),
                index: node.point_idx,
            },
        );

        let diff = if point.is_empty() {
            0.0
        } else {
            query[node.split_dim] - point[node.split_dim]
        };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, query, k, heap);
        }

        // equal distances still need a visit for the index tie-break
        let worst = if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map_or(f64::INFINITY, |c| c.dist_sq)
        };

        if diff * diff <= worst {
            if let Some(child) = second {
                self.knn_recursive(child, query, k, heap);
            }
        }
    }
}

impl NearestNeighbourSearch for KdTree {
    fn n_samples(&self) -> usize {
        self.points.len()
    }

    fn k_nearest(&self, k: usize) -> KnnResult {
        let res: Vec<(Vec<usize>, Vec<f64>)> = self
            .points
            .par_iter()
            .map(|query| self.query(query, k))
            .collect();

        collect_results(res)
    }
}
