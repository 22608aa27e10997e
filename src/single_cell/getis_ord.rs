use faer::{Mat, MatRef};
use std::time::Instant;
use tracing::debug;

use crate::core::base::stats::{mean, row_mean_sd, std_dev_sample};
use crate::core::data::labelled::LabelledMatrix;
use crate::core::graph::neighbours::NeighbourGraph;
use crate::ensure_dim;
use crate::error::Result;

/////////////
// Helpers //
/////////////

/// Per-sample part of the Getis-Ord denominator
///
/// `sqrt((n * S1_i - W_i^2) / (n - 1))` for every sample.
///
/// ### Params
///
/// * `w_i` - Sum of the neighbour weights per sample.
/// * `s1_i` - Sum of the squared neighbour weights per sample.
/// * `n` - Number of samples.
fn bandwidth_terms(w_i: &[f64], s1_i: &[f64], n: f64) -> Vec<f64> {
    w_i.iter()
        .zip(s1_i.iter())
        .map(|(&w, &s1)| ((n * s1 - w * w) / (n - 1.0)).sqrt())
        .collect()
}

//////////
// Main //
//////////

/// Getis-Ord G_i of a single variable
///
/// For every sample `i` with neighbour weights `w` this is
/// `(sum_r w[i,r] * x[nb[i,r]] - xbar * W_i) / (s * sqrt((n*S1_i - W_i^2) / (n-1)))`
/// with `xbar` and `s` (ddof = 1) taken over all of `x`. The sample itself
/// carries no weight.
///
/// A zero denominator is not guarded against; constant variables or samples
/// without any weight yield `NaN` or `inf`. [`compute_gi_batched`] guards.
///
/// ### Params
///
/// * `x` - The variable, one value per sample in graph order.
/// * `graph` - The weighted neighbour graph.
///
/// ### Returns
///
/// G_i per sample, or a `ShapeMismatch` if `x` does not match the graph or
/// the graph tables are malformed.
pub fn compute_gi_single(x: &[f64], graph: &NeighbourGraph) -> Result<Vec<f64>> {
    ensure_dim!("variable length vs. graph samples", graph.n_samples(), x.len());
    graph.validate()?;

    let n = x.len() as f64;
    let xbar = mean(x);
    let s = std_dev_sample(x);

    let w_i = graph.weight_sums();
    let s1_i = graph.squared_weight_sums();
    let bandwidth = bandwidth_terms(&w_i, &s1_i, n);

    let g_i = graph
        .indices
        .iter()
        .zip(graph.weights.iter())
        .enumerate()
        .map(|(i, (idx, w))| {
            let num: f64 = idx.iter().zip(w.iter()).map(|(&j, &w_ij)| w_ij * x[j]).sum();
            let offset = xbar * w_i[i];
            let denom = s * bandwidth[i];

            (num - offset) / denom
        })
        .collect();

    Ok(g_i)
}

/// Getis-Ord G_i for a whole variables x samples matrix
///
/// Same statistic as [`compute_gi_single`] for every row of `x`. The weight
/// sums are computed once per sample and the weighted neighbour sums for all
/// variables come out of a single sparse x dense product. Denominator entries
/// that are exactly 0 (constant variable or weightless sample) are replaced by
/// 1, so these entries end up as `num - offset` instead of `NaN`.
///
/// ### Params
///
/// * `x` - Variables x samples; columns follow the sample order of `graph`.
/// * `graph` - The weighted neighbour graph.
///
/// ### Returns
///
/// G_i as variables x samples, or a `ShapeMismatch` before any computation if
/// the inputs disagree or the graph tables are malformed.
pub fn compute_gi_batched(x: MatRef<f64>, graph: &NeighbourGraph) -> Result<Mat<f64>> {
    ensure_dim!("variable columns vs. graph samples", x.ncols(), graph.n_samples());
    graph.validate()?;

    let start = Instant::now();
    let (n_vars, n_samples) = x.shape();
    let n = n_samples as f64;

    // per sample
    let w_i = graph.weight_sums();
    let s1_i = graph.squared_weight_sums();
    let bandwidth = bandwidth_terms(&w_i, &s1_i, n);

    // per variable
    let (xbar, s) = row_mean_sd(x);

    let sparse_weights = graph.to_sparse()?;
    let mut g_i = sparse_weights.dense_mul_transposed(x)?;

    for j in 0..n_samples {
        for g in 0..n_vars {
            let offset = xbar[g] * w_i[j];
            let mut denom = s[g] * bandwidth[j];
            if denom == 0.0 {
                denom = 1.0;
            }
            g_i[(g, j)] = (g_i[(g, j)] - offset) / denom;
        }
    }

    debug!(
        "Getis-Ord for {} variables x {} samples ({} nnz): {:.2?}",
        n_vars,
        n_samples,
        sparse_weights.get_nnz(),
        start.elapsed()
    );

    Ok(g_i)
}

/// Labelled version of [`compute_gi_batched`]
///
/// The graph is first aligned to the column labels of `x`, so the sample order
/// of the two inputs does not need to agree, only their label sets.
///
/// ### Params
///
/// * `x` - Variables x samples with sample labels as column labels.
/// * `graph` - The weighted neighbour graph.
///
/// ### Returns
///
/// G_i with the row and column labels of `x`
pub fn compute_gi_labelled(x: &LabelledMatrix, graph: &NeighbourGraph) -> Result<LabelledMatrix> {
    let aligned = graph.align_to(&x.col_labels)?;
    let g_i = compute_gi_batched(x.as_ref(), &aligned)?;

    LabelledMatrix::new(g_i, x.row_labels.clone(), x.col_labels.clone())
}
