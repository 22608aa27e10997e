/// Default ratio between the number of neighbours and the rank of the
/// neighbour that defines the kernel bandwidth
pub const DEFAULT_NEIGHBOURHOOD_FACTOR: f64 = 3.0;

/// Rank (1-indexed) of the neighbour whose distance is the kernel bandwidth
///
/// ### Params
///
/// * `n_neighbours` - Number of neighbours per sample.
/// * `neighbourhood_factor` - Ratio of `n_neighbours` to the bandwidth rank.
///
/// ### Returns
///
/// `ceil(n_neighbours / neighbourhood_factor)`
pub fn radius_index(n_neighbours: usize, neighbourhood_factor: f64) -> usize {
    (n_neighbours as f64 / neighbourhood_factor).ceil() as usize
}

/// Gaussian kernel weights with adaptive bandwidth
///
/// For every sample the distance to its `radius_index`-th neighbour is used as
/// the bandwidth `sigma`. The raw weight of a neighbour at distance `d` is
/// `exp(-d^2 / sigma^2)` and each row is normalised to sum to one. A row with a
/// collapsed bandwidth (`sigma == 0`, i.e. coincident points) has all raw
/// weights set to 0; its sum of 0 is replaced by a divisor of 1, so the row
/// stays all zero.
///
/// ### Params
///
/// * `distances` - Distances to the neighbours (samples x neighbours), sorted
///   ascending per row and excluding the sample itself.
/// * `neighbourhood_factor` - See [`radius_index`]. Must be `> 0`.
///
/// ### Returns
///
/// The weights in the same shape as `distances`.
///
/// ### Panics
///
/// If a row has fewer than `radius_index` entries, e.g. with zero neighbours
/// or a `neighbourhood_factor` below 1 that pushes the rank past the width.
pub fn compute_weights(distances: &[Vec<f64>], neighbourhood_factor: f64) -> Vec<Vec<f64>> {
    let Some(first) = distances.first() else {
        return Vec::new();
    };
    let radius_ii = radius_index(first.len(), neighbourhood_factor);

    distances
        .iter()
        .map(|row| {
            let sigma = row[radius_ii - 1];
            let sigma_sq = sigma * sigma;

            let raw: Vec<f64> = if sigma_sq == 0.0 {
                vec![0.0; row.len()]
            } else {
                row.iter().map(|&d| (-(d * d) / sigma_sq).exp()).collect()
            };

            let mut norm: f64 = raw.iter().sum();
            if norm == 0.0 {
                norm = 1.0;
            }

            raw.into_iter().map(|w| w / norm).collect()
        })
        .collect()
}
