use std::time::Instant;
use tracing::info;

use crate::core::base::stats::{gi_to_pval_labelled, TestAlternative};
use crate::core::data::labelled::LabelledMatrix;
use crate::core::graph::kernel::{radius_index, DEFAULT_NEIGHBOURHOOD_FACTOR};
use crate::core::graph::neighbours::{neighbours_and_weights, NeighbourGraph, DEFAULT_N_NEIGHBOURS};
use crate::error::{HotspotError, Result};
use crate::single_cell::getis_ord::compute_gi_labelled;

////////////
// Params //
////////////

/// Structure to store the hotspot parameters
///
/// ### Fields
///
/// * `n_neighbours` - Number of neighbours per sample in the kNN graph.
/// * `neighbourhood_factor` - The kernel bandwidth of a sample is the
///   distance to its `ceil(n_neighbours / neighbourhood_factor)`-th
///   neighbour.
/// * `alternative` - Which tail(s) to use for the p-values.
/// * `verbose` - Controls verbosity of the function.
#[derive(Clone, Debug, PartialEq)]
pub struct HotspotParams {
    pub n_neighbours: usize,
    pub neighbourhood_factor: f64,
    pub alternative: TestAlternative,
    pub verbose: bool,
}

impl Default for HotspotParams {
    fn default() -> Self {
        Self {
            n_neighbours: DEFAULT_N_NEIGHBOURS,
            neighbourhood_factor: DEFAULT_NEIGHBOURHOOD_FACTOR,
            alternative: TestAlternative::TwoSided,
            verbose: false,
        }
    }
}

impl HotspotParams {
    /// Check the parameters
    ///
    /// Fails if `n_neighbours` is 0, if `neighbourhood_factor` is not a
    /// positive finite number, or if the bandwidth rank would exceed
    /// `n_neighbours`.
    pub fn validate(&self) -> Result<()> {
        if self.n_neighbours == 0 {
            return Err(HotspotError::invalid_parameter(
                "n_neighbours",
                self.n_neighbours,
                "needs to be at least 1",
            ));
        }
        if !(self.neighbourhood_factor.is_finite() && self.neighbourhood_factor > 0.0) {
            return Err(HotspotError::invalid_parameter(
                "neighbourhood_factor",
                self.neighbourhood_factor,
                "needs to be a positive finite number",
            ));
        }
        if radius_index(self.n_neighbours, self.neighbourhood_factor) > self.n_neighbours {
            return Err(HotspotError::invalid_parameter(
                "neighbourhood_factor",
                self.neighbourhood_factor,
                "bandwidth rank exceeds the number of neighbours",
            ));
        }

        Ok(())
    }
}

/////////////
// Results //
/////////////

/// Results of a hotspot run
///
/// ### Fields
///
/// * `neighbours` - The weighted kNN graph that was used.
/// * `gi` - Getis-Ord G_i (variables x samples).
/// * `p_values` - The corresponding p-values (variables x samples).
#[derive(Clone, Debug)]
pub struct HotspotResult {
    pub neighbours: NeighbourGraph,
    pub gi: LabelledMatrix,
    pub p_values: LabelledMatrix,
}

//////////
// Main //
//////////

/// Run the hotspot analysis
///
/// Builds the weighted kNN graph on the coordinates, computes the Getis-Ord
/// G_i of every variable at every sample and transforms them into p-values.
///
/// ### Params
///
/// * `coordinates` - Samples x features (e.g. a spatial layout or a PCA
///   embedding); row labels identify the samples.
/// * `expression` - Variables x samples; column labels need to be the same
///   set as the row labels of `coordinates`, in any order.
/// * `params` - The `HotspotParams`.
///
/// ### Returns
///
/// The `HotspotResult`
pub fn run_hotspot(
    coordinates: &LabelledMatrix,
    expression: &LabelledMatrix,
    params: &HotspotParams,
) -> Result<HotspotResult> {
    params.validate()?;

    let start_graph = Instant::now();
    let neighbours = neighbours_and_weights(
        coordinates,
        params.n_neighbours,
        params.neighbourhood_factor,
    )?;
    let end_graph = start_graph.elapsed();

    if params.verbose {
        info!(
            "Generated kNN graph ({} samples, k = {}): {:.2?}",
            neighbours.n_samples(),
            params.n_neighbours,
            end_graph
        );
    }

    let start_gi = Instant::now();
    let gi = compute_gi_labelled(expression, &neighbours)?;
    let end_gi = start_gi.elapsed();

    if params.verbose {
        info!(
            "Calculated Getis-Ord for {} variables: {:.2?}",
            gi.nrows(),
            end_gi
        );
    }

    let p_values = gi_to_pval_labelled(&gi, params.alternative)?;

    Ok(HotspotResult {
        neighbours,
        gi,
        p_values,
    })
}
