use faer::Mat;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use crate::core::data::labelled::LabelledMatrix;
use crate::error::{HotspotError, Result};

/// Mean of the background expression
const BACKGROUND_MEAN: f64 = 5.0;
/// Standard deviation of the background expression
const BACKGROUND_SD: f64 = 1.0;

////////////////
// Structures //
////////////////

/// Structure for synthetic spatial data with a planted hotspot
///
/// ### Fields
///
/// * `coordinates` - Cells x 2 lattice positions (columns `"x"`, `"y"`).
/// * `expression` - Genes x cells expression values.
/// * `hotspot_cells` - Indices of the cells inside the hotspot disc.
/// * `hotspot_genes` - Indices of the genes carrying the hotspot signal.
/// * `centre_cell` - Index of the cell at the centre of the hotspot.
#[derive(Clone, Debug)]
pub struct SyntheticSpatialData {
    pub coordinates: LabelledMatrix,
    pub expression: LabelledMatrix,
    pub hotspot_cells: Vec<usize>,
    pub hotspot_genes: Vec<usize>,
    pub centre_cell: usize,
}

/// Generate lattice data with one spatially localised expression hotspot
///
/// Cells sit on a regular `grid_side x grid_side` lattice with unit spacing;
/// cell `i` is at `(i % grid_side, i / grid_side)`. All genes draw from a
/// Normal(5, 1) background. The first `n_hotspot_genes` genes get `signal`
/// added in every cell within `grid_side / 6` of the centre cell.
///
/// ### Params
///
/// * `grid_side` - Cells per lattice side (total cells = `grid_side^2`).
/// * `n_genes` - Number of genes.
/// * `n_hotspot_genes` - How many genes carry the hotspot. Needs to be
///   `<= n_genes`.
/// * `signal` - Expression shift inside the hotspot.
/// * `seed` - Seed for reproducibility purposes.
///
/// ### Returns
///
/// The `SyntheticSpatialData`
pub fn generate_spatial_hotspot_data(
    grid_side: usize,
    n_genes: usize,
    n_hotspot_genes: usize,
    signal: f64,
    seed: u64,
) -> Result<SyntheticSpatialData> {
    if grid_side < 2 {
        return Err(HotspotError::invalid_parameter(
            "grid_side",
            grid_side,
            "needs at least 2 cells per side",
        ));
    }
    if n_hotspot_genes > n_genes {
        return Err(HotspotError::invalid_parameter(
            "n_hotspot_genes",
            n_hotspot_genes,
            format!("exceeds the number of genes ({})", n_genes),
        ));
    }
    if !signal.is_finite() {
        return Err(HotspotError::invalid_parameter(
            "signal",
            signal,
            "needs to be finite",
        ));
    }

    let n_cells = grid_side * grid_side;
    let centre = (grid_side - 1) / 2;
    let centre_cell = centre * grid_side + centre;
    let radius = grid_side as f64 / 6.0;

    let coordinates = Mat::from_fn(n_cells, 2, |i, j| {
        if j == 0 {
            (i % grid_side) as f64
        } else {
            (i / grid_side) as f64
        }
    });

    let hotspot_cells: Vec<usize> = (0..n_cells)
        .filter(|&i| {
            let dx = coordinates[(i, 0)] - centre as f64;
            let dy = coordinates[(i, 1)] - centre as f64;
            (dx * dx + dy * dy).sqrt() <= radius
        })
        .collect();

    let mut in_hotspot = vec![false; n_cells];
    for &i in &hotspot_cells {
        in_hotspot[i] = true;
    }

    let background = Normal::new(BACKGROUND_MEAN, BACKGROUND_SD)
        .map_err(|e| HotspotError::Distribution(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let expression = Mat::from_fn(n_genes, n_cells, |g, i| {
        let value = background.sample(&mut rng);
        if g < n_hotspot_genes && in_hotspot[i] {
            value + signal
        } else {
            value
        }
    });

    let cell_labels: Vec<String> = (0..n_cells).map(|i| format!("cell_{}", i)).collect();
    let gene_labels: Vec<String> = (0..n_genes).map(|g| format!("gene_{}", g)).collect();

    Ok(SyntheticSpatialData {
        coordinates: LabelledMatrix::new(
            coordinates,
            cell_labels.clone(),
            vec!["x".to_string(), "y".to_string()],
        )?,
        expression: LabelledMatrix::new(expression, gene_labels, cell_labels)?,
        hotspot_cells,
        hotspot_genes: (0..n_hotspot_genes).collect(),
        centre_cell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let data = generate_spatial_hotspot_data(12, 4, 2, 6.0, 42).unwrap();

        assert_eq!((data.coordinates.nrows(), data.coordinates.ncols()), (144, 2));
        assert_eq!((data.expression.nrows(), data.expression.ncols()), (4, 144));
        assert_eq!(data.coordinates.row_labels, data.expression.col_labels);
        assert_eq!(data.hotspot_genes, vec![0, 1]);

        // centre (5, 5), radius 2
        assert_eq!(data.centre_cell, 5 * 12 + 5);
        assert_eq!(data.hotspot_cells.len(), 13);
        assert!(data.hotspot_cells.contains(&data.centre_cell));
        assert!(!data.hotspot_cells.contains(&0));
    }

    #[test]
    fn test_signal_is_planted() {
        let data = generate_spatial_hotspot_data(18, 3, 1, 20.0, 7).unwrap();

        let mean_of = |g: usize, cells: &[usize]| {
            cells.iter().map(|&i| data.expression.data[(g, i)]).sum::<f64>() / cells.len() as f64
        };
        let outside: Vec<usize> = (0..324)
            .filter(|i| !data.hotspot_cells.contains(i))
            .collect();

        assert!(mean_of(0, &data.hotspot_cells) - mean_of(0, &outside) > 15.0);
        assert!((mean_of(1, &data.hotspot_cells) - mean_of(1, &outside)).abs() < 2.0);
    }

    #[test]
    fn test_reproducible() {
        let a = generate_spatial_hotspot_data(8, 3, 1, 4.0, 11).unwrap();
        let b = generate_spatial_hotspot_data(8, 3, 1, 4.0, 11).unwrap();
        assert_eq!(a.expression, b.expression);
    }

    #[test]
    fn test_invalid_input() {
        assert!(generate_spatial_hotspot_data(1, 3, 1, 4.0, 1).is_err());
        assert!(generate_spatial_hotspot_data(8, 3, 4, 4.0, 1).is_err());
        assert!(generate_spatial_hotspot_data(8, 3, 1, f64::NAN, 1).is_err());
    }
}
