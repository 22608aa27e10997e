use faer::{Mat, MatRef};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::core::data::labelled::LabelledMatrix;
use crate::error::{HotspotError, Result};

/////////////////////
// Enums | Helpers //
/////////////////////

/// Which tail(s) of the standard normal to use for the p-values
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TestAlternative {
    /// Two sided test for the Z-score
    #[default]
    TwoSided,
    /// One-sided test for greater than (hotspots)
    Greater,
    /// One-sided test for lesser than (coldspots)
    Less,
}

/// Helper function to get the test alternative
///
/// ### Params
///
/// * `s` - String, type of test to run.
///
/// ### Returns
///
/// Option of the `TestAlternative`
pub fn get_test_alternative(s: &str) -> Option<TestAlternative> {
    match s.to_lowercase().as_str() {
        "greater" => Some(TestAlternative::Greater),
        "less" => Some(TestAlternative::Less),
        "twosided" => Some(TestAlternative::TwoSided),
        _ => None,
    }
}

/// Standard normal distribution
fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| HotspotError::Distribution(e.to_string()))
}

/// P-value of a single Z-score against an already constructed normal
#[inline]
fn z_to_pval(normal: &Normal, z: f64, alternative: TestAlternative) -> f64 {
    match alternative {
        TestAlternative::TwoSided => 2.0 * normal.sf(z.abs()),
        TestAlternative::Greater => normal.sf(z),
        TestAlternative::Less => normal.cdf(z),
    }
}

/////////////////////////
// Summary statistics  //
/////////////////////////

/// Arithmetic mean of a slice
///
/// Returns `NaN` for an empty slice.
pub fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample standard deviation (denominator `n - 1`)
///
/// ### Params
///
/// * `x` - The values
///
/// ### Returns
///
/// The standard deviation. `NaN` when fewer than two values are supplied.
pub fn std_dev_sample(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m) * (v - m)).sum();

    (ss / (n - 1.0)).sqrt()
}

/// Row-wise mean and sample standard deviation of a matrix
///
/// ### Params
///
/// * `mat` - Matrix with variables as rows
///
/// ### Returns
///
/// Tuple of `(means, standard_deviations)`, one entry per row.
pub fn row_mean_sd(mat: MatRef<f64>) -> (Vec<f64>, Vec<f64>) {
    (0..mat.nrows())
        .map(|i| {
            let row: Vec<f64> = mat.row(i).iter().copied().collect();
            (mean(&row), std_dev_sample(&row))
        })
        .unzip()
}

//////////////////
// Significance //
//////////////////

/// Transform Getis-Ord scores into p-values
///
/// The G_i statistics are asymptotically standard normal under the null of no
/// spatial association.
///
/// ### Params
///
/// * `g_i` - The Getis-Ord scores
/// * `alternative` - Which tail(s) to test
///
/// ### Returns
///
/// The p-values, `NaN` wherever the score is `NaN`.
pub fn gi_to_pval(g_i: &[f64], alternative: TestAlternative) -> Result<Vec<f64>> {
    let normal = standard_normal()?;

    Ok(g_i
        .iter()
        .map(|&z| z_to_pval(&normal, z, alternative))
        .collect())
}

/// Matrix version of [`gi_to_pval`]
///
/// ### Params
///
/// * `g_i` - Getis-Ord scores (variables x samples)
/// * `alternative` - Which tail(s) to test
///
/// ### Returns
///
/// The p-values in the same shape as `g_i`
pub fn gi_to_pval_mat(g_i: MatRef<f64>, alternative: TestAlternative) -> Result<Mat<f64>> {
    let normal = standard_normal()?;

    Ok(Mat::from_fn(g_i.nrows(), g_i.ncols(), |i, j| {
        z_to_pval(&normal, g_i[(i, j)], alternative)
    }))
}

/// Labelled version of [`gi_to_pval_mat`]; labels are carried over.
pub fn gi_to_pval_labelled(
    g_i: &LabelledMatrix,
    alternative: TestAlternative,
) -> Result<LabelledMatrix> {
    let p_vals = gi_to_pval_mat(g_i.data.as_ref(), alternative)?;

    LabelledMatrix::new(p_vals, g_i.row_labels.clone(), g_i.col_labels.clone())
}
