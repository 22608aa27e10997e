use faer::{Mat, MatRef};
use std::ops::AddAssign;

use crate::ensure_dim;
use crate::error::{HotspotError, Result};

////////////////
// Structures //
////////////////

/// Structure for compressed sparse row (CSR) data
///
/// ### Fields
///
/// * `data` - The non-zero values.
/// * `indices` - Column index of every value.
/// * `indptr` - Row pointers; row `i` lives in `indptr[i]..indptr[i + 1]`.
/// * `shape` - `(nrow, ncol)` of the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedSparseData<T> {
    pub data: Vec<T>,
    pub indices: Vec<usize>,
    pub indptr: Vec<usize>,
    pub shape: (usize, usize),
}

impl<T> CompressedSparseData<T>
where
    T: Copy + Default + AddAssign,
{
    /// Generate a CSR matrix from coordinate triplets
    ///
    /// Entries sharing the same `(row, col)` are summed, not overwritten.
    /// Within each row the entries end up sorted by column.
    ///
    /// ### Params
    ///
    /// * `rows` - Row index of each value.
    /// * `cols` - Column index of each value.
    /// * `values` - The values.
    /// * `shape` - `(nrow, ncol)` of the matrix.
    ///
    /// ### Returns
    ///
    /// The assembled matrix or a `ShapeMismatch` if the triplet vectors differ
    /// in length or an index falls outside of `shape`.
    pub fn from_triplets(
        rows: &[usize],
        cols: &[usize],
        values: &[T],
        shape: (usize, usize),
    ) -> Result<Self> {
        crate::ensure_same_len!("sparse triplets", rows, cols, values);
        let (nrow, ncol) = shape;

        // counting sort by row
        let mut row_counts = vec![0_usize; nrow + 1];
        for (&r, &c) in rows.iter().zip(cols.iter()) {
            if r >= nrow {
                return Err(HotspotError::ShapeMismatch {
                    what: "sparse row index",
                    expected: nrow,
                    found: r,
                });
            }
            if c >= ncol {
                return Err(HotspotError::ShapeMismatch {
                    what: "sparse column index",
                    expected: ncol,
                    found: c,
                });
            }
            row_counts[r + 1] += 1;
        }
        for i in 0..nrow {
            row_counts[i + 1] += row_counts[i];
        }

        let mut next = row_counts[..nrow].to_vec();
        let mut by_row: Vec<(usize, T)> = vec![(0, T::default()); values.len()];
        for ((&r, &c), &v) in rows.iter().zip(cols.iter()).zip(values.iter()) {
            by_row[next[r]] = (c, v);
            next[r] += 1;
        }

        // sort within rows and sum up duplicates
        let mut data = Vec::with_capacity(values.len());
        let mut indices = Vec::with_capacity(values.len());
        let mut indptr = Vec::with_capacity(nrow + 1);
        indptr.push(0_usize);

        for i in 0..nrow {
            let row = &mut by_row[row_counts[i]..row_counts[i + 1]];
            row.sort_by_key(|&(c, _)| c);

            let row_start = indices.len();
            for &(c, v) in row.iter() {
                if indices.len() > row_start && indices[indices.len() - 1] == c {
                    let last = data.len() - 1;
                    data[last] += v;
                } else {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Ok(Self {
            data,
            indices,
            indptr,
            shape,
        })
    }

    /// Returns the shape of the matrix as `(nrow, ncol)`
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Returns the number of stored values
    pub fn get_nnz(&self) -> usize {
        self.data.len()
    }

    /// The stored `(column, value)` pairs of a row
    ///
    /// ### Params
    ///
    /// * `i` - The row index
    pub fn row_entries(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.indptr[i]..self.indptr[i + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }
}

impl CompressedSparseData<f64> {
    /// Dense representation of the matrix
    pub fn to_dense_matrix(&self) -> Mat<f64> {
        let mut dense = Mat::zeros(self.shape.0, self.shape.1);

        for i in 0..self.shape.0 {
            for (j, v) in self.row_entries(i) {
                dense[(i, j)] = v;
            }
        }

        dense
    }

    /// Row sums of the matrix
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.shape.0)
            .map(|i| self.row_entries(i).map(|(_, v)| v).sum())
            .collect()
    }

    /// Calculate `X · Aᵀ` with `A` being this sparse matrix
    ///
    /// Equivalent to `(A · Xᵀ)ᵀ`. With `A` as a samples x samples neighbour
    /// weight matrix and `X` as variables x samples this yields the weighted
    /// neighbour sums per variable and sample.
    ///
    /// ### Params
    ///
    /// * `x` - Dense matrix with `A.ncol` columns.
    ///
    /// ### Returns
    ///
    /// Dense matrix of `x.nrows() x A.nrow`
    pub fn dense_mul_transposed(&self, x: MatRef<f64>) -> Result<Mat<f64>> {
        ensure_dim!("sparse x dense product", self.shape.1, x.ncols());

        let n_vars = x.nrows();
        let mut res: Mat<f64> = Mat::zeros(n_vars, self.shape.0);

        for i in 0..self.shape.0 {
            for (j, w) in self.row_entries(i) {
                for g in 0..n_vars {
                    res[(g, i)] += w * x[(g, j)];
                }
            }
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn test_from_triplets_to_dense() {
        // [1 0 2]
        // [0 3 0]
        // [4 0 5]
        let rows = vec![2, 0, 1, 0, 2];
        let cols = vec![2, 2, 1, 0, 0];
        let vals = vec![5.0, 2.0, 3.0, 1.0, 4.0];

        let sparse = CompressedSparseData::from_triplets(&rows, &cols, &vals, (3, 3)).unwrap();

        assert_eq!(sparse.data, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sparse.indices, vec![0, 2, 1, 0, 2]);
        assert_eq!(sparse.indptr, vec![0, 2, 3, 5]);
        assert_eq!(
            sparse.to_dense_matrix(),
            mat![[1.0, 0.0, 2.0], [0.0, 3.0, 0.0], [4.0, 0.0, 5.0]]
        );
    }

    #[test]
    fn test_duplicates_are_summed() {
        let rows = vec![0, 0, 1, 0];
        let cols = vec![1, 1, 0, 1];
        let vals = vec![0.25, 0.5, 1.0, 0.125];

        let sparse = CompressedSparseData::from_triplets(&rows, &cols, &vals, (2, 2)).unwrap();

        assert_eq!(sparse.get_nnz(), 2);
        assert_eq!(sparse.row_entries(0).collect::<Vec<_>>(), vec![(1, 0.875)]);
        assert_eq!(sparse.row_entries(1).collect::<Vec<_>>(), vec![(0, 1.0)]);
    }

    #[test]
    fn test_empty_rows() {
        let sparse =
            CompressedSparseData::from_triplets(&[2], &[0], &[1.5], (4, 3)).unwrap();
        assert_eq!(sparse.indptr, vec![0, 0, 0, 1, 1]);
        assert_eq!(sparse.row_entries(0).count(), 0);
        assert_eq!(sparse.row_sums(), vec![0.0, 0.0, 1.5, 0.0]);
    }

    #[test]
    fn test_out_of_bounds_triplets() {
        let err = CompressedSparseData::from_triplets(&[0], &[3], &[1.0], (3, 3)).unwrap_err();
        assert!(matches!(err, HotspotError::ShapeMismatch { .. }));

        let err = CompressedSparseData::from_triplets(&[0, 1], &[0], &[1.0], (3, 3)).unwrap_err();
        assert!(matches!(err, HotspotError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_dense_mul_transposed() {
        let a = CompressedSparseData::from_triplets(
            &[0, 0, 1, 2],
            &[1, 2, 0, 0],
            &[0.5, 0.5, 1.0, 2.0],
            (3, 3),
        )
        .unwrap();
        let x = mat![[1.0, 2.0, 3.0], [0.0, -1.0, 4.0]];

        let res = a.dense_mul_transposed(x.as_ref()).unwrap();
        let dense = a.to_dense_matrix();
        let expected = x.as_ref() * dense.transpose();

        assert_eq!((res.nrows(), res.ncols()), (2, 3));
        for g in 0..2 {
            for i in 0..3 {
                assert!((res[(g, i)] - expected[(g, i)]).abs() < 1e-12);
            }
        }
        assert!((res[(0, 0)] - 2.5).abs() < 1e-12);

        let wrong = mat![[1.0, 2.0]];
        assert!(a.dense_mul_transposed(wrong.as_ref()).is_err());
    }
}
