use grove_core::{ModelError, Result};

use crate::layout::transpose_blocked;

/// Dense, immutable `n_rows × n_cols` table of numeric features.
///
/// The values are kept twice: row-major for prediction, where one sample is
/// walked down a tree, and column-major for training, where split search
/// scans one feature across many samples.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<f64>,
    cols: Vec<f64>,
}

impl SampleMatrix {
    /// Builds a matrix from a flat row-major buffer
    pub fn from_row_major(n_rows: usize, n_cols: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != n_rows * n_cols {
            return Err(ModelError::DimensionMismatch {
                what: "row-major buffer length",
                expected: n_rows * n_cols,
                got: values.len(),
            });
        }
        let mut cols = vec![0.; values.len()];
        transpose_blocked(&values, n_rows, n_cols, &mut cols);
        Ok(SampleMatrix {
            n_rows: n_rows,
            n_cols: n_cols,
            rows: values,
            cols: cols,
        })
    }

    /// Builds a matrix from a slice of rows, which must all have the same width
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n_cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != n_cols {
                return Err(ModelError::DimensionMismatch {
                    what: "row width",
                    expected: n_cols,
                    got: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        SampleMatrix::from_row_major(rows.len(), n_cols, values)
    }

    /// Number of samples
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of features
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// True when the matrix holds no values
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    /// One sample's features
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i * self.n_cols..(i + 1) * self.n_cols]
    }

    #[inline]
    /// One feature's values across every sample
    pub fn column(&self, j: usize) -> &[f64] {
        &self.cols[j * self.n_rows..(j + 1) * self.n_rows]
    }

    #[inline]
    /// Value of feature `j` for sample `i`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i * self.n_cols + j]
    }

    /// Iterates over the samples in order
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// The whole row-major buffer
    pub fn as_row_major(&self) -> &[f64] {
        &self.rows
    }
}
