//! Dataset
//! ---
//!
//! A training set couples a sample matrix with its label vector after the
//! shapes have been checked once.
use grove_core::impurity::num_classes;
use grove_core::{ModelError, Result};

use crate::datatypes::SampleMatrix;

/// Rows reaching a tree node.  Duplicates are allowed since bootstrap
/// sampling draws with replacement; every entry is below `n_rows`.
pub type IndexSet = Vec<usize>;

/// Every row of a table with `n_rows` samples, in order
pub fn all_indices(n_rows: usize) -> IndexSet {
    (0..n_rows).collect()
}

#[derive(Debug, Clone, Copy)]
/// Borrowed, validated training data
pub struct TrainingSet<'a> {
    /// Features for every sample
    pub x: &'a SampleMatrix,
    /// Dense class ids, one per sample
    pub y: &'a [u32],
    /// `max(y) + 1`
    pub n_classes: usize,
}

impl<'a> TrainingSet<'a> {
    /// Checks that the matrix is non-empty and that there is one label per row
    pub fn new(x: &'a SampleMatrix, y: &'a [u32]) -> Result<Self> {
        if x.n_rows() == 0 {
            return Err(ModelError::EmptyInput("no samples"));
        }
        if x.n_cols() == 0 {
            return Err(ModelError::EmptyInput("no features"));
        }
        if y.len() != x.n_rows() {
            return Err(ModelError::DimensionMismatch {
                what: "label count",
                expected: x.n_rows(),
                got: y.len(),
            });
        }
        Ok(TrainingSet {
            x: x,
            y: y,
            n_classes: num_classes(y),
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Always false for a validated set
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.x.n_cols()
    }

    /// Checks that every index addresses a row of this set
    pub fn check_indices(&self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Err(ModelError::EmptyInput("empty index set"));
        }
        match indices.iter().find(|&&i| i >= self.len()) {
            Some(&bad) => Err(ModelError::DimensionMismatch {
                what: "sample index bound",
                expected: self.len(),
                got: bad,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod dataset_tests {
    use super::*;

    fn matrix() -> SampleMatrix {
        SampleMatrix::from_rows(&[vec![1., 10.], vec![2., 10.], vec![3., 20.], vec![4., 20.]])
            .unwrap()
    }

    #[test]
    fn test_valid_set() {
        let x = matrix();
        let y = vec![0, 0, 1, 2];
        let set = TrainingSet::new(&x, &y).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.n_features(), 2);
        assert_eq!(set.n_classes, 3);
        assert!(set.check_indices(&[0, 3, 3]).is_ok());
        assert!(set.check_indices(&[0, 4]).is_err());
        assert!(set.check_indices(&[]).is_err());
    }

    #[test]
    fn test_label_mismatch() {
        let x = matrix();
        let y = vec![0, 1];
        match TrainingSet::new(&x, &y) {
            Err(ModelError::DimensionMismatch { expected, got, .. }) => {
                assert_eq!(expected, 4);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_inputs() {
        let rows: Vec<Vec<f64>> = vec![];
        let x = SampleMatrix::from_rows(&rows).unwrap();
        assert!(matches!(
            TrainingSet::new(&x, &[]),
            Err(ModelError::EmptyInput(_))
        ));

        let x = SampleMatrix::from_rows(&[Vec::<f64>::new(), Vec::new()]).unwrap();
        assert!(matches!(
            TrainingSet::new(&x, &[0, 1]),
            Err(ModelError::EmptyInput("no features"))
        ));
    }

    #[test]
    fn test_all_indices() {
        assert_eq!(all_indices(3), vec![0, 1, 2]);
    }
}
