//! Library for dataset methods
#![warn(missing_docs, unused)]

/// Validated training sets and index sets
pub mod dataset;
/// Definition of the dense sample matrix
pub mod datatypes;
/// Row-major / column-major conversions
pub mod layout;

pub use crate::dataset::{IndexSet, TrainingSet};
pub use crate::datatypes::SampleMatrix;
