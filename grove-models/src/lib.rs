//! Gini decision trees and random forests for dense numeric data.
//!
//! A [`DecisionTree`] is grown by recursive binary splitting with either an
//! exact sorted scan or a quantile histogram scan, optionally restricted to a
//! random feature subset per node.  A [`RandomForest`] bags trees over
//! bootstrap samples and predicts by majority vote.  Both can be flattened
//! into a pointer-free array for prediction and written to or read from the
//! binary format in [`codec`].
#![warn(missing_docs, unused)]

#[macro_use]
extern crate serde_derive;

/// Binary model format
pub mod codec;

/// Hyperparameters and their JSON form
pub mod params;

/// Trees, their builders and forests
pub mod trees;

pub use crate::params::{FeatureSubset, ForestParams, SplitMode, TreeParams};
pub use crate::trees::{DecisionTree, FlatTree, Node, RandomForest};
