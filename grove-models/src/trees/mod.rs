/// Flattened pre-order tree and predictor
pub mod base;

/// Recursive tree growth
pub mod builder;

/// Bootstrap ensembles with majority vote
pub mod forest;

/// Quantile binning of feature values
pub mod histogram;

/// Pointer-form tree nodes
pub mod node;

/// Exact and histogram split search
pub mod split;

/// Single decision tree: fit, flatten, predict
pub mod tree;

pub use self::base::{FlatNode, FlatTree};
pub use self::forest::RandomForest;
pub use self::node::Node;
pub use self::tree::{DecisionTree, FeatureWidth};
